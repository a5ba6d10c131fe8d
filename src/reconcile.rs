//! Index substitution for bonds the source has no data for.
//!
//! Index funds partition the sheet into governance zones by position: a bond
//! is governed by the nearest index placed after it. Any metric the source
//! left blank is copied from the governing index, with the field recorded so
//! the report can mark the value as substituted.

use thiserror::Error;
use tracing::{debug, info};

use crate::models::{Fund, MetricField};

/// A bond needed substitution but no index fund follows it in the sheet.
#[derive(Debug, Error)]
#[error("no governing index follows {ticker} (row {row}) to supply {missing:?}")]
pub struct NoGoverningIndex {
    pub ticker: String,
    pub row: usize,
    pub missing: Vec<MetricField>,
}

/// Fill every blank metric of every bond from its governing index.
///
/// Runs strictly after acquisition: index metrics must be fully populated.
/// `indexes` is expected in sheet order, so the first index with a greater
/// row is the nearest one. Bonds with complete data never need a governor.
pub fn reconcile(bonds: &mut [Fund], indexes: &[Fund]) -> Result<(), NoGoverningIndex> {
    for bond in bonds.iter_mut() {
        let missing: Vec<MetricField> = MetricField::ALL
            .into_iter()
            .filter(|field| bond.metrics.get(*field).is_missing())
            .collect();

        if missing.is_empty() {
            debug!("{}: complete, no substitution needed", bond.ticker);
            continue;
        }

        let governor = indexes
            .iter()
            .find(|index| index.source_row > bond.source_row)
            .ok_or_else(|| NoGoverningIndex {
                ticker: bond.ticker.clone(),
                row: bond.source_row,
                missing: missing.clone(),
            })?;

        for field in missing {
            bond.metrics.set(field, governor.metrics.get(field).clone());
            bond.substituted.insert(field);
            info!(
                "{}: {} substituted from index {}",
                bond.ticker,
                field.label(),
                governor.ticker
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::models::MetricValue;

    use super::*;

    /// An index fund with every field filled with `value`.
    fn index(ticker: &str, row: usize, value: &str) -> Fund {
        let mut fund = Fund::new(ticker, row, true);
        for field in MetricField::ALL {
            fund.metrics.set(field, MetricValue::Text(value.to_string()));
        }
        fund
    }

    /// A bond with every field filled except those named in `blank`.
    fn bond(ticker: &str, row: usize, blank: &[MetricField]) -> Fund {
        let mut fund = Fund::new(ticker, row, false);
        for field in MetricField::ALL {
            let value = if blank.contains(&field) {
                String::new()
            } else {
                "1.00".to_string()
            };
            fund.metrics.set(field, MetricValue::Text(value));
        }
        fund
    }

    #[test]
    fn test_governor_is_nearest_following_index() {
        let indexes = vec![
            index("IDX10", 10, "ten"),
            index("IDX50", 50, "fifty"),
            index("IDX90", 90, "ninety"),
        ];
        let mut bonds = vec![bond("DEP", 30, &[MetricField::TtmYield])];

        reconcile(&mut bonds, &indexes).unwrap();

        assert_eq!(
            bonds[0].metrics.get(MetricField::TtmYield),
            &MetricValue::Text("fifty".to_string())
        );
    }

    #[test]
    fn test_only_missing_fields_are_substituted_and_marked() {
        let indexes = vec![index("IDX", 50, "4.5")];
        let mut bonds = vec![bond("DEP", 30, &[MetricField::OneYearReturn])];

        reconcile(&mut bonds, &indexes).unwrap();

        let dep = &bonds[0];
        assert_eq!(
            dep.metrics.get(MetricField::OneYearReturn),
            &MetricValue::Text("4.5".to_string())
        );
        assert_eq!(
            dep.substituted.iter().copied().collect::<Vec<_>>(),
            vec![MetricField::OneYearReturn]
        );
        // Directly acquired fields keep their own values.
        assert_eq!(
            dep.metrics.get(MetricField::TtmYield),
            &MetricValue::Text("1.00".to_string())
        );
    }

    #[test]
    fn test_complete_bond_needs_no_governor() {
        let mut bonds = vec![bond("DEP", 30, &[])];

        reconcile(&mut bonds, &[]).unwrap();
        assert!(bonds[0].substituted.is_empty());
    }

    #[test]
    fn test_missing_governor_is_an_error() {
        // The only index sits before the bond, so nothing governs it.
        let indexes = vec![index("IDX", 10, "x")];
        let mut bonds = vec![bond("DEP", 30, &[MetricField::QtdReturn])];

        let err = reconcile(&mut bonds, &indexes).unwrap_err();
        assert_eq!(err.ticker, "DEP");
        assert_eq!(err.row, 30);
        assert_eq!(err.missing, vec![MetricField::QtdReturn]);
    }
}
