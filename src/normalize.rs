//! Conversion of textual percentage readings into the numbers the report
//! schema wants.

use thiserror::Error;

use crate::models::{Fund, MetricField, MetricValue};

/// A metric that cannot be written numerically. Fatal: it means the source
/// layout changed or reconciliation left a hole.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("{ticker}: {field} reading {value:?} is not numeric")]
    NotNumeric {
        ticker: String,
        field: &'static str,
        value: String,
    },
    #[error("{ticker}: {field} was never acquired or substituted")]
    Unresolved { ticker: String, field: &'static str },
}

/// Convert every metric of every fund to its numeric form. Expense ratio
/// and yield become fractions of one; return windows keep their percentage
/// magnitude. Already-numeric values are left untouched, so a second pass
/// is a no-op.
pub fn normalize_all(funds: &mut [Fund]) -> Result<(), FormatError> {
    for fund in funds.iter_mut() {
        normalize_fund(fund)?;
    }
    Ok(())
}

fn normalize_fund(fund: &mut Fund) -> Result<(), FormatError> {
    for field in MetricField::ALL {
        let number = match fund.metrics.get(field) {
            MetricValue::Number(_) => continue,
            MetricValue::Unset => {
                return Err(FormatError::Unresolved {
                    ticker: fund.ticker.clone(),
                    field: field.label(),
                })
            }
            MetricValue::Text(text) => {
                // Readings are stripped at acquisition, but tolerate a stray
                // percent sign.
                let digits = text.trim().trim_end_matches('%').trim();
                if digits.is_empty() {
                    return Err(FormatError::Unresolved {
                        ticker: fund.ticker.clone(),
                        field: field.label(),
                    });
                }
                let parsed: f64 = digits.parse().map_err(|_| FormatError::NotNumeric {
                    ticker: fund.ticker.clone(),
                    field: field.label(),
                    value: text.clone(),
                })?;
                if field.is_fraction() {
                    parsed / 100.0
                } else {
                    parsed
                }
            }
        };
        fund.metrics.set(field, MetricValue::Number(number));
    }
    Ok(())
}
