//! CSV workbook adapter: the input dataset and the derived output report.
//!
//! The sheet layout is fixed: row 1 is the header, tickers sit in column 3,
//! the dependent-classification marker in column 14, and the metric
//! destination columns come from the metric schema. The report is a derived
//! copy saved beside the input, never an overwrite.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use tracing::info;

use crate::models::{Fund, MetricField, MetricValue, SheetRow};

/// 1-based column holding the ticker.
pub const TICKER_COLUMN: usize = 3;

/// 1-based column whose presence marks a row as a dependent bond.
pub const CLASSIFICATION_COLUMN: usize = 14;

/// 1-based column of the substitution-provenance annotation. A cell-styled
/// workbook writer would paint substituted cells instead; CSV has no styles.
pub const SUBSTITUTED_COLUMN: usize = 21;

/// Fixed output filename, written to the input's directory.
pub const OUTPUT_FILE: &str = "output.csv";

/// The input sheet, held in memory for classification and later derived
/// into the report.
pub struct CsvWorkbook {
    path: PathBuf,
    records: Vec<Vec<String>>,
}

impl CsvWorkbook {
    pub fn open(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("cannot open sheet {}", path.display()))?;

        let mut records = Vec::new();
        for record in reader.records() {
            let record = record.with_context(|| format!("unreadable row in {}", path.display()))?;
            records.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self {
            path: path.to_path_buf(),
            records,
        })
    }

    /// Candidate rows for the catalog. Data starts at row 2; row 1 is the
    /// header.
    pub fn rows(&self) -> Vec<SheetRow> {
        self.records
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, record)| SheetRow {
                row: i + 1,
                ticker: cell(record, TICKER_COLUMN),
                classification: cell(record, CLASSIFICATION_COLUMN),
            })
            .collect()
    }

    /// Derive the report: copy the sheet, write every fund's normalized
    /// metrics into their destination columns, annotate substitutions, and
    /// save as `output.csv` next to the input.
    pub fn write_report<'a>(&self, funds: impl IntoIterator<Item = &'a Fund>) -> Result<PathBuf> {
        let mut records = self.records.clone();

        if let Some(header) = records.first_mut() {
            set_cell(header, SUBSTITUTED_COLUMN, "Substituted".to_string());
        }

        for fund in funds {
            let record = records
                .get_mut(fund.source_row - 1)
                .ok_or_else(|| anyhow!("{}: row {} not in sheet", fund.ticker, fund.source_row))?;

            for field in MetricField::ALL {
                let MetricValue::Number(value) = fund.metrics.get(field) else {
                    bail!("{}: {} was not normalized", fund.ticker, field.label());
                };
                set_cell(record, field.column(), value.to_string());
            }

            let provenance = fund
                .substituted
                .iter()
                .map(|field| field.label())
                .collect::<Vec<_>>()
                .join("; ");
            set_cell(record, SUBSTITUTED_COLUMN, provenance);
        }

        let out_path = self
            .path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(OUTPUT_FILE);

        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(&out_path)
            .with_context(|| format!("cannot create {}", out_path.display()))?;
        for record in &records {
            writer.write_record(record)?;
        }
        writer.flush()?;

        info!("Report saved to {}", out_path.display());
        Ok(out_path)
    }
}

/// Fetch a 1-based cell, trimmed, with empty mapped to `None`.
fn cell(record: &[String], column: usize) -> Option<String> {
    record
        .get(column - 1)
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

/// Set a 1-based cell, padding the record out with blanks if needed.
fn set_cell(record: &mut Vec<String>, column: usize, value: String) {
    if record.len() < column {
        record.resize(column, String::new());
    }
    record[column - 1] = value;
}
