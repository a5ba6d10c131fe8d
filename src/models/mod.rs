use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Fixed name of the side file holding the dataset location.
pub const SHEET_PATH_FILE: &str = "sheetpath.txt";

/// Maximum ticker length accepted by the catalog.
pub const MAX_TICKER_LEN: usize = 5;

/// The metric schema: every value the report carries for a fund, with its
/// fixed destination column in the output sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MetricField {
    ExpenseRatio,
    TtmYield,
    YtdReturn,
    MtdReturn,
    QtdReturn,
    OneYearReturn,
    ThreeYearReturn,
    FiveYearReturn,
}

impl MetricField {
    pub const ALL: [MetricField; 8] = [
        MetricField::ExpenseRatio,
        MetricField::TtmYield,
        MetricField::YtdReturn,
        MetricField::MtdReturn,
        MetricField::QtdReturn,
        MetricField::OneYearReturn,
        MetricField::ThreeYearReturn,
        MetricField::FiveYearReturn,
    ];

    /// 1-based destination column in the output sheet.
    pub fn column(self) -> usize {
        match self {
            MetricField::ExpenseRatio => 6,
            MetricField::TtmYield => 7,
            MetricField::YtdReturn => 15,
            MetricField::MtdReturn => 16,
            MetricField::QtdReturn => 17,
            MetricField::OneYearReturn => 18,
            MetricField::ThreeYearReturn => 19,
            MetricField::FiveYearReturn => 20,
        }
    }

    /// Expense ratio and yield are written as fractions of one; the trailing
    /// return windows keep their percentage magnitude.
    pub fn is_fraction(self) -> bool {
        matches!(self, MetricField::ExpenseRatio | MetricField::TtmYield)
    }

    /// Human-readable label used in progress output and diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            MetricField::ExpenseRatio => "Expense Ratio",
            MetricField::TtmYield => "TTM Yield",
            MetricField::YtdReturn => "YTD Trailing Total Return",
            MetricField::MtdReturn => "MTD Trailing Total Return",
            MetricField::QtdReturn => "QTD Trailing Total Return",
            MetricField::OneYearReturn => "1-Year Trailing Total Return",
            MetricField::ThreeYearReturn => "3-Year Trailing Total Return",
            MetricField::FiveYearReturn => "5-Year Trailing Total Return",
        }
    }
}

/// Lifecycle of a single metric value.
///
/// Acquisition and substitution produce `Text` (possibly empty when the
/// source renders a blank cell); normalization parses `Text` into `Number`
/// and leaves `Number` untouched on a second pass.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Unset,
    Text(String),
    Number(f64),
}

impl MetricValue {
    /// True for values that still need index substitution: a blank reading
    /// from the source, or a field acquisition never reached.
    pub fn is_missing(&self) -> bool {
        match self {
            MetricValue::Unset => true,
            MetricValue::Text(s) => s.is_empty(),
            MetricValue::Number(_) => false,
        }
    }
}

/// Fixed-schema record of all metric values for one fund.
#[derive(Debug, Clone)]
pub struct MetricSet {
    values: [MetricValue; MetricField::ALL.len()],
}

impl MetricSet {
    pub fn new() -> Self {
        Self {
            values: std::array::from_fn(|_| MetricValue::Unset),
        }
    }

    pub fn get(&self, field: MetricField) -> &MetricValue {
        &self.values[field as usize]
    }

    pub fn set(&mut self, field: MetricField, value: MetricValue) {
        self.values[field as usize] = value;
    }
}

impl Default for MetricSet {
    fn default() -> Self {
        Self::new()
    }
}

/// One bond or index record, built from a sheet row and filled in by
/// acquisition and reconciliation.
#[derive(Debug, Clone)]
pub struct Fund {
    pub ticker: String,
    /// 1-based row in the source sheet. Ordering decides which index governs
    /// which dependent.
    pub source_row: usize,
    pub is_index: bool,
    pub metrics: MetricSet,
    /// Fields copied from the governing index instead of acquired directly.
    pub substituted: BTreeSet<MetricField>,
}

impl Fund {
    pub fn new(ticker: impl Into<String>, source_row: usize, is_index: bool) -> Self {
        Self {
            ticker: ticker.into(),
            source_row,
            is_index,
            metrics: MetricSet::new(),
            substituted: BTreeSet::new(),
        }
    }
}

/// One row of the input sheet as seen by the catalog: the ticker cell and
/// the classification cell, both already trimmed, empty mapped to `None`.
#[derive(Debug, Clone)]
pub struct SheetRow {
    pub row: usize,
    pub ticker: Option<String>,
    pub classification: Option<String>,
}

/// Configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    pub sheet_path: PathBuf,
    pub webdriver_url: String,
    pub page_timeout_secs: u64,
    pub fetch_attempts: u32,
    pub stabilize_rounds: u32,
    pub nav_delay_ms: u64,
}

impl Config {
    /// Load configuration: the dataset location from the fixed side file,
    /// operational knobs from environment variables.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let sheet_path = std::fs::read_to_string(SHEET_PATH_FILE)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {}", SHEET_PATH_FILE, e))?;
        let sheet_path = sheet_path.trim();
        if sheet_path.is_empty() {
            anyhow::bail!("{} is empty; put the dataset path on its first line", SHEET_PATH_FILE);
        }

        Ok(Config {
            sheet_path: PathBuf::from(sheet_path),
            webdriver_url: std::env::var("WEBDRIVER_URL")
                .unwrap_or_else(|_| "http://localhost:9515".to_string()),
            page_timeout_secs: std::env::var("PAGE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .unwrap_or(20),
            fetch_attempts: std::env::var("FETCH_ATTEMPTS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),
            stabilize_rounds: std::env::var("STABILIZE_ROUNDS")
                .unwrap_or_else(|_| "8".to_string())
                .parse()
                .unwrap_or(8),
            nav_delay_ms: std::env::var("NAV_DELAY_MS")
                .unwrap_or_else(|_| "250".to_string())
                .parse()
                .unwrap_or(250),
        })
    }
}
