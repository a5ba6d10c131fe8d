//! Per-fund metric acquisition over the stability-verified reader.

use tracing::info;

use crate::api::{FetchError, FundDataSource, NavPacer};
use crate::models::{Config, Fund, MetricField, MetricValue};
use crate::stability::StableReader;

/// Positions of the quote-reading cells.
const QUOTE_CELLS: [MetricField; 2] = [MetricField::ExpenseRatio, MetricField::TtmYield];

/// Positional mapping of the seven-cell trailing-return row. Cell 2 is an
/// artifact of the source table layout and carries nothing we use.
const RETURN_CELLS: [(MetricField, usize); 6] = [
    (MetricField::YtdReturn, 3),
    (MetricField::MtdReturn, 0),
    (MetricField::QtdReturn, 1),
    (MetricField::OneYearReturn, 4),
    (MetricField::ThreeYearReturn, 5),
    (MetricField::FiveYearReturn, 6),
];

/// Drives the two stabilized reads for each fund and fills in its metric
/// set. The browser session behind the source is a single stateful
/// resource, so funds are processed strictly one at a time.
pub struct Collector<S> {
    reader: StableReader<S>,
    pacer: NavPacer,
}

impl<S: FundDataSource> Collector<S> {
    pub fn new(source: S, config: &Config) -> Self {
        Self {
            reader: StableReader::new(source, config.fetch_attempts, config.stabilize_rounds),
            pacer: NavPacer::new(config.nav_delay_ms),
        }
    }

    pub fn source(&self) -> &S {
        self.reader.source()
    }

    /// Acquire metrics for every fund in catalog order.
    pub async fn acquire_all(&self, funds: &mut [Fund]) -> Result<(), FetchError> {
        for fund in funds.iter_mut() {
            self.acquire(fund).await?;
            self.pacer.wait().await;
        }
        Ok(())
    }

    async fn acquire(&self, fund: &mut Fund) -> Result<(), FetchError> {
        info!("Fetching data for {}...", fund.ticker);

        let quote = self.reader.stable_quote(&fund.ticker).await?;
        expect_cells(&fund.ticker, "quote", &quote, QUOTE_CELLS.len())?;
        for (field, value) in QUOTE_CELLS.into_iter().zip(quote) {
            record(fund, field, value);
        }

        let returns = self.reader.stable_returns(&fund.ticker).await?;
        expect_cells(&fund.ticker, "trailing-return", &returns, 7)?;
        for (field, cell) in RETURN_CELLS {
            record(fund, field, returns[cell].clone());
        }

        Ok(())
    }
}

fn record(fund: &mut Fund, field: MetricField, value: String) {
    info!("{:<28}: {:>7}%", field.label(), value);
    fund.metrics.set(field, MetricValue::Text(value));
}

/// The positional mapping only makes sense against the full row; a short
/// reading that slipped past the source adapter is treated like any other
/// partial render.
fn expect_cells(
    ticker: &str,
    what: &str,
    cells: &[String],
    expected: usize,
) -> Result<(), FetchError> {
    if cells.len() != expected {
        return Err(FetchError::LoadFailure(format!(
            "{}: {} reading has {} cells, expected {}",
            ticker,
            what,
            cells.len(),
            expected
        )));
    }
    Ok(())
}
