use std::time::Duration;

use thiserror::Error;

pub mod morningstar;
pub mod webdriver;

pub use morningstar::MorningstarSource;
pub use webdriver::WebDriverSession;

/// Transport-level failures of the remote content source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// A single navigation/render attempt failed or timed out. Transient;
    /// the stability layer retries these.
    #[error("page load failed: {0}")]
    LoadFailure(String),

    /// The retry budget was exhausted. Fatal; the run aborts without a
    /// report.
    #[error("remote source unavailable after {attempts} attempts: {cause}")]
    SourceUnavailable { attempts: u32, cause: String },
}

/// Simple pacer between page navigations. The remote browser session is a
/// single stateful resource, so requests are spaced rather than throttled.
pub struct NavPacer {
    delay_ms: u64,
}

impl NavPacer {
    pub fn new(delay_ms: u64) -> Self {
        Self { delay_ms }
    }

    pub async fn wait(&self) {
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
    }
}

/// The content-source seam: one implementation drives a real browser
/// session, tests script it.
///
/// Both readings are fixed-arity sequences of cell texts with any trailing
/// `%` already stripped; a blank cell comes through as an empty string.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FundDataSource {
    /// The quote view: `[expense_ratio, ttm_yield]`.
    async fn quote_reading(&self, ticker: &str) -> Result<Vec<String>, FetchError>;

    /// The quarter-end trailing-return row, seven cells as rendered.
    async fn returns_reading(&self, ticker: &str) -> Result<Vec<String>, FetchError>;
}
