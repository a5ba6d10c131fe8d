//! Verification-by-repetition over the raw page fetcher.
//!
//! The remote source intermittently renders stale or transient content, so a
//! single successful fetch is not trusted. A reading is accepted only once
//! two consecutive fetches agree byte-for-byte; each individual fetch gets a
//! bounded number of attempts against transient load failures, and the
//! agreement loop itself is bounded so the reader always terminates.

use tracing::{debug, warn};

use crate::api::{FetchError, FundDataSource};

/// Which of the two per-fund readings to stabilize. Each is stabilized
/// independently.
#[derive(Debug, Clone, Copy)]
enum ReadKind {
    Quote,
    Returns,
}

impl ReadKind {
    fn label(self) -> &'static str {
        match self {
            ReadKind::Quote => "quote",
            ReadKind::Returns => "trailing-return",
        }
    }
}

/// Stability-verified reader over a content source.
pub struct StableReader<S> {
    source: S,
    fetch_attempts: u32,
    stabilize_rounds: u32,
}

impl<S: FundDataSource> StableReader<S> {
    pub fn new(source: S, fetch_attempts: u32, stabilize_rounds: u32) -> Self {
        Self {
            source,
            fetch_attempts: fetch_attempts.max(1),
            // Agreement needs at least two passes.
            stabilize_rounds: stabilize_rounds.max(2),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Stabilized `[expense_ratio, ttm_yield]` reading.
    pub async fn stable_quote(&self, ticker: &str) -> Result<Vec<String>, FetchError> {
        self.read_stable(ReadKind::Quote, ticker).await
    }

    /// Stabilized seven-cell trailing-return reading.
    pub async fn stable_returns(&self, ticker: &str) -> Result<Vec<String>, FetchError> {
        self.read_stable(ReadKind::Returns, ticker).await
    }

    async fn read_once(&self, kind: ReadKind, ticker: &str) -> Result<Vec<String>, FetchError> {
        match kind {
            ReadKind::Quote => self.source.quote_reading(ticker).await,
            ReadKind::Returns => self.source.returns_reading(ticker).await,
        }
    }

    /// One fetch, retried against transient load failures up to the attempt
    /// bound. Exhaustion is fatal for the whole run.
    async fn read_with_retry(&self, kind: ReadKind, ticker: &str) -> Result<Vec<String>, FetchError> {
        let mut last_error = String::new();

        for attempt in 1..=self.fetch_attempts {
            match self.read_once(kind, ticker).await {
                Ok(reading) => return Ok(reading),
                Err(FetchError::LoadFailure(cause)) => {
                    warn!(
                        "{}: {} read attempt {}/{} failed: {}. Refreshing...",
                        ticker,
                        kind.label(),
                        attempt,
                        self.fetch_attempts,
                        cause
                    );
                    last_error = cause;
                }
                Err(fatal) => return Err(fatal),
            }
        }

        Err(FetchError::SourceUnavailable {
            attempts: self.fetch_attempts,
            cause: last_error,
        })
    }

    /// Fetch until two consecutive readings agree, keeping only the most
    /// recent pair. A disagreement is an internal signal, not an error; it
    /// just buys another round.
    async fn read_stable(&self, kind: ReadKind, ticker: &str) -> Result<Vec<String>, FetchError> {
        let mut previous: Option<Vec<String>> = None;

        for round in 1..=self.stabilize_rounds {
            let reading = self.read_with_retry(kind, ticker).await?;

            match &previous {
                Some(prev) if *prev == reading => {
                    debug!(
                        "{}: {} reading stable after {} fetches",
                        ticker,
                        kind.label(),
                        round
                    );
                    return Ok(reading);
                }
                Some(_) => {
                    debug!(
                        "{}: consecutive {} readings disagree, fetching again",
                        ticker,
                        kind.label()
                    );
                }
                None => {}
            }
            previous = Some(reading);
        }

        Err(FetchError::SourceUnavailable {
            attempts: self.stabilize_rounds,
            cause: format!("{} readings never stabilized", kind.label()),
        })
    }
}
