use async_trait::async_trait;
use tracing::debug;

use crate::api::webdriver::WebDriverSession;
use crate::api::{FetchError, FundDataSource};

/// Quote view for one fund, rendered inside the quote iframe.
const QUOTE_URL: &str =
    "http://quotes.morningstar.com/fund/fundquote/f?t={t}&culture=en_us&platform=RET&test=QuoteiFrame";

/// Expense-ratio and TTM-yield cells of the quote table, in that order.
const QUOTE_CELLS: &str = r#"td[class="gr_table_colm2b"] > span, td[class="gr_table_colm21"] > span"#;

/// Trailing-return view for one fund.
const RETURNS_URL: &str =
    "http://performance.morningstar.com/fund/performance-return.action?t={t}&region=usa&culture=en_US";

/// Tab control that switches the trailing-return table to quarter-end data.
const QUARTER_TAB: &str = r##"a[tabname="#tabquarter"]"##;

/// Data cells of the quarter-end trailing-return row.
const QUARTER_CELLS: &str = r#"div[id="tab-quar-end-content"] td[class="row_data"]"#;

/// The Morningstar fund pages, driven through a browser session.
///
/// Owns the locator templates and selectors; everything above this layer
/// sees only tickers and readings.
pub struct MorningstarSource {
    session: WebDriverSession,
}

impl MorningstarSource {
    pub fn new(session: WebDriverSession) -> Self {
        Self { session }
    }

    /// Release the underlying browser session.
    pub async fn shutdown(&self) -> Result<(), FetchError> {
        self.session.quit().await
    }

    fn locator(template: &str, ticker: &str) -> String {
        template.replace("{t}", ticker)
    }
}

#[async_trait]
impl FundDataSource for MorningstarSource {
    async fn quote_reading(&self, ticker: &str) -> Result<Vec<String>, FetchError> {
        let url = Self::locator(QUOTE_URL, ticker);
        debug!("{}: loading quote view", ticker);

        self.session.navigate(&url).await?;
        let cells = self.session.wait_for_texts(QUOTE_CELLS).await?;
        expect_arity("quote view", &cells, 2)?;

        Ok(cells.iter().map(|c| clean_cell(c)).collect())
    }

    async fn returns_reading(&self, ticker: &str) -> Result<Vec<String>, FetchError> {
        let url = Self::locator(RETURNS_URL, ticker);
        debug!("{}: loading trailing-return view", ticker);

        self.session.navigate(&url).await?;
        self.session.click(QUARTER_TAB).await?;
        let cells = self.session.wait_for_texts(QUARTER_CELLS).await?;
        expect_arity("trailing-return table", &cells, 7)?;

        Ok(cells.iter().map(|c| clean_cell(c)).collect())
    }
}

/// A reading with the wrong number of cells is a partially rendered page,
/// not a layout we can interpret; let the stability layer re-fetch it.
fn expect_arity(what: &str, cells: &[String], expected: usize) -> Result<(), FetchError> {
    if cells.len() != expected {
        return Err(FetchError::LoadFailure(format!(
            "{} rendered {} cells, expected {}",
            what,
            cells.len(),
            expected
        )));
    }
    Ok(())
}

/// Strip the trailing percent sign; the source renders an em-dash (or a bare
/// dash) for unavailable cells, which maps to the empty sentinel.
fn clean_cell(text: &str) -> String {
    let trimmed = text.trim().trim_end_matches('%').trim();
    if trimmed == "\u{2014}" || trimmed == "-" {
        return String::new();
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_cell_strips_percent() {
        assert_eq!(clean_cell("3.25%"), "3.25");
        assert_eq!(clean_cell(" 3.25 % "), "3.25");
        assert_eq!(clean_cell("-0.42%"), "-0.42");
    }

    #[test]
    fn test_clean_cell_blank_markers() {
        assert_eq!(clean_cell(""), "");
        assert_eq!(clean_cell("\u{2014}"), "");
        assert_eq!(clean_cell("-"), "");
    }

    #[test]
    fn test_locator_substitution() {
        let url = MorningstarSource::locator(QUOTE_URL, "PONAX");
        assert!(url.contains("t=PONAX&"));
        assert!(!url.contains("{t}"));
    }

    #[test]
    fn test_expect_arity() {
        let two = vec!["a".to_string(), "b".to_string()];
        assert!(expect_arity("quote view", &two, 2).is_ok());

        let err = expect_arity("quote view", &two, 7).unwrap_err();
        assert!(matches!(err, FetchError::LoadFailure(_)));
    }
}
