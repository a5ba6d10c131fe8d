use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use reqwest::{Client, Method};
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::api::FetchError;
use crate::models::Config;

/// W3C element identifier key in WebDriver responses.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecc";

/// Interval between render polls while waiting for a selector to appear.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// A live W3C WebDriver session (e.g. against a local chromedriver).
///
/// This is the raw page fetcher: every call is a single attempt with a fixed
/// per-call timeout and no retries. Correctness-verified reads are layered
/// on top by the stability reader.
pub struct WebDriverSession {
    client: Client,
    base: Url,
    session_id: String,
    page_timeout: Duration,
}

impl WebDriverSession {
    /// Open a new browser session against the configured WebDriver endpoint.
    pub async fn connect(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("bondsheet/0.1")
            .build()?;

        let base = Url::parse(&config.webdriver_url)
            .map_err(|e| anyhow!("invalid WEBDRIVER_URL {}: {}", config.webdriver_url, e))?;

        let body = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": {
                        "args": ["--headless=new", "--window-size=1280,1024"]
                    }
                }
            }
        });

        let url = join(&base, "session")?;
        let value = request(&client, Method::POST, url, Some(&body))
            .await
            .map_err(|e| anyhow!("cannot open WebDriver session: {}", e))?;

        let session_id = value
            .get("sessionId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("WebDriver session response has no sessionId"))?
            .to_string();

        debug!("WebDriver session {} opened at {}", session_id, base);

        Ok(Self {
            client,
            base,
            session_id,
            page_timeout: Duration::from_secs(config.page_timeout_secs),
        })
    }

    /// Navigate the session to a new page.
    pub async fn navigate(&self, page_url: &str) -> Result<(), FetchError> {
        let url = self.session_url("url")?;
        request(&self.client, Method::POST, url, Some(&json!({ "url": page_url }))).await?;
        Ok(())
    }

    /// Block until at least one element matching `css` has rendered, then
    /// return the text of every match. Times out with a `LoadFailure` after
    /// the configured per-call limit.
    pub async fn wait_for_texts(&self, css: &str) -> Result<Vec<String>, FetchError> {
        let deadline = Instant::now() + self.page_timeout;

        loop {
            let ids = self.find_elements(css).await?;
            if !ids.is_empty() {
                let mut texts = Vec::with_capacity(ids.len());
                for id in &ids {
                    texts.push(self.element_text(id).await?);
                }
                return Ok(texts);
            }

            if Instant::now() >= deadline {
                return Err(FetchError::LoadFailure(format!(
                    "timed out after {:?} waiting for selector {:?}",
                    self.page_timeout, css
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Click the first element matching `css`, waiting for it to render
    /// first.
    pub async fn click(&self, css: &str) -> Result<(), FetchError> {
        let deadline = Instant::now() + self.page_timeout;

        let id = loop {
            let ids = self.find_elements(css).await?;
            if let Some(id) = ids.into_iter().next() {
                break id;
            }
            if Instant::now() >= deadline {
                return Err(FetchError::LoadFailure(format!(
                    "timed out after {:?} waiting to click {:?}",
                    self.page_timeout, css
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        };

        let url = self.session_url(&format!("element/{}/click", id))?;
        request(&self.client, Method::POST, url, Some(&json!({}))).await?;
        Ok(())
    }

    /// Close the browser session. Must run on every exit path.
    pub async fn quit(&self) -> Result<(), FetchError> {
        let url = join(&self.base, &format!("session/{}", self.session_id))?;
        request(&self.client, Method::DELETE, url, None).await?;
        debug!("WebDriver session {} closed", self.session_id);
        Ok(())
    }

    async fn find_elements(&self, css: &str) -> Result<Vec<String>, FetchError> {
        let url = self.session_url("elements")?;
        let body = json!({ "using": "css selector", "value": css });
        let value = request(&self.client, Method::POST, url, Some(&body)).await?;

        let ids = value
            .as_array()
            .map(|els| {
                els.iter()
                    .filter_map(|el| el.get(ELEMENT_KEY))
                    .filter_map(|v| v.as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(ids)
    }

    async fn element_text(&self, element_id: &str) -> Result<String, FetchError> {
        let url = self.session_url(&format!("element/{}/text", element_id))?;
        let value = request(&self.client, Method::GET, url, None).await?;
        Ok(value.as_str().unwrap_or_default().trim().to_string())
    }

    fn session_url(&self, path: &str) -> Result<Url, FetchError> {
        join(&self.base, &format!("session/{}/{}", self.session_id, path))
    }
}

fn join(base: &Url, path: &str) -> Result<Url, FetchError> {
    // Endpoints like http://localhost:9515 need the trailing slash before
    // joining relative paths.
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        base.set_path(&format!("{}/", base.path()));
    }
    base.join(path)
        .map_err(|e| FetchError::LoadFailure(format!("bad WebDriver url: {}", e)))
}

/// Issue one wire-protocol request and unwrap the `value` envelope. Failed
/// commands carry their diagnostic in `value.message`.
async fn request(
    client: &Client,
    method: Method,
    url: Url,
    body: Option<&Value>,
) -> Result<Value, FetchError> {
    debug!("{} {}", method, url);

    let mut req = client.request(method, url);
    if let Some(body) = body {
        req = req.json(body);
    }

    let response = req
        .send()
        .await
        .map_err(|e| FetchError::LoadFailure(format!("webdriver request failed: {}", e)))?;

    let status = response.status();
    let payload: Value = response
        .json()
        .await
        .map_err(|e| FetchError::LoadFailure(format!("webdriver response unreadable: {}", e)))?;

    if !status.is_success() {
        let message = payload
            .pointer("/value/message")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown webdriver error");
        return Err(FetchError::LoadFailure(format!(
            "webdriver command failed ({}): {}",
            status, message
        )));
    }

    Ok(payload.get("value").cloned().unwrap_or(Value::Null))
}
