//! Page fetchers.
//!
//! [`HttpFetcher`] issues a plain GET with browser-like headers,
//! [`BrowserFetcher`] renders the page in headless Chrome over WebDriver and
//! [`SnapshotFetcher`] serves saved pages for offline runs.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use thirtyfour::prelude::*;
use tokio::time::sleep;
use tracing::debug;

use crate::config::{FetchConfig, FetchMode};
use crate::error::{Result, WatchError};

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the HTML behind `url`, giving up after `timeout`.
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String>;

    fn name(&self) -> &'static str;
}

/// Build the fetcher selected by `config.mode`.
pub fn from_config(config: &FetchConfig) -> Result<Box<dyn PageFetcher>> {
    Ok(match config.mode {
        FetchMode::Http => Box::new(HttpFetcher::new(config)?),
        FetchMode::Browser => Box::new(BrowserFetcher::new(config)),
    })
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value("user_agent", &config.user_agent)?);
        headers.insert(
            ACCEPT_LANGUAGE,
            header_value("accept_language", &config.accept_language)?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| WatchError::Config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String> {
        let to_error = |e: reqwest::Error| {
            if e.is_timeout() {
                WatchError::timeout(url, millis(timeout))
            } else {
                WatchError::fetch(url, e)
            }
        };

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(to_error)?
            .error_for_status()
            .map_err(to_error)?;
        let text = response.text().await.map_err(to_error)?;

        debug!("Fetched {} ({} bytes)", url, text.len());
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Opens a fresh WebDriver session per fetch and closes it afterwards.
pub struct BrowserFetcher {
    webdriver_url: String,
    headless: bool,
    render_wait: Duration,
}

impl BrowserFetcher {
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            webdriver_url: config.webdriver_url.clone(),
            headless: config.headless,
            render_wait: Duration::from_millis(config.render_wait_ms),
        }
    }

    async fn render(&self, url: &str) -> WebDriverResult<String> {
        let mut caps = DesiredCapabilities::chrome();
        if self.headless {
            caps.set_headless()?;
        }
        let driver = WebDriver::new(self.webdriver_url.as_str(), caps).await?;

        let source = async {
            driver.goto(url).await?;
            // results are filled in client-side after load
            sleep(self.render_wait).await;
            driver.source().await
        }
        .await;

        let closed = driver.quit().await;
        let source = source?;
        closed?;
        Ok(source)
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String> {
        let html = tokio::time::timeout(timeout, self.render(url))
            .await
            .map_err(|_| WatchError::timeout(url, millis(timeout)))?
            .map_err(|e| WatchError::fetch(url, e))?;

        debug!("Rendered {} ({} bytes)", url, html.len());
        Ok(html)
    }

    fn name(&self) -> &'static str {
        "browser"
    }
}

/// Serves pages from memory. Unknown URLs fail like an unreachable host.
#[derive(Debug, Clone, Default)]
pub struct SnapshotFetcher {
    pages: HashMap<String, String>,
}

impl SnapshotFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }
}

#[async_trait]
impl PageFetcher for SnapshotFetcher {
    async fn fetch(&self, url: &str, _timeout: Duration) -> Result<String> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| WatchError::fetch(url, "no snapshot for this URL"))
    }

    fn name(&self) -> &'static str {
        "snapshot"
    }
}

fn header_value(field: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| WatchError::Config(format!("fetch.{field} is not a valid header value: {e}")))
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
