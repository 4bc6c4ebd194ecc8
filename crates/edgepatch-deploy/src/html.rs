//! Page HTML fetching for preview comparisons.
//!
//! The edge renderer serves patched HTML to AI crawlers only, so both
//! snapshots are requested with a crawler user agent. Control headers tell
//! the edge to bypass patching (original) or to apply the preview document
//! instead of the production one (optimized).

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use edgepatch_cdn::retry::RetryPolicy;

use crate::error::FetchError;

/// User agent presented to the edge.
pub const AI_CRAWLER_USER_AGENT: &str =
    "Mozilla/5.0 AppleWebKit/537.36 (KHTML, like Gecko; compatible; GPTBot/1.2; +https://openai.com/gptbot)";

/// Asks the edge to serve the unpatched origin response.
pub const BYPASS_HEADER: &str = "x-edgepatch-bypass";

/// Names the preview document the edge should apply.
pub const PREVIEW_HEADER: &str = "x-edgepatch-preview";

/// Which rendering of the page to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchMode {
    /// The page without any edge patches.
    Original,
    /// The page with the preview document at `key` applied.
    Preview { key: String },
}

#[async_trait]
pub trait HtmlFetcher: Send + Sync {
    async fn fetch(&self, url: &Url, mode: &FetchMode) -> Result<String, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpHtmlFetcher {
    http: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpHtmlFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(AI_CRAWLER_USER_AGENT)
            .build()
            .map_err(|e| FetchError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl HtmlFetcher for HttpHtmlFetcher {
    async fn fetch(&self, url: &Url, mode: &FetchMode) -> Result<String, FetchError> {
        let resp = self.retry.send(url.as_str(), || {
            let request = self.http.get(url.clone());
            match mode {
                FetchMode::Original => request.header(BYPASS_HEADER, "1"),
                FetchMode::Preview { key } => request.header(PREVIEW_HEADER, key.as_str()),
            }
            .send()
        })
        .await
        .map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        resp.text().await.map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })
    }
}
