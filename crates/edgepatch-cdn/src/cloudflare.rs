//! # Cloudflare Purge Client
//!
//! Purges by absolute URL: every invalidation path is prefixed with the
//! public base URL the documents are served from and submitted in one
//! `purge_cache` call.
//!
//! Required configuration: `zone_id`, `api_token`, `public_base_url`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use edgepatch_core::CdnProviderConfig;

use crate::client::{missing, normalize_paths, CdnClient, InvalidationResult};
use crate::error::CdnError;
use crate::retry::RetryPolicy;

pub const PROVIDER: &str = "cloudflare";

/// Public API endpoint, used when `api_base_url` is unset.
pub const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Cloudflare's documented purge propagation time.
const ESTIMATED_PROPAGATION_SECS: u64 = 30;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct PurgeResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    #[serde(default)]
    result: Option<PurgeResult>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct PurgeResult {
    id: String,
}

/// Cloudflare zone purge client.
#[derive(Debug)]
pub struct CloudflareClient {
    http: reqwest::Client,
    base_url: String,
    config: CdnProviderConfig,
    retry: RetryPolicy,
}

impl CloudflareClient {
    pub fn new(config: CdnProviderConfig) -> Result<Self, CdnError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(
                config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .build()
            .map_err(|e| CdnError::Config {
                provider: PROVIDER.to_string(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        let base_url = config
            .api_base_url
            .as_ref()
            .map(|u| u.as_str().trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Ok(Self {
            http,
            base_url,
            config,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn require<'a>(&self, value: Option<&'a str>, field: &str) -> Result<&'a str, CdnError> {
        value.ok_or_else(|| CdnError::Config {
            provider: PROVIDER.to_string(),
            reason: format!("{field} is required"),
        })
    }
}

#[async_trait]
impl CdnClient for CloudflareClient {
    fn provider_name(&self) -> &str {
        PROVIDER
    }

    fn validate_config(&self) -> bool {
        if self.config.zone_id.as_deref().map_or(true, str::is_empty) {
            return missing(PROVIDER, "zone_id");
        }
        if self.config.token().is_none() {
            return missing(PROVIDER, "api_token");
        }
        if self.config.public_base_url.is_none() {
            return missing(PROVIDER, "public_base_url");
        }
        true
    }

    async fn invalidate_cache(&self, paths: &[String]) -> Result<InvalidationResult, CdnError> {
        let paths = normalize_paths(paths);
        if paths.is_empty() {
            return Ok(InvalidationResult::skipped(PROVIDER));
        }

        let zone_id = self.require(self.config.zone_id.as_deref(), "zone_id")?;
        let token = self.require(self.config.token(), "api_token")?;
        let public_base = self.require(
            self.config.public_base_url.as_ref().map(|u| u.as_str()),
            "public_base_url",
        )?;
        let public_base = public_base.trim_end_matches('/');

        let files: Vec<String> = paths.iter().map(|p| format!("{public_base}{p}")).collect();
        let body = serde_json::json!({ "files": files });
        let endpoint = format!("{}/zones/{zone_id}/purge_cache", self.base_url);

        tracing::debug!(provider = PROVIDER, count = files.len(), "submitting purge");
        let resp = self
            .retry
            .send(&endpoint, || self.http.post(&endpoint).bearer_auth(token).json(&body).send())
            .await
            .map_err(|source| CdnError::Http {
                endpoint: endpoint.clone(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CdnError::Api {
                provider: PROVIDER.to_string(),
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        let parsed: PurgeResponse = resp
            .json()
            .await
            .map_err(|source| CdnError::Deserialization {
                endpoint: endpoint.clone(),
                source,
            })?;
        if !parsed.success {
            let message = parsed
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.code, e.message))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(CdnError::Rejected {
                provider: PROVIDER.to_string(),
                message,
            });
        }

        Ok(InvalidationResult::success(
            PROVIDER,
            paths,
            parsed.result.map(|r| r.id),
            Some(ESTIMATED_PROPAGATION_SECS),
        ))
    }
}
