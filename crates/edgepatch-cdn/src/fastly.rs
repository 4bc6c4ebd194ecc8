//! # Fastly Purge Client
//!
//! Purges by surrogate key. The edge tags every stored document with its
//! path as a surrogate key, so the invalidation paths are submitted as-is
//! in one batched `Surrogate-Key` purge.
//!
//! Required configuration: `service_id`, `api_token`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use edgepatch_core::CdnProviderConfig;

use crate::client::{missing, normalize_paths, CdnClient, InvalidationResult};
use crate::error::CdnError;
use crate::retry::RetryPolicy;

pub const PROVIDER: &str = "fastly";

pub const DEFAULT_BASE_URL: &str = "https://api.fastly.com";

const ESTIMATED_PROPAGATION_SECS: u64 = 5;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Fastly service purge client.
#[derive(Debug)]
pub struct FastlyClient {
    http: reqwest::Client,
    base_url: String,
    config: CdnProviderConfig,
    retry: RetryPolicy,
}

impl FastlyClient {
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
}

#[async_trait]
impl CdnClient for FastlyClient {
    fn provider_name(&self) -> &str {
        PROVIDER
    }

    fn validate_config(&self) -> bool {
        if self.config.service_id.as_deref().map_or(true, str::is_empty) {
            return missing(PROVIDER, "service_id");
        }
        if self.config.token().is_none() {
            return missing(PROVIDER, "api_token");
        }
        true
    }

    async fn invalidate_cache(&self, paths: &[String]) -> Result<InvalidationResult, CdnError> {
        let paths = normalize_paths(paths);
        if paths.is_empty() {
            return Ok(InvalidationResult::skipped(PROVIDER));
        }

        let config_error = |field: &str| CdnError::Config {
            provider: PROVIDER.to_string(),
            reason: format!("{field} is required"),
        };
        let service_id = self
            .config
            .service_id
            .as_deref()
            .ok_or_else(|| config_error("service_id"))?;
        let token = self.config.token().ok_or_else(|| config_error("api_token"))?;

        let endpoint = format!("{}/service/{service_id}/purge", self.base_url);
        let surrogate_keys = paths.join(" ");

        tracing::debug!(provider = PROVIDER, count = paths.len(), "submitting purge");
        let resp = self.retry.send(&endpoint, || {
            self.http
                .post(&endpoint)
                .header("Fastly-Key", token)
                .header("Surrogate-Key", &surrogate_keys)
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
        })
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

        // Body maps each surrogate key to its purge id.
        let purge_ids: HashMap<String, String> =
            resp.json()
                .await
                .map_err(|source| CdnError::Deserialization {
                    endpoint: endpoint.clone(),
                    source,
                })?;
        let tracking: Vec<&str> = paths
            .iter()
            .filter_map(|p| purge_ids.get(p).map(String::as_str))
            .collect();
        let tracking_id = (!tracking.is_empty()).then(|| tracking.join(","));

        Ok(InvalidationResult::success(
            PROVIDER,
            paths,
            tracking_id,
            Some(ESTIMATED_PROPAGATION_SECS),
        ))
    }
}
