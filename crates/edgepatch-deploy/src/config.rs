//! Engine configuration.
//!
//! Built from `EDGEPATCH_*` environment variables or deserialized from a
//! configuration file. Site-level CDN settings are overlaid on top of the
//! engine defaults per deployment.

use std::collections::BTreeMap;

use serde::Deserialize;
use url::Url;
use zeroize::Zeroizing;

use edgepatch_core::{CdnProviderConfig, Site, DEFAULT_SCHEMA_VERSION};

use crate::error::ConfigError;
use crate::preview::PreviewOptions;

pub const DEFAULT_BUCKET: &str = "edge-configs";
pub const DEFAULT_PREVIEW_BUCKET: &str = "edge-configs-preview";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for an [`EdgeDeployer`](crate::EdgeDeployer).
///
/// Custom `Debug` implementation redacts the `store_token` field to prevent
/// credential leakage in log output.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Base URL of the HTTP object store.
    pub store_url: Option<Url>,
    pub store_token: Option<Zeroizing<String>>,
    /// Production bucket.
    pub bucket: String,
    /// Bucket preview documents are written to; never the production one.
    pub preview_bucket: String,
    /// Timeout for storage and HTML requests.
    pub timeout_secs: u64,
    /// `schemaVersion` stamped on written documents.
    pub schema_version: String,
    /// Providers invalidated when a site does not choose its own.
    pub cdn_providers: Vec<String>,
    /// Per-provider defaults, keyed by provider id.
    pub cdn: BTreeMap<String, CdnProviderConfig>,
    pub preview: PreviewOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store_url: None,
            store_token: None,
            bucket: DEFAULT_BUCKET.to_string(),
            preview_bucket: DEFAULT_PREVIEW_BUCKET.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            schema_version: DEFAULT_SCHEMA_VERSION.to_string(),
            cdn_providers: Vec::new(),
            cdn: BTreeMap::new(),
            preview: PreviewOptions::default(),
        }
    }
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("store_url", &self.store_url)
            .field("store_token", &self.store_token.as_ref().map(|_| "[REDACTED]"))
            .field("bucket", &self.bucket)
            .field("preview_bucket", &self.preview_bucket)
            .field("timeout_secs", &self.timeout_secs)
            .field("schema_version", &self.schema_version)
            .field("cdn_providers", &self.cdn_providers)
            .field("cdn", &self.cdn)
            .field("preview", &self.preview)
            .finish()
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `EDGEPATCH_STORE_URL`, `EDGEPATCH_STORE_TOKEN`
    /// - `EDGEPATCH_BUCKET` (default: `edge-configs`)
    /// - `EDGEPATCH_PREVIEW_BUCKET` (default: `edge-configs-preview`)
    /// - `EDGEPATCH_TIMEOUT_SECS` (default: 30)
    /// - `EDGEPATCH_SCHEMA_VERSION` (default: `1.0`)
    /// - `EDGEPATCH_CDN_PROVIDERS` (comma-separated provider ids)
    /// - `EDGEPATCH_CDN_BASE_URL` (public origin of stored documents)
    /// - `EDGEPATCH_CLOUDFLARE_ZONE_ID`, `EDGEPATCH_CLOUDFLARE_API_TOKEN`,
    ///   `EDGEPATCH_CLOUDFLARE_BASE_URL`
    /// - `EDGEPATCH_FASTLY_SERVICE_ID`, `EDGEPATCH_FASTLY_API_TOKEN`,
    ///   `EDGEPATCH_FASTLY_BASE_URL`
    /// - `EDGEPATCH_PREVIEW_WARMUP_MS`, `EDGEPATCH_PREVIEW_MAX_RETRIES`,
    ///   `EDGEPATCH_PREVIEW_RETRY_DELAY_MS`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through `lookup` instead of the process
    /// environment. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let url = |name: &str| -> Result<Option<Url>, ConfigError> {
            var(name)
                .map(|raw| Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(name.to_string(), e.to_string())))
                .transpose()
        };
        let number = |name: &str, default: u64| -> Result<u64, ConfigError> {
            var(name).map_or(Ok(default), |raw| {
                raw.parse()
                    .map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue(name.to_string(), e.to_string()))
            })
        };
        let token = |name: &str| var(name).map(Zeroizing::new);

        let timeout_secs = number("EDGEPATCH_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let public_base_url = url("EDGEPATCH_CDN_BASE_URL")?;

        let mut cdn = BTreeMap::new();
        cdn.insert(
            edgepatch_cdn::cloudflare::PROVIDER.to_string(),
            CdnProviderConfig {
                api_base_url: url("EDGEPATCH_CLOUDFLARE_BASE_URL")?,
                api_token: token("EDGEPATCH_CLOUDFLARE_API_TOKEN"),
                zone_id: var("EDGEPATCH_CLOUDFLARE_ZONE_ID"),
                service_id: None,
                public_base_url: public_base_url.clone(),
                timeout_secs: Some(timeout_secs),
            },
        );
        cdn.insert(
            edgepatch_cdn::fastly::PROVIDER.to_string(),
            CdnProviderConfig {
                api_base_url: url("EDGEPATCH_FASTLY_BASE_URL")?,
                api_token: token("EDGEPATCH_FASTLY_API_TOKEN"),
                zone_id: None,
                service_id: var("EDGEPATCH_FASTLY_SERVICE_ID"),
                public_base_url,
                timeout_secs: Some(timeout_secs),
            },
        );

        let defaults = PreviewOptions::default();
        let preview = PreviewOptions {
            warmup_delay_ms: number("EDGEPATCH_PREVIEW_WARMUP_MS", defaults.warmup_delay_ms)?,
            max_retries: number("EDGEPATCH_PREVIEW_MAX_RETRIES", u64::from(defaults.max_retries))?
                .try_into()
                .map_err(|_| {
                    ConfigError::InvalidValue(
                        "EDGEPATCH_PREVIEW_MAX_RETRIES".to_string(),
                        "out of range".to_string(),
                    )
                })?,
            retry_delay_ms: number("EDGEPATCH_PREVIEW_RETRY_DELAY_MS", defaults.retry_delay_ms)?,
        };

        let config = Self {
            store_url: url("EDGEPATCH_STORE_URL")?,
            store_token: token("EDGEPATCH_STORE_TOKEN"),
            bucket: var("EDGEPATCH_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            preview_bucket: var("EDGEPATCH_PREVIEW_BUCKET")
                .unwrap_or_else(|| DEFAULT_PREVIEW_BUCKET.to_string()),
            timeout_secs,
            schema_version: var("EDGEPATCH_SCHEMA_VERSION")
                .unwrap_or_else(|| DEFAULT_SCHEMA_VERSION.to_string()),
            cdn_providers: var("EDGEPATCH_CDN_PROVIDERS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|p| !p.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            cdn,
            preview,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check invariants serde defaults cannot express. Preview writes must
    /// never reach the production bucket.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::InvalidValue("bucket".to_string(), "must not be empty".to_string()));
        }
        if self.preview_bucket.trim() == self.bucket.trim() {
            return Err(ConfigError::SharedPreviewBucket(self.preview_bucket.clone()));
        }
        Ok(())
    }

    /// Providers to invalidate for `site`: the site's own list when set,
    /// else the engine default.
    pub fn providers_for<'a>(&'a self, site: &'a Site) -> &'a [String] {
        site.edge
            .cdn_providers
            .as_deref()
            .unwrap_or(&self.cdn_providers)
    }

    /// Engine defaults for `provider` overlaid with the site's overrides.
    pub fn provider_config(&self, provider: &str, site: &Site) -> CdnProviderConfig {
        let base = self.cdn.get(provider).cloned().unwrap_or_default();
        match site.edge.cdn.get(provider) {
            Some(overrides) => base.overlay(overrides),
            None => base,
        }
    }
}
