//! # CDN Provider Credentials
//!
//! Shared by the engine configuration (process-wide defaults) and the site
//! edge configuration (per-site overrides). Which fields a provider needs
//! is decided by the provider client's `validate_config`.

use serde::{Deserialize, Serialize};
use url::Url;
use zeroize::Zeroizing;

/// Connection settings for one CDN provider.
///
/// Custom `Debug` implementation redacts the `api_token` field to prevent
/// credential leakage in log output.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CdnProviderConfig {
    /// Provider API base URL; the client's public endpoint when unset.
    #[serde(default)]
    pub api_base_url: Option<Url>,
    #[serde(default, skip_serializing)]
    pub api_token: Option<Zeroizing<String>>,
    /// Cloudflare zone.
    #[serde(default)]
    pub zone_id: Option<String>,
    /// Fastly service.
    #[serde(default)]
    pub service_id: Option<String>,
    /// Public origin the stored documents are served from. Providers that
    /// purge by absolute URL prefix invalidation paths with it.
    #[serde(default)]
    pub public_base_url: Option<Url>,
    /// Request timeout in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl std::fmt::Debug for CdnProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdnProviderConfig")
            .field("api_base_url", &self.api_base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("zone_id", &self.zone_id)
            .field("service_id", &self.service_id)
            .field("public_base_url", &self.public_base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl CdnProviderConfig {
    /// Layer `overrides` on top of `self`: every field set in `overrides`
    /// wins.
    pub fn overlay(&self, overrides: &CdnProviderConfig) -> CdnProviderConfig {
        CdnProviderConfig {
            api_base_url: overrides.api_base_url.clone().or_else(|| self.api_base_url.clone()),
            api_token: overrides.api_token.clone().or_else(|| self.api_token.clone()),
            zone_id: overrides.zone_id.clone().or_else(|| self.zone_id.clone()),
            service_id: overrides.service_id.clone().or_else(|| self.service_id.clone()),
            public_base_url: overrides
                .public_base_url
                .clone()
                .or_else(|| self.public_base_url.clone()),
            timeout_secs: overrides.timeout_secs.or(self.timeout_secs),
        }
    }

    /// The API token, if set and non-blank.
    pub fn token(&self) -> Option<&str> {
        self.api_token
            .as_ref()
            .map(|t| t.as_str())
            .filter(|t| !t.trim().is_empty())
    }
}
