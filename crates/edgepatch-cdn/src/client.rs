//! # CDN Client Contract

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CdnError;

/// Outcome class of one invalidation group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidationStatus {
    Success,
    /// Nothing to invalidate; no request was made.
    Skipped,
    /// The provider call failed. Only produced by the engine when it
    /// records a [`CdnError`]; clients return the error instead.
    Failed,
}

impl std::fmt::Display for InvalidationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Skipped => write!(f, "skipped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Result of one batched invalidation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidationResult {
    pub provider: String,
    pub status: InvalidationStatus,
    /// Normalized paths submitted.
    pub paths: Vec<String>,
    /// Provider-side purge identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_id: Option<String>,
    /// Provider's estimate of edge propagation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InvalidationResult {
    pub fn success(
        provider: impl Into<String>,
        paths: Vec<String>,
        tracking_id: Option<String>,
        estimated_seconds: Option<u64>,
    ) -> Self {
        Self {
            provider: provider.into(),
            status: InvalidationStatus::Success,
            paths,
            tracking_id,
            estimated_seconds,
            error: None,
        }
    }

    pub fn skipped(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            status: InvalidationStatus::Skipped,
            paths: Vec::new(),
            tracking_id: None,
            estimated_seconds: None,
            error: None,
        }
    }

    /// Failure marker for a group whose provider call errored.
    pub fn failed(provider: impl Into<String>, paths: Vec<String>, error: &CdnError) -> Self {
        Self {
            provider: provider.into(),
            status: InvalidationStatus::Failed,
            paths: normalize_paths(&paths),
            tracking_id: None,
            estimated_seconds: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == InvalidationStatus::Success
    }
}

/// A cache-invalidation provider.
///
/// Implementations must be `Send + Sync`; the engine shares them behind
/// `Arc` across concurrent invalidation groups.
#[async_trait]
pub trait CdnClient: Send + Sync {
    /// Registry id of the provider, e.g. `"cloudflare"`.
    fn provider_name(&self) -> &str;

    /// Whether every field the provider needs is present. Logs the first
    /// missing field and returns `false`; never errors.
    fn validate_config(&self) -> bool;

    /// Invalidate `paths` with a single batched request.
    ///
    /// An empty list returns [`InvalidationStatus::Skipped`] without a
    /// network call. Paths are normalized to start with `/`.
    async fn invalidate_cache(&self, paths: &[String]) -> Result<InvalidationResult, CdnError>;
}

/// Prefix every path with `/`, dropping blanks and duplicates while keeping
/// first-seen order.
pub fn normalize_paths(paths: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(paths.len());
    for path in paths.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        if !normalized.contains(&path) {
            normalized.push(path);
        }
    }
    normalized
}

/// Log a missing configuration field and return `false`.
pub(crate) fn missing(provider: &str, field: &str) -> bool {
    tracing::error!(provider, field, "CDN provider is missing required configuration");
    false
}
