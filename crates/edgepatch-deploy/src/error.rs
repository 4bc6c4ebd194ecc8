//! Error types for the deployment crate.

use edgepatch_cdn::CdnError;
use edgepatch_core::CoreError;

/// Errors returned by [`EdgeDeployer`](crate::EdgeDeployer) operations.
///
/// Input errors are returned before any I/O. Per-suggestion problems and
/// CDN failures never appear here; they are recorded in the result.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// No mapper is registered for the opportunity type.
    #[error("unsupported opportunity type: {0}")]
    UnsupportedOpportunity(String),

    /// A preview batch targets more than one URL.
    #[error("preview suggestions must target a single url, got {}", .0.join(", "))]
    MixedPreviewUrls(Vec<String>),

    #[error("preview is disabled for site {site_id}")]
    PreviewDisabled { site_id: String },

    #[error("preview requires at least one suggestion")]
    EmptyPreviewBatch,

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A configured CDN provider is unknown or its client cannot be built.
    #[error("invalid CDN configuration for {provider}: {source}")]
    InvalidCdnConfig {
        provider: String,
        #[source]
        source: CdnError,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Core(#[from] CoreError),

    /// The caller cancelled a preview while it was waiting.
    #[error("preview cancelled")]
    Cancelled,
}

/// Durable storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    #[error("object store {endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// A stored object exists but does not decode.
    #[error("stored object {path} is corrupt: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: CoreError,
    },
    #[error("object store configuration error: {0}")]
    Config(String),
}

/// Page HTML fetch failures during preview.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error fetching {url}: {source}")]
    Http { url: String, source: reqwest::Error },
    #[error("{url} returned {status}")]
    Status { url: String, status: u16 },
    #[error("failed to read body of {url}: {source}")]
    Body { url: String, source: reqwest::Error },
    #[error("HTML fetcher configuration error: {0}")]
    Config(String),
}

/// Engine configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
    /// Preview documents would land in the production bucket.
    #[error("preview bucket {0:?} must differ from the production bucket")]
    SharedPreviewBucket(String),
}
