//! CDN client error types.

/// Errors from CDN provider calls.
#[derive(Debug, thiserror::Error)]
pub enum CdnError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Provider returned a non-2xx status.
    #[error("{provider} {endpoint} returned {status}: {body}")]
    Api {
        provider: String,
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Provider answered 2xx but reported failure in the body.
    #[error("{provider} rejected the purge: {message}")]
    Rejected { provider: String, message: String },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// No factory is registered for the provider id.
    #[error("unsupported CDN provider: {0}")]
    UnsupportedProvider(String),
    /// Client could not be constructed from its configuration.
    #[error("configuration error for {provider}: {reason}")]
    Config { provider: String, reason: String },
}
