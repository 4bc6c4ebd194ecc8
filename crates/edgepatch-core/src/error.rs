//! # Error Types
//!
//! Errors raised while constructing or decoding core types. Per-suggestion
//! ineligibility is not an error and never appears here; see
//! [`crate::context::Eligibility`].

use thiserror::Error;

/// Top-level error type for `edgepatch-core`.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A URL could not be parsed or is not absolute.
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl {
        /// The offending input.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A patch was built with an empty selector.
    #[error("patch selector must not be empty")]
    EmptySelector,

    /// An operation name did not match any known patch operation.
    #[error("unknown patch operation: {0}")]
    UnknownOperation(String),

    /// A target audience name did not match any known audience.
    #[error("unknown target audience: {0}")]
    UnknownAudience(String),

    /// A patch payload supplied by a caller was missing or malformed.
    #[error("invalid patch payload: {0}")]
    InvalidPatch(String),

    /// A stored document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
