//! # edgepatch-cdn — Cache Invalidation
//!
//! Decouples the deployment engine from any single CDN vendor. Every
//! provider implements [`CdnClient`]; the engine picks clients through a
//! [`CdnClientRegistry`] keyed by provider id.
//!
//! ## Failure Model
//!
//! - [`CdnClient::validate_config`] never errors. A misconfigured provider
//!   logs the missing field and returns `false`; the engine skips that
//!   invalidation group and still deploys.
//! - [`CdnClient::invalidate_cache`] propagates transport and provider
//!   errors as [`CdnError`]. The engine records them as failed
//!   invalidations; stored documents are unaffected.
//!
//! ## Providers
//!
//! | Id | Client | Purge by |
//! |----|--------|----------|
//! | `cloudflare` | [`CloudflareClient`] | absolute URL (`files`) |
//! | `fastly` | [`FastlyClient`] | surrogate key |

pub mod client;
pub mod cloudflare;
pub mod error;
pub mod fastly;
pub mod registry;
pub mod retry;

pub use client::{normalize_paths, CdnClient, InvalidationResult, InvalidationStatus};
pub use cloudflare::CloudflareClient;
pub use error::CdnError;
pub use fastly::FastlyClient;
pub use registry::{CdnClientFactory, CdnClientRegistry};
pub use retry::RetryPolicy;
