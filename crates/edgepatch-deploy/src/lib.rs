//! # edgepatch-deploy — Deployment Orchestrator
//!
//! [`EdgeDeployer`] runs the shared pipeline
//!
//! ```text
//! suggestions ─▶ mapper ─▶ merge with stored document ─▶ persist ─▶ invalidate CDN
//! ```
//!
//! in three modes:
//!
//! - **deploy** merges new patches into the production document;
//! - **rollback** removes the patches of the given suggestions;
//! - **preview** writes the merged document to the preview bucket and
//!   compares the page HTML before and after.
//!
//! ## Failure Model
//!
//! | Failure | Surfaces as |
//! |---------|-------------|
//! | unsupported opportunity, bad CDN config, mixed preview batch | `Err(DeployError)` before any I/O |
//! | ineligible suggestion | entry in `failed_suggestions` |
//! | storage read/write | `Err(DeployError::Storage)` |
//! | CDN purge | failed entry in `cdn_invalidations`, logged at error |
//! | preview HTML unchanged | normal result with `changed = false` |
//!
//! Persistence is the only success criterion for a suggestion.
//!
//! ## Collaborators
//!
//! Storage, HTML fetching and sleeping sit behind [`ObjectStore`],
//! [`HtmlFetcher`] and [`Sleeper`] so tests can run without a network or a
//! clock.

pub mod config;
pub mod deployer;
pub mod error;
pub mod html;
pub mod preview;
pub mod result;
pub mod sleep;
pub mod store;

pub use config::EngineConfig;
pub use deployer::EdgeDeployer;
pub use error::{ConfigError, DeployError, FetchError, StorageError};
pub use html::{FetchMode, HtmlFetcher, HttpHtmlFetcher};
pub use preview::PreviewOptions;
pub use result::{DeploymentResult, FailedSuggestion, PreviewHtml, PreviewResult, RollbackResult};
pub use sleep::{Sleeper, TokioSleeper};
pub use store::{HttpObjectStore, InMemoryObjectStore, ObjectStore};
