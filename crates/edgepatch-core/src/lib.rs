//! # edgepatch-core — Foundational Types for the Edge-Patch Engine
//!
//! This crate defines the data model every other `edgepatch-*` crate builds
//! on. It performs no I/O; everything here is a pure function of its inputs.
//!
//! ## Contents
//!
//! - [`patch`]: a single DOM mutation instruction ([`Patch`]) and its
//!   merge key.
//! - [`tree`]: the structured value format carried by `tree` patches.
//! - [`document`]: the per-URL [`ConfigDocument`] and the site-wide
//!   [`DomainConfig`].
//! - [`merge`]: the keyed merge and removal engine.
//! - [`context`]: collaborator records (site, opportunity, suggestion) and
//!   the eligibility verdict mappers return.
//! - [`cdn`]: provider credentials shared by the CDN layer and site config.
//! - [`key`]: storage key derivation for documents and domain configs.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `edgepatch-*` crates (leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - JSON field names are camelCase; the stored document shape is the
//!   contract with the edge renderer and is versioned by `schemaVersion`.

pub mod cdn;
pub mod context;
pub mod document;
pub mod error;
pub mod key;
pub mod merge;
pub mod patch;
pub mod tree;

// Re-export primary types for ergonomic imports.
pub use cdn::CdnProviderConfig;
pub use context::{Eligibility, Opportunity, Site, SiteEdgeConfig, Suggestion};
pub use document::{ConfigDocument, DomainConfig, DEFAULT_SCHEMA_VERSION};
pub use error::CoreError;
pub use key::ConfigKey;
pub use merge::{merge_documents, remove_patches};
pub use patch::{MergeKey, Patch, PatchOperation, TargetAudience, ValueFormat};
pub use tree::TreeNode;
