//! # Configuration Documents
//!
//! The [`ConfigDocument`] is the deployable unit: every patch for one URL,
//! in render order. The renderer applies patches first-match-wins, so the
//! order of `patches` is part of the document's meaning.
//!
//! The [`DomainConfig`] is a coarser, site-wide document stored next to the
//! per-URL documents. It carries the global prerender policy.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::patch::Patch;

/// Schema version stamped on documents produced by this engine.
pub const DEFAULT_SCHEMA_VERSION: &str = "1.0";

/// Patch configuration for a single URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDocument {
    /// Absolute URL the document applies to.
    pub url: String,
    pub schema_version: String,
    /// Kill switch: the renderer must ignore the document while set.
    #[serde(default)]
    pub force_fail: bool,
    /// True when any contained patch needs a prerendered page.
    #[serde(default)]
    pub prerender_required: bool,
    #[serde(default)]
    pub patches: Vec<Patch>,
}

impl ConfigDocument {
    /// Build a fresh document. `prerender_required` is derived from the
    /// patches.
    pub fn new(url: impl Into<String>, schema_version: impl Into<String>, patches: Vec<Patch>) -> Self {
        let mut doc = Self {
            url: url.into(),
            schema_version: schema_version.into(),
            force_fail: false,
            prerender_required: false,
            patches,
        };
        doc.recompute_prerender();
        doc
    }

    /// Set `prerender_required` to the OR of all contained patches.
    pub fn recompute_prerender(&mut self) {
        self.prerender_required = self.patches.iter().any(|p| p.prerender_required);
    }

    /// Whether the document contains no patches.
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Number of patches in the document.
    pub fn len(&self) -> usize {
        self.patches.len()
    }

    /// Patches belonging to an opportunity, in document order.
    pub fn patches_for<'a>(&'a self, opportunity_id: &'a str) -> impl Iterator<Item = &'a Patch> + 'a {
        self.patches
            .iter()
            .filter(move |p| p.opportunity_id.as_deref() == Some(opportunity_id))
    }

    /// Whether a structural (suggestion-less) patch for the opportunity
    /// already targets `selector`.
    pub fn has_structural_patch(&self, opportunity_id: &str, selector: &str) -> bool {
        self.patches_for(opportunity_id)
            .any(|p| p.is_structural() && p.selector == selector)
    }

    /// Decode a stored document.
    pub fn from_json(bytes: &[u8]) -> Result<Self, CoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Encode for storage.
    pub fn to_json(&self) -> Result<Vec<u8>, CoreError> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Site-wide configuration consulted before per-URL documents.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainConfig {
    pub site_id: String,
    /// When set, every document on the site is served prerendered.
    #[serde(default)]
    pub prerender_required: bool,
}

impl DomainConfig {
    pub fn from_json(bytes: &[u8]) -> Result<Self, CoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, CoreError> {
        Ok(serde_json::to_vec(self)?)
    }
}
