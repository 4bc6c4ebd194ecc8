//! Result records returned by deploy, rollback and preview.
//!
//! Every input suggestion appears exactly once, in either
//! `succeeded_suggestions` or `failed_suggestions`.

use serde::Serialize;

use edgepatch_cdn::InvalidationResult;
use edgepatch_core::Suggestion;

/// A suggestion that was not deployed, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedSuggestion {
    pub suggestion: Suggestion,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResult {
    /// `{bucket}/{key}` of every document written.
    pub storage_paths: Vec<String>,
    /// One entry per invalidation group; `None` when the provider is
    /// misconfigured and the group was skipped.
    pub cdn_invalidations: Vec<Option<InvalidationResult>>,
    pub succeeded_suggestions: Vec<Suggestion>,
    pub failed_suggestions: Vec<FailedSuggestion>,
}

impl DeploymentResult {
    pub(crate) fn fail(&mut self, suggestion: &Suggestion, reason: impl Into<String>) {
        self.failed_suggestions.push(FailedSuggestion {
            suggestion: suggestion.clone(),
            reason: reason.into(),
        });
    }

    pub fn has_failures(&self) -> bool {
        !self.failed_suggestions.is_empty()
    }

    /// Ids of the succeeded suggestions.
    pub fn succeeded_ids(&self) -> Vec<&str> {
        self.succeeded_suggestions.iter().map(|s| s.id.as_str()).collect()
    }

    /// Ids of the failed suggestions.
    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed_suggestions
            .iter()
            .map(|f| f.suggestion.id.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackResult {
    #[serde(flatten)]
    pub outcome: DeploymentResult,
    /// Patches actually removed across all documents.
    pub removed_patches_count: usize,
}

/// Before/after snapshot of the previewed page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewHtml {
    pub url: String,
    pub original_html: String,
    pub optimized_html: String,
    /// Whether the optimized HTML differs from the original.
    pub changed: bool,
    /// Optimized fetches made, including the first.
    pub attempts: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResult {
    #[serde(flatten)]
    pub outcome: DeploymentResult,
    /// `None` when nothing was previewed or the page could not be fetched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<PreviewHtml>,
    /// Why the snapshot is missing when a fetch failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_error: Option<String>,
}
