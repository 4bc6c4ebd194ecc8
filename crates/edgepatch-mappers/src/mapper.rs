//! # Mapper Trait
//!
//! The capability set every opportunity mapper provides, plus the shared
//! plumbing most mappers use: reading `transformRules`, and the
//! validate-build-stamp loop that turns a batch of suggestions into patches
//! without letting one bad suggestion abort the batch.

use serde::Deserialize;

use edgepatch_core::{
    remove_patches, ConfigDocument, CoreError, Eligibility, Patch, PatchOperation, Suggestion,
    TargetAudience,
};

/// Translation from one category of suggestions into patches.
///
/// Implementations must be `Send + Sync` so the registry can be shared
/// across async tasks behind an `Arc`. The trait is object-safe.
pub trait OpportunityMapper: Send + Sync {
    /// Category label this mapper handles; the registry key.
    fn opportunity_type(&self) -> &str;

    /// Whether patches of this category need a prerendered page.
    fn requires_prerender(&self) -> bool;

    /// Check that the suggestion carries everything the mapper needs.
    ///
    /// Must be a pure function of the suggestion's data.
    fn can_deploy(&self, suggestion: &Suggestion) -> Eligibility;

    /// Build patches for a batch of suggestions targeting `url_path`.
    ///
    /// Ineligible suggestions are skipped and logged. `existing` is the
    /// currently deployed document for the URL, consulted by mappers that
    /// emit structural patches.
    fn suggestions_to_patches(
        &self,
        url_path: &str,
        suggestions: &[Suggestion],
        opportunity_id: &str,
        existing: Option<&ConfigDocument>,
    ) -> Vec<Patch>;

    /// Remove the patches of the given suggestions from `document`.
    ///
    /// Returns the number of patches removed. The default removes keyed
    /// matches only.
    fn rollback_patches(
        &self,
        document: &mut ConfigDocument,
        opportunity_id: &str,
        suggestion_ids: &[String],
    ) -> usize {
        remove_patches(document, opportunity_id, suggestion_ids)
    }
}

/// The `transformRules` object most suggestion payloads carry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformRules {
    #[serde(default)]
    pub selector: Option<String>,
    /// Operation name; most categories call it `action`.
    #[serde(default)]
    pub action: Option<String>,
    /// Operation name as written by the readability pipeline.
    #[serde(default)]
    pub op: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
}

impl TransformRules {
    /// Read `data.transformRules`; `None` when absent or not an object.
    pub fn from_suggestion(suggestion: &Suggestion) -> Option<Self> {
        suggestion
            .data
            .get("transformRules")
            .filter(|v| v.is_object())
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Non-blank selector.
    pub fn selector(&self) -> Option<&str> {
        self.selector
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Parsed `action`, `default` when absent. `Err` carries the raw name.
    pub fn action_or(&self, default: PatchOperation) -> Result<PatchOperation, String> {
        match self.action.as_deref().map(str::trim) {
            None | Some("") => Ok(default),
            Some(raw) => raw.parse().map_err(|_| raw.to_string()),
        }
    }

    /// Non-blank tag name.
    pub fn tag(&self) -> Option<String> {
        self.tag
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }
}

/// Resolve the selector, or a rejection.
pub(crate) fn require_selector(rules: Option<&TransformRules>) -> Result<&str, Eligibility> {
    rules
        .and_then(TransformRules::selector)
        .ok_or_else(|| Eligibility::rejected("transformRules.selector is required"))
}

/// Audience requested by the suggestion, else the default.
pub(crate) fn target_audience(suggestion: &Suggestion) -> TargetAudience {
    suggestion
        .data_str("targetAudience")
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_default()
}

/// Stamp provenance, audience, and prerender flag onto a freshly built patch.
pub(crate) fn stamp(
    patch: Patch,
    mapper: &dyn OpportunityMapper,
    suggestion: &Suggestion,
    opportunity_id: &str,
) -> Patch {
    let prerender = mapper.requires_prerender()
        || suggestion
            .data
            .get("prerenderRequired")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
    patch
        .with_provenance(opportunity_id, Some(suggestion.id.clone()))
        .with_target_audience(target_audience(suggestion))
        .with_prerender(prerender)
}

/// Check eligibility and log a skip. Returns true when the suggestion may
/// proceed.
pub(crate) fn admit(
    mapper: &dyn OpportunityMapper,
    url_path: &str,
    suggestion: &Suggestion,
    opportunity_id: &str,
) -> bool {
    let verdict = mapper.can_deploy(suggestion);
    if !verdict.eligible {
        tracing::warn!(
            opportunity_type = mapper.opportunity_type(),
            opportunity_id,
            suggestion_id = %suggestion.id,
            url_path,
            reason = verdict.reason.as_deref().unwrap_or_default(),
            "skipping ineligible suggestion"
        );
    }
    verdict.eligible
}

/// One-patch-per-suggestion loop shared by most mappers.
///
/// `build` only sees suggestions that passed `can_deploy`; a build error
/// is logged and the suggestion skipped.
pub(crate) fn patch_per_suggestion<F>(
    mapper: &dyn OpportunityMapper,
    url_path: &str,
    suggestions: &[Suggestion],
    opportunity_id: &str,
    build: F,
) -> Vec<Patch>
where
    F: Fn(&Suggestion) -> Result<Patch, CoreError>,
{
    let mut patches = Vec::with_capacity(suggestions.len());
    for suggestion in suggestions {
        if !admit(mapper, url_path, suggestion, opportunity_id) {
            continue;
        }
        match build(suggestion) {
            Ok(patch) => patches.push(stamp(patch, mapper, suggestion, opportunity_id)),
            Err(e) => tracing::warn!(
                opportunity_type = mapper.opportunity_type(),
                suggestion_id = %suggestion.id,
                "failed to build patch: {e}"
            ),
        }
    }
    patches
}
