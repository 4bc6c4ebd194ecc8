//! # Patch Model
//!
//! A [`Patch`] is one atomic DOM mutation instruction targeting a CSS
//! selector. Patches are opaque to this engine: they are produced by mappers,
//! merged, persisted, and finally applied by the edge renderer.
//!
//! ## Merge Key
//!
//! A patch that carries a `suggestionId` is uniquely identified within one
//! URL's document by `(opportunityId, suggestionId)`. Patches without a
//! suggestion id are structural (for example a FAQ section heading) and are
//! never matched by key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::tree::TreeNode;

/// The DOM mutation a patch performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PatchOperation {
    /// Replace the content of the matched node.
    Replace,
    /// Insert a new node after the matched node.
    InsertAfter,
    /// Insert a new node before the matched node.
    InsertBefore,
    /// Append a new node as the last child of the matched node.
    AppendChild,
}

impl PatchOperation {
    /// Wire name of the operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::InsertAfter => "insertAfter",
            Self::InsertBefore => "insertBefore",
            Self::AppendChild => "appendChild",
        }
    }

    /// Whether the operation introduces a new node rather than rewriting one.
    pub fn is_insertion(&self) -> bool {
        !matches!(self, Self::Replace)
    }
}

impl fmt::Display for PatchOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatchOperation {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "replace" => Ok(Self::Replace),
            "insertAfter" => Ok(Self::InsertAfter),
            "insertBefore" => Ok(Self::InsertBefore),
            "appendChild" => Ok(Self::AppendChild),
            other => Err(CoreError::UnknownOperation(other.to_string())),
        }
    }
}

/// How the `value` of a patch is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueFormat {
    /// `value` is a plain string.
    #[default]
    Text,
    /// `value` is a [`TreeNode`].
    Tree,
}

/// Which crawler/user-agent classes receive a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TargetAudience {
    /// LLM crawlers and AI assistants only.
    #[default]
    #[serde(rename = "ai-bots")]
    AiBots,
    /// All known bots, including search engines.
    #[serde(rename = "bots")]
    Bots,
    /// Every visitor.
    #[serde(rename = "all")]
    All,
}

impl FromStr for TargetAudience {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ai-bots" => Ok(Self::AiBots),
            "bots" => Ok(Self::Bots),
            "all" => Ok(Self::All),
            other => Err(CoreError::UnknownAudience(other.to_string())),
        }
    }
}

/// Identity of a suggestion-scoped patch inside one document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MergeKey {
    /// Opportunity the patch belongs to (may be empty for legacy patches).
    pub opportunity_id: String,
    /// Suggestion that produced the patch.
    pub suggestion_id: String,
}

impl MergeKey {
    /// Build a key from its parts.
    pub fn new(opportunity_id: impl Into<String>, suggestion_id: impl Into<String>) -> Self {
        Self {
            opportunity_id: opportunity_id.into(),
            suggestion_id: suggestion_id.into(),
        }
    }
}

impl fmt::Display for MergeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.opportunity_id, self.suggestion_id)
    }
}

/// One DOM mutation instruction.
///
/// `value` is kept as raw JSON so documents written by newer mappers survive
/// a round trip through older engines; `value_format` says how to read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patch {
    pub operation: PatchOperation,
    pub selector: String,
    pub value: serde_json::Value,
    #[serde(default)]
    pub value_format: ValueFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_value: Option<String>,
    #[serde(default)]
    pub target_audience: TargetAudience,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opportunity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion_id: Option<String>,
    #[serde(default)]
    pub prerender_required: bool,
    /// Epoch milliseconds of the source suggestion, not of patch creation.
    pub last_updated: i64,
}

impl Patch {
    /// Build a text patch.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptySelector`] when `selector` is blank.
    pub fn text(
        operation: PatchOperation,
        selector: impl Into<String>,
        value: impl Into<String>,
        last_updated: i64,
    ) -> Result<Self, CoreError> {
        Self::build(
            operation,
            selector.into(),
            serde_json::Value::String(value.into()),
            ValueFormat::Text,
            last_updated,
        )
    }

    /// Build a tree patch.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptySelector`] when `selector` is blank, or
    /// [`CoreError::Serialization`] if the tree cannot be encoded.
    pub fn tree(
        operation: PatchOperation,
        selector: impl Into<String>,
        value: &TreeNode,
        last_updated: i64,
    ) -> Result<Self, CoreError> {
        Self::build(
            operation,
            selector.into(),
            serde_json::to_value(value)?,
            ValueFormat::Tree,
            last_updated,
        )
    }

    fn build(
        operation: PatchOperation,
        selector: String,
        value: serde_json::Value,
        value_format: ValueFormat,
        last_updated: i64,
    ) -> Result<Self, CoreError> {
        if selector.trim().is_empty() {
            return Err(CoreError::EmptySelector);
        }
        Ok(Self {
            operation,
            selector,
            value,
            value_format,
            tag: None,
            previous_value: None,
            target_audience: TargetAudience::default(),
            opportunity_id: None,
            suggestion_id: None,
            prerender_required: false,
            last_updated,
        })
    }

    /// Attach provenance.
    pub fn with_provenance(
        mut self,
        opportunity_id: impl Into<String>,
        suggestion_id: Option<String>,
    ) -> Self {
        self.opportunity_id = Some(opportunity_id.into());
        self.suggestion_id = suggestion_id;
        self
    }

    pub fn with_tag(mut self, tag: Option<String>) -> Self {
        self.tag = tag;
        self
    }

    pub fn with_previous_value(mut self, previous: Option<String>) -> Self {
        self.previous_value = previous;
        self
    }

    pub fn with_target_audience(mut self, audience: TargetAudience) -> Self {
        self.target_audience = audience;
        self
    }

    pub fn with_prerender(mut self, required: bool) -> Self {
        self.prerender_required = required;
        self
    }

    /// The merge key, or `None` for structural patches.
    pub fn merge_key(&self) -> Option<MergeKey> {
        self.suggestion_id.as_ref().map(|sid| MergeKey {
            opportunity_id: self.opportunity_id.clone().unwrap_or_default(),
            suggestion_id: sid.clone(),
        })
    }

    /// Whether this patch is structural (not scoped to a suggestion).
    pub fn is_structural(&self) -> bool {
        self.suggestion_id.is_none()
    }

    /// Human-readable value, flattening tree values to their text content.
    pub fn display_value(&self) -> String {
        match (&self.value_format, &self.value) {
            (ValueFormat::Text, serde_json::Value::String(s)) => s.clone(),
            (ValueFormat::Tree, value) => serde_json::from_value::<TreeNode>(value.clone())
                .map(|node| node.text_content())
                .unwrap_or_else(|_| value.to_string()),
            (_, other) => other.to_string(),
        }
    }
}
