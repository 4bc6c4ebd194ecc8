//! Pass-through mapper for suggestions that already carry a fully formed
//! patch under `data.patch`.

use serde::Deserialize;

use edgepatch_core::{
    ConfigDocument, CoreError, Eligibility, Patch, PatchOperation, Suggestion, TreeNode, ValueFormat,
};

use crate::mapper::{patch_per_suggestion, OpportunityMapper};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPatch {
    operation: String,
    selector: String,
    value: serde_json::Value,
    #[serde(default)]
    value_format: ValueFormat,
    #[serde(default)]
    tag: Option<String>,
    #[serde(default)]
    previous_value: Option<String>,
}

impl RawPatch {
    fn from_suggestion(suggestion: &Suggestion) -> Result<Self, String> {
        let raw = suggestion
            .data
            .get("patch")
            .ok_or_else(|| "patch is required".to_string())?;
        serde_json::from_value(raw.clone()).map_err(|e| format!("patch is malformed: {e}"))
    }

    fn into_patch(self, last_updated: i64) -> Result<Patch, CoreError> {
        let operation: PatchOperation = self.operation.parse()?;
        let patch = match self.value_format {
            ValueFormat::Text => {
                let text = self.value.as_str().unwrap_or_default().to_string();
                Patch::text(operation, self.selector, text, last_updated)?
            }
            ValueFormat::Tree => {
                let tree: TreeNode = serde_json::from_value(self.value)?;
                Patch::tree(operation, self.selector, &tree, last_updated)?
            }
        };
        Ok(patch.with_tag(self.tag).with_previous_value(self.previous_value))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GenericMapper;

impl GenericMapper {
    pub const OPPORTUNITY_TYPE: &'static str = "generic";
}

impl OpportunityMapper for GenericMapper {
    fn opportunity_type(&self) -> &str {
        Self::OPPORTUNITY_TYPE
    }

    fn requires_prerender(&self) -> bool {
        false
    }

    fn can_deploy(&self, suggestion: &Suggestion) -> Eligibility {
        let raw = match RawPatch::from_suggestion(suggestion) {
            Ok(raw) => raw,
            Err(reason) => return Eligibility::rejected(reason),
        };
        if raw.operation.parse::<PatchOperation>().is_err() {
            return Eligibility::rejected(format!(
                "patch.operation {:?} is not a valid operation",
                raw.operation
            ));
        }
        if raw.selector.trim().is_empty() {
            return Eligibility::rejected("patch.selector is required");
        }
        let value_ok = match raw.value_format {
            ValueFormat::Text => raw.value.as_str().is_some_and(|s| !s.trim().is_empty()),
            ValueFormat::Tree => serde_json::from_value::<TreeNode>(raw.value).is_ok(),
        };
        if !value_ok {
            return Eligibility::rejected("patch.value does not match patch.valueFormat");
        }
        Eligibility::eligible()
    }

    fn suggestions_to_patches(
        &self,
        url_path: &str,
        suggestions: &[Suggestion],
        opportunity_id: &str,
        _existing: Option<&ConfigDocument>,
    ) -> Vec<Patch> {
        patch_per_suggestion(self, url_path, suggestions, opportunity_id, |suggestion| {
            RawPatch::from_suggestion(suggestion)
                .map_err(CoreError::InvalidPatch)?
                .into_patch(suggestion.last_updated_ms())
        })
    }
}
