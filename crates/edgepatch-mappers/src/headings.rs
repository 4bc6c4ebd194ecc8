//! Heading fixes: empty headings, a missing `h1`, and over-long `h1`s.
//!
//! Payload:
//!
//! ```json
//! {
//!   "checkType": "heading-empty",
//!   "recommendedAction": "Pricing plans",
//!   "currentValue": "",
//!   "transformRules": { "selector": "main h2:nth-of-type(2)", "action": "replace" }
//! }
//! ```

use edgepatch_core::{ConfigDocument, Eligibility, Patch, PatchOperation, Suggestion};

use crate::mapper::{patch_per_suggestion, require_selector, OpportunityMapper, TransformRules};

/// Check types that can be fixed by a single text patch.
pub const SUPPORTED_CHECK_TYPES: &[&str] = &["heading-empty", "heading-missing-h1", "heading-h1-length"];

#[derive(Debug, Default, Clone, Copy)]
pub struct HeadingsMapper;

impl HeadingsMapper {
    pub const OPPORTUNITY_TYPE: &'static str = "headings";

    fn operation(rules: &TransformRules) -> Result<PatchOperation, Eligibility> {
        rules.action_or(PatchOperation::Replace).map_err(|raw| {
            Eligibility::rejected(format!("transformRules.action {raw:?} is not a valid operation"))
        })
    }
}

impl OpportunityMapper for HeadingsMapper {
    fn opportunity_type(&self) -> &str {
        Self::OPPORTUNITY_TYPE
    }

    fn requires_prerender(&self) -> bool {
        false
    }

    fn can_deploy(&self, suggestion: &Suggestion) -> Eligibility {
        let Some(check_type) = suggestion.data_str("checkType") else {
            return Eligibility::rejected("checkType is required");
        };
        if !SUPPORTED_CHECK_TYPES.contains(&check_type) {
            return Eligibility::rejected(format!(
                "checkType {check_type} is not supported for edge deployment"
            ));
        }
        if suggestion.data_str("recommendedAction").is_none() {
            return Eligibility::rejected("recommendedAction is required");
        }
        let rules = TransformRules::from_suggestion(suggestion);
        if let Err(rejection) = require_selector(rules.as_ref()) {
            return rejection;
        }
        let rules = rules.unwrap_or_default();
        let operation = match Self::operation(&rules) {
            Ok(op) => op,
            Err(rejection) => return rejection,
        };
        if operation.is_insertion() && rules.tag().is_none() {
            return Eligibility::rejected("transformRules.tag is required when inserting a heading");
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
            let rules = TransformRules::from_suggestion(suggestion).unwrap_or_default();
            let operation = rules.action_or(PatchOperation::Replace).unwrap_or(PatchOperation::Replace);
            let patch = Patch::text(
                operation,
                rules.selector().unwrap_or_default(),
                suggestion.data_str("recommendedAction").unwrap_or_default(),
                suggestion.last_updated_ms(),
            )?;
            Ok(patch
                .with_tag(rules.tag())
                .with_previous_value(suggestion.data_str("currentValue").map(str::to_string)))
        })
    }
}
