//! Page summaries rendered from markdown.

use edgepatch_core::{ConfigDocument, Eligibility, Patch, PatchOperation, Suggestion, TreeNode};

use crate::mapper::{patch_per_suggestion, require_selector, OpportunityMapper, TransformRules};
use crate::markdown;

#[derive(Debug, Default, Clone, Copy)]
pub struct SummarizationMapper;

impl SummarizationMapper {
    pub const OPPORTUNITY_TYPE: &'static str = "content-summarization";
}

impl OpportunityMapper for SummarizationMapper {
    fn opportunity_type(&self) -> &str {
        Self::OPPORTUNITY_TYPE
    }

    fn requires_prerender(&self) -> bool {
        true
    }

    fn can_deploy(&self, suggestion: &Suggestion) -> Eligibility {
        if suggestion.data_str("summarizationText").is_none() {
            return Eligibility::rejected("summarizationText is required");
        }
        let rules = TransformRules::from_suggestion(suggestion);
        if let Err(rejection) = require_selector(rules.as_ref()) {
            return rejection;
        }
        match rules.unwrap_or_default().action_or(PatchOperation::InsertAfter) {
            Ok(_) => Eligibility::eligible(),
            Err(raw) => Eligibility::rejected(format!(
                "transformRules.action {raw:?} is not a valid operation"
            )),
        }
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
            let operation = rules
                .action_or(PatchOperation::InsertAfter)
                .unwrap_or(PatchOperation::InsertAfter);
            let summary = TreeNode::root(markdown::to_nodes(
                suggestion.data_str("summarizationText").unwrap_or_default(),
            ));
            Patch::tree(
                operation,
                rules.selector().unwrap_or_default(),
                &summary,
                suggestion.last_updated_ms(),
            )
        })
    }
}
