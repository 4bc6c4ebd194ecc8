//! Table of contents navigation.

use serde::Deserialize;

use edgepatch_core::{ConfigDocument, Eligibility, Patch, PatchOperation, Suggestion, TreeNode};

use crate::mapper::{patch_per_suggestion, require_selector, OpportunityMapper, TransformRules};

#[derive(Debug, Clone, Deserialize)]
struct TocEntry {
    #[serde(default)]
    text: String,
    #[serde(default = "default_level")]
    level: u8,
    #[serde(default)]
    id: String,
}

fn default_level() -> u8 {
    2
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TocMapper;

impl TocMapper {
    pub const OPPORTUNITY_TYPE: &'static str = "table-of-contents";

    fn entries(suggestion: &Suggestion) -> Vec<TocEntry> {
        suggestion
            .data
            .get("toc")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    fn navigation(entries: &[TocEntry]) -> TreeNode {
        let items = entries
            .iter()
            .map(|entry| {
                let link = TreeNode::text_element("a", entry.text.trim())
                    .with_property("href", format!("#{}", entry.id.trim()));
                TreeNode::element("li", vec![link])
                    .with_property("class", format!("toc-level-{}", entry.level))
            })
            .collect();
        TreeNode::element("nav", vec![TreeNode::element("ul", items)])
            .with_property("class", "table-of-contents")
    }
}

impl OpportunityMapper for TocMapper {
    fn opportunity_type(&self) -> &str {
        Self::OPPORTUNITY_TYPE
    }

    fn requires_prerender(&self) -> bool {
        true
    }

    fn can_deploy(&self, suggestion: &Suggestion) -> Eligibility {
        let entries = Self::entries(suggestion);
        if entries.is_empty() {
            return Eligibility::rejected("toc must contain at least one entry");
        }
        if entries
            .iter()
            .any(|e| e.text.trim().is_empty() || e.id.trim().is_empty())
        {
            return Eligibility::rejected("toc entries require text and id");
        }
        let rules = TransformRules::from_suggestion(suggestion);
        if let Err(rejection) = require_selector(rules.as_ref()) {
            return rejection;
        }
        match rules.unwrap_or_default().action_or(PatchOperation::InsertBefore) {
            Ok(op) if op.is_insertion() => Eligibility::eligible(),
            _ => Eligibility::rejected("transformRules.action must insert content for table-of-contents suggestions"),
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
                .action_or(PatchOperation::InsertBefore)
                .unwrap_or(PatchOperation::InsertBefore);
            Patch::tree(
                operation,
                rules.selector().unwrap_or_default(),
                &Self::navigation(&Self::entries(suggestion)),
                suggestion.last_updated_ms(),
            )
        })
    }
}
