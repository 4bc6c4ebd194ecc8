//! FAQ sections.
//!
//! A deployed FAQ is an `h2` heading followed by one `div` per question.
//! The heading belongs to no single suggestion, so it is emitted as a
//! structural patch the first time a selector receives FAQs and is left
//! alone on later deployments. Rolling back the last FAQ of an
//! opportunity removes the heading as well.

use std::collections::HashSet;

use edgepatch_core::{
    ConfigDocument, CoreError, Eligibility, Patch, PatchOperation, Suggestion, TreeNode,
};

use crate::mapper::{admit, require_selector, stamp, target_audience, OpportunityMapper, TransformRules};
use crate::markdown;

/// Text of the section heading.
pub const FAQ_HEADING: &str = "FAQs";

#[derive(Debug, Default, Clone, Copy)]
pub struct FaqMapper;

impl FaqMapper {
    pub const OPPORTUNITY_TYPE: &'static str = "faq";

    fn item<'a>(suggestion: &'a Suggestion, field: &str) -> Option<&'a str> {
        suggestion
            .data
            .get("item")
            .and_then(|item| item.get(field))
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    fn operation(rules: &TransformRules) -> PatchOperation {
        rules
            .action_or(PatchOperation::AppendChild)
            .unwrap_or(PatchOperation::AppendChild)
    }

    fn heading_patch(
        &self,
        selector: &str,
        operation: PatchOperation,
        first: &Suggestion,
        opportunity_id: &str,
    ) -> Result<Patch, CoreError> {
        let heading = TreeNode::text_element("h2", FAQ_HEADING);
        Ok(Patch::tree(operation, selector, &heading, first.last_updated_ms())?
            .with_provenance(opportunity_id, None)
            .with_target_audience(target_audience(first))
            .with_prerender(self.requires_prerender()))
    }

    fn entry_patch(
        selector: &str,
        operation: PatchOperation,
        suggestion: &Suggestion,
    ) -> Result<Patch, CoreError> {
        let question = Self::item(suggestion, "question").unwrap_or_default();
        let answer = Self::item(suggestion, "answer").unwrap_or_default();
        let mut children = vec![TreeNode::text_element("h3", question)];
        children.extend(markdown::to_nodes(answer));
        let entry = TreeNode::element("div", children).with_property("class", "faq-item");
        Patch::tree(operation, selector, &entry, suggestion.last_updated_ms())
    }
}

impl OpportunityMapper for FaqMapper {
    fn opportunity_type(&self) -> &str {
        Self::OPPORTUNITY_TYPE
    }

    fn requires_prerender(&self) -> bool {
        true
    }

    fn can_deploy(&self, suggestion: &Suggestion) -> Eligibility {
        if suggestion.data.get("shouldOptimize").and_then(|v| v.as_bool()) == Some(false) {
            return Eligibility::rejected("suggestion is marked shouldOptimize=false");
        }
        if Self::item(suggestion, "question").is_none() {
            return Eligibility::rejected("item.question is required");
        }
        if Self::item(suggestion, "answer").is_none() {
            return Eligibility::rejected("item.answer is required");
        }
        let rules = TransformRules::from_suggestion(suggestion);
        if let Err(rejection) = require_selector(rules.as_ref()) {
            return rejection;
        }
        match rules.unwrap_or_default().action_or(PatchOperation::AppendChild) {
            Ok(op) if op.is_insertion() => Eligibility::eligible(),
            Ok(_) => Eligibility::rejected("transformRules.action must insert content for faq suggestions"),
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
        existing: Option<&ConfigDocument>,
    ) -> Vec<Patch> {
        let mut patches = Vec::new();
        let mut headed: HashSet<String> = HashSet::new();

        for suggestion in suggestions {
            if !admit(self, url_path, suggestion, opportunity_id) {
                continue;
            }
            let rules = TransformRules::from_suggestion(suggestion).unwrap_or_default();
            let selector = rules.selector().unwrap_or_default().to_string();
            let operation = Self::operation(&rules);

            let already_headed = headed.contains(&selector)
                || existing.is_some_and(|doc| doc.has_structural_patch(opportunity_id, &selector));
            if !already_headed {
                match self.heading_patch(&selector, operation, suggestion, opportunity_id) {
                    Ok(patch) => patches.push(patch),
                    Err(e) => {
                        tracing::warn!(suggestion_id = %suggestion.id, "failed to build faq heading: {e}");
                        continue;
                    }
                }
                headed.insert(selector.clone());
            }

            match Self::entry_patch(&selector, operation, suggestion) {
                Ok(patch) => patches.push(stamp(patch, self, suggestion, opportunity_id)),
                Err(e) => tracing::warn!(suggestion_id = %suggestion.id, "failed to build faq entry: {e}"),
            }
        }
        patches
    }

    fn rollback_patches(
        &self,
        document: &mut ConfigDocument,
        opportunity_id: &str,
        suggestion_ids: &[String],
    ) -> usize {
        let mut removed = edgepatch_core::remove_patches(document, opportunity_id, suggestion_ids);
        if removed == 0 {
            return 0;
        }
        let headed: HashSet<String> = document
            .patches_for(opportunity_id)
            .filter(|p| !p.is_structural())
            .map(|p| p.selector.clone())
            .collect();
        let before = document.patches.len();
        document.patches.retain(|p| {
            !(p.is_structural()
                && p.opportunity_id.as_deref() == Some(opportunity_id)
                && !headed.contains(&p.selector))
        });
        removed += before - document.patches.len();
        document.recompute_prerender();
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use edgepatch_core::{merge_documents, DEFAULT_SCHEMA_VERSION};
    use serde_json::json;

    const URL: &str = "https://example.com/help";

    fn faq(id: &str, question: &str) -> Suggestion {
        Suggestion::new(
            id,
            json!({
                "item": {"question": question, "answer": "Yes, **always**."},
                "transformRules": {"selector": "main", "action": "appendChild"}
            }),
            Utc::now(),
        )
    }

    fn document(patches: Vec<Patch>) -> ConfigDocument {
        ConfigDocument::new(URL, DEFAULT_SCHEMA_VERSION, patches)
    }

    #[test]
    fn first_deployment_emits_heading_then_entries() {
        let patches = FaqMapper.suggestions_to_patches(
            "/help",
            &[faq("s1", "Is it free?"), faq("s2", "Is it fast?")],
            "opp-f",
            None,
        );
        assert_eq!(patches.len(), 3);
        assert!(patches[0].is_structural());
        assert_eq!(patches[0].display_value(), FAQ_HEADING);
        assert_eq!(patches[0].opportunity_id.as_deref(), Some("opp-f"));
        assert_eq!(patches[1].suggestion_id.as_deref(), Some("s1"));
        assert_eq!(patches[1].display_value(), "Is it free?Yes, always.");
        assert!(patches.iter().all(|p| p.prerender_required));
    }

    #[test]
    fn heading_not_repeated_when_document_has_it() {
        let first = FaqMapper.suggestions_to_patches("/help", &[faq("s1", "Q1")], "opp-f", None);
        let existing = document(first);

        let second =
            FaqMapper.suggestions_to_patches("/help", &[faq("s2", "Q2")], "opp-f", Some(&existing));
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].suggestion_id.as_deref(), Some("s2"));

        let merged = merge_documents(Some(&existing), document(second), None);
        assert_eq!(merged.patches.iter().filter(|p| p.is_structural()).count(), 1);
    }

    #[test]
    fn should_optimize_false_is_rejected() {
        let mut s = faq("s1", "Q");
        s.data["shouldOptimize"] = json!(false);
        assert_eq!(
            FaqMapper.can_deploy(&s).reason.as_deref(),
            Some("suggestion is marked shouldOptimize=false")
        );
    }

    #[test]
    fn replace_action_is_rejected() {
        let mut s = faq("s1", "Q");
        s.data["transformRules"]["action"] = json!("replace");
        assert!(!FaqMapper.can_deploy(&s).eligible);
    }

    #[test]
    fn rollback_of_last_entry_removes_heading() {
        let mut doc = document(FaqMapper.suggestions_to_patches(
            "/help",
            &[faq("s1", "Q1"), faq("s2", "Q2")],
            "opp-f",
            None,
        ));

        assert_eq!(FaqMapper.rollback_patches(&mut doc, "opp-f", &["s1".to_string()]), 1);
        assert_eq!(doc.len(), 2);

        assert_eq!(FaqMapper.rollback_patches(&mut doc, "opp-f", &["s2".to_string()]), 2);
        assert!(doc.is_empty());
        assert!(!doc.prerender_required);
    }

    #[test]
    fn rollback_removes_only_the_emptied_selectors_heading() {
        let mut aside = faq("s3", "Q3");
        aside.data["transformRules"]["selector"] = json!("aside");
        let mut doc = document(FaqMapper.suggestions_to_patches(
            "/help",
            &[faq("s1", "Q1"), faq("s2", "Q2"), aside],
            "opp-f",
            None,
        ));
        assert_eq!(doc.patches.iter().filter(|p| p.is_structural()).count(), 2);

        assert_eq!(FaqMapper.rollback_patches(&mut doc, "opp-f", &["s3".to_string()]), 2);
        let headings: Vec<&str> = doc
            .patches
            .iter()
            .filter(|p| p.is_structural())
            .map(|p| p.selector.as_str())
            .collect();
        assert_eq!(headings, ["main"]);
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn rollback_of_unknown_ids_keeps_heading() {
        let mut doc = document(FaqMapper.suggestions_to_patches("/help", &[faq("s1", "Q1")], "opp-f", None));
        assert_eq!(FaqMapper.rollback_patches(&mut doc, "opp-f", &["nope".to_string()]), 0);
        assert_eq!(doc.len(), 2);
    }
}
