//! Readability rewrites: replace a hard-to-read passage with a simpler one.
//!
//! The readability pipeline writes the operation as `transformRules.op`
//! and only ever produces in-place replacements; anything else is a
//! malformed suggestion.

use edgepatch_core::{
    key::parse_page_url, ConfigDocument, Eligibility, Patch, PatchOperation, Suggestion,
};

use crate::mapper::{patch_per_suggestion, require_selector, OpportunityMapper, TransformRules};

#[derive(Debug, Default, Clone, Copy)]
pub struct ReadabilityMapper;

impl ReadabilityMapper {
    pub const OPPORTUNITY_TYPE: &'static str = "readability";
}

impl OpportunityMapper for ReadabilityMapper {
    fn opportunity_type(&self) -> &str {
        Self::OPPORTUNITY_TYPE
    }

    fn requires_prerender(&self) -> bool {
        true
    }

    fn can_deploy(&self, suggestion: &Suggestion) -> Eligibility {
        let rules = TransformRules::from_suggestion(suggestion);
        if let Err(rejection) = require_selector(rules.as_ref()) {
            return rejection;
        }
        if suggestion.data_str("improvedText").is_none() {
            return Eligibility::rejected("improvedText is required");
        }
        let op = rules.as_ref().and_then(|r| r.op.as_deref()).map(str::trim);
        if op != Some(PatchOperation::Replace.as_str()) {
            return Eligibility::rejected(
                r#"transformRules.op must be "replace" for readability suggestions"#,
            );
        }
        match suggestion.data_str("url").map(parse_page_url) {
            Some(Ok(_)) => Eligibility::eligible(),
            _ => Eligibility::rejected("url must be a valid absolute URL"),
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
            let patch = Patch::text(
                PatchOperation::Replace,
                rules.selector().unwrap_or_default(),
                suggestion.data_str("improvedText").unwrap_or_default(),
                suggestion.last_updated_ms(),
            )?;
            Ok(patch.with_previous_value(suggestion.data_str("originalText").map(str::to_string)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn suggestion(id: &str, op: &str) -> Suggestion {
        Suggestion::new(
            id,
            json!({
                "url": "https://example.com/guide",
                "originalText": "Utilize the aforementioned methodology.",
                "improvedText": "Use this method.",
                "scrapedAt": "2024-03-01T12:00:00Z",
                "transformRules": {"selector": "article p:nth-of-type(3)", "op": op}
            }),
            Utc::now(),
        )
    }

    #[test]
    fn replace_is_eligible() {
        assert_eq!(ReadabilityMapper.can_deploy(&suggestion("s1", "replace")), Eligibility::eligible());
    }

    #[test]
    fn non_replace_op_is_rejected_and_dropped() {
        let s = suggestion("s1", "insertAfter");
        assert_eq!(
            ReadabilityMapper.can_deploy(&s).reason.as_deref(),
            Some(r#"transformRules.op must be "replace" for readability suggestions"#)
        );
        assert!(ReadabilityMapper
            .suggestions_to_patches("/guide", &[s], "opp-r", None)
            .is_empty());
    }

    #[test]
    fn rejection_order() {
        let mut s = suggestion("s1", "replace");
        s.data["url"] = json!("/relative");
        assert_eq!(
            ReadabilityMapper.can_deploy(&s).reason.as_deref(),
            Some("url must be a valid absolute URL")
        );

        s.data["improvedText"] = json!("  ");
        assert_eq!(
            ReadabilityMapper.can_deploy(&s).reason.as_deref(),
            Some("improvedText is required")
        );

        s.data["transformRules"] = json!({"op": "replace"});
        assert_eq!(
            ReadabilityMapper.can_deploy(&s).reason.as_deref(),
            Some("transformRules.selector is required")
        );
    }

    #[test]
    fn patch_carries_original_text_and_scrape_time() {
        let patches =
            ReadabilityMapper.suggestions_to_patches("/guide", &[suggestion("s1", "replace")], "opp-r", None);
        assert_eq!(patches.len(), 1);
        let patch = &patches[0];
        assert_eq!(patch.operation, PatchOperation::Replace);
        assert_eq!(patch.display_value(), "Use this method.");
        assert_eq!(
            patch.previous_value.as_deref(),
            Some("Utilize the aforementioned methodology.")
        );
        assert!(patch.prerender_required);
        assert_eq!(patch.last_updated, 1_709_294_400_000);
    }
}
