//! # Config Merge Engine
//!
//! Combines freshly generated patches with a previously persisted document
//! for the same URL.
//!
//! ## Algorithm
//!
//! 1. Start from the existing document's patch sequence (empty if none).
//! 2. A new patch with a [`MergeKey`] replaces the existing patch with the
//!    same key **in place**; otherwise it is appended.
//! 3. Structural patches (no suggestion id) are always appended.
//! 4. `prerenderRequired` is recomputed as the OR over all patches.
//! 5. `url` and `schemaVersion` come from the incoming document; `forceFail`
//!    is kept from the existing document unless overridden.
//!
//! ## Invariants
//!
//! - Idempotence: for keyed patch sets, `merge(merge(D, P), P) == merge(D, P)`.
//! - Order preservation: replacement never moves a patch; appends go last.

use std::collections::{HashMap, HashSet};

use crate::document::ConfigDocument;
use crate::patch::{MergeKey, Patch};

/// Merge `incoming` onto `existing`.
///
/// `force_fail` overrides the kill switch; `None` keeps the existing value
/// (or the incoming one when there is no existing document).
pub fn merge_documents(
    existing: Option<&ConfigDocument>,
    incoming: ConfigDocument,
    force_fail: Option<bool>,
) -> ConfigDocument {
    let mut patches: Vec<Patch> = existing.map(|d| d.patches.clone()).unwrap_or_default();

    let mut index: HashMap<MergeKey, usize> = patches
        .iter()
        .enumerate()
        .filter_map(|(i, p)| p.merge_key().map(|k| (k, i)))
        .collect();

    for patch in incoming.patches {
        match patch.merge_key() {
            Some(key) => match index.get(&key) {
                Some(&pos) => patches[pos] = patch,
                None => {
                    index.insert(key, patches.len());
                    patches.push(patch);
                }
            },
            None => patches.push(patch),
        }
    }

    let force_fail = force_fail
        .or_else(|| existing.map(|d| d.force_fail))
        .unwrap_or(incoming.force_fail);

    let mut merged = ConfigDocument {
        url: incoming.url,
        schema_version: incoming.schema_version,
        force_fail,
        prerender_required: false,
        patches,
    };
    merged.recompute_prerender();
    merged
}

/// Remove every patch of `opportunity_id` whose suggestion id is in
/// `suggestion_ids`. Returns the number of patches removed and recomputes
/// the prerender flag.
pub fn remove_patches<S: AsRef<str>>(
    document: &mut ConfigDocument,
    opportunity_id: &str,
    suggestion_ids: &[S],
) -> usize {
    let targets: HashSet<MergeKey> = suggestion_ids
        .iter()
        .map(|sid| MergeKey::new(opportunity_id, sid.as_ref()))
        .collect();

    let before = document.patches.len();
    document
        .patches
        .retain(|p| p.merge_key().map_or(true, |k| !targets.contains(&k)));
    let removed = before - document.patches.len();
    document.recompute_prerender();
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::PatchOperation;

    const URL: &str = "https://example.com/page";

    fn keyed(opp: &str, sugg: &str, value: &str) -> Patch {
        Patch::text(PatchOperation::Replace, "h1", value, 1)
            .unwrap()
            .with_provenance(opp, Some(sugg.to_string()))
    }

    fn doc(patches: Vec<Patch>) -> ConfigDocument {
        ConfigDocument::new(URL, "1.0", patches)
    }

    #[test]
    fn replaces_in_place_and_appends_new() {
        let existing = doc(vec![keyed("opp-1", "sugg-1", "old"), keyed("opp-1", "sugg-9", "keep")]);
        let incoming = doc(vec![keyed("opp-1", "sugg-2", "new-2"), keyed("opp-1", "sugg-1", "new-1")]);

        let merged = merge_documents(Some(&existing), incoming, None);
        let values: Vec<_> = merged.patches.iter().map(|p| p.display_value()).collect();
        assert_eq!(values, vec!["new-1", "keep", "new-2"]);
    }

    #[test]
    fn same_suggestion_id_under_other_opportunity_is_distinct() {
        let existing = doc(vec![keyed("opp-1", "s", "a")]);
        let merged = merge_documents(Some(&existing), doc(vec![keyed("opp-2", "s", "b")]), None);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn structural_patches_always_append() {
        let heading = Patch::text(PatchOperation::AppendChild, "main", "FAQs", 1)
            .unwrap()
            .with_provenance("opp-1", None);
        let existing = doc(vec![heading.clone()]);
        let merged = merge_documents(Some(&existing), doc(vec![heading]), None);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn force_fail_is_preserved_unless_overridden() {
        let mut existing = doc(vec![]);
        existing.force_fail = true;

        let kept = merge_documents(Some(&existing), doc(vec![]), None);
        assert!(kept.force_fail);

        let cleared = merge_documents(Some(&existing), doc(vec![]), Some(false));
        assert!(!cleared.force_fail);
    }

    #[test]
    fn url_and_schema_come_from_incoming() {
        let mut existing = doc(vec![]);
        existing.schema_version = "0.9".into();
        let mut incoming = doc(vec![]);
        incoming.schema_version = "1.0".into();
        let merged = merge_documents(Some(&existing), incoming, None);
        assert_eq!(merged.schema_version, "1.0");
        assert_eq!(merged.url, URL);
    }

    #[test]
    fn prerender_is_recomputed_over_all_patches() {
        let existing = doc(vec![keyed("opp-1", "s1", "a").with_prerender(true)]);
        let merged = merge_documents(Some(&existing), doc(vec![keyed("opp-1", "s1", "b")]), None);
        assert!(!merged.prerender_required);
    }

    #[test]
    fn remove_patches_counts_only_matches() {
        let heading = Patch::text(PatchOperation::AppendChild, "main", "FAQs", 1)
            .unwrap()
            .with_provenance("opp-1", None);
        let mut d = doc(vec![heading, keyed("opp-1", "s1", "a"), keyed("opp-1", "s2", "b")]);

        assert_eq!(remove_patches(&mut d, "opp-1", &["s1", "missing"]), 1);
        assert_eq!(d.len(), 2);
        assert_eq!(remove_patches(&mut d, "opp-1", &["s1"]), 0);
        assert_eq!(remove_patches(&mut d, "opp-2", &["s2"]), 0);
    }
}
