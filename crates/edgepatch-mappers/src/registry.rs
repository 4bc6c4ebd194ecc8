//! # Mapper Registry
//!
//! Opportunity type to mapper lookup. Plain owned state: the deployer holds
//! one, tests build their own.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{
    FaqMapper, GenericMapper, HeadingsMapper, OpportunityMapper, ReadabilityMapper,
    SummarizationMapper, TocMapper,
};

#[derive(Clone, Default)]
pub struct MapperRegistry {
    mappers: BTreeMap<String, Arc<dyn OpportunityMapper>>,
}

impl std::fmt::Debug for MapperRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapperRegistry")
            .field("types", &self.list_supported_types())
            .finish()
    }
}

impl MapperRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in mapper.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(HeadingsMapper));
        registry.register(Arc::new(ReadabilityMapper));
        registry.register(Arc::new(FaqMapper));
        registry.register(Arc::new(SummarizationMapper));
        registry.register(Arc::new(TocMapper));
        registry.register(Arc::new(GenericMapper));
        registry
    }

    /// Register `mapper` under its opportunity type, returning the mapper
    /// it replaced.
    pub fn register(
        &mut self,
        mapper: Arc<dyn OpportunityMapper>,
    ) -> Option<Arc<dyn OpportunityMapper>> {
        let opportunity_type = mapper.opportunity_type().to_string();
        let previous = self.mappers.insert(opportunity_type.clone(), mapper);
        if previous.is_some() {
            tracing::debug!(%opportunity_type, "replaced registered mapper");
        }
        previous
    }

    pub fn get(&self, opportunity_type: &str) -> Option<Arc<dyn OpportunityMapper>> {
        self.mappers.get(opportunity_type).cloned()
    }

    pub fn is_supported(&self, opportunity_type: &str) -> bool {
        self.mappers.contains_key(opportunity_type)
    }

    /// Registered opportunity types, sorted.
    pub fn list_supported_types(&self) -> Vec<String> {
        self.mappers.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgepatch_core::{ConfigDocument, Eligibility, Patch, Suggestion};

    struct StubMapper;

    impl OpportunityMapper for StubMapper {
        fn opportunity_type(&self) -> &str {
            "headings"
        }
        fn requires_prerender(&self) -> bool {
            true
        }
        fn can_deploy(&self, _: &Suggestion) -> Eligibility {
            Eligibility::rejected("stub")
        }
        fn suggestions_to_patches(
            &self,
            _: &str,
            _: &[Suggestion],
            _: &str,
            _: Option<&ConfigDocument>,
        ) -> Vec<Patch> {
            Vec::new()
        }
    }

    #[test]
    fn defaults_cover_builtin_types() {
        let registry = MapperRegistry::with_defaults();
        assert_eq!(
            registry.list_supported_types(),
            vec![
                "content-summarization",
                "faq",
                "generic",
                "headings",
                "readability",
                "table-of-contents",
            ]
        );
        assert!(registry.get("broken-backlinks").is_none());
    }

    #[test]
    fn register_is_last_write_wins() {
        let mut registry = MapperRegistry::with_defaults();
        assert!(!registry.get("headings").unwrap().requires_prerender());

        let previous = registry.register(Arc::new(StubMapper));
        assert!(previous.is_some());
        assert!(registry.get("headings").unwrap().requires_prerender());
        assert_eq!(registry.list_supported_types().len(), 6);
    }

    #[test]
    fn empty_registry_supports_nothing() {
        let registry = MapperRegistry::new();
        assert!(registry.list_supported_types().is_empty());
        assert!(!registry.is_supported("faq"));
    }
}
