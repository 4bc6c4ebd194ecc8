//! # CDN Client Registry
//!
//! Provider id to client factory. Factories take the merged provider
//! configuration (engine defaults overlaid with the site's overrides) and
//! build a client for one deployment.

use std::collections::BTreeMap;
use std::sync::Arc;

use edgepatch_core::CdnProviderConfig;

use crate::client::CdnClient;
use crate::error::CdnError;
use crate::{cloudflare, fastly, CloudflareClient, FastlyClient};

/// Builds a client from provider configuration.
pub type CdnClientFactory =
    Arc<dyn Fn(&CdnProviderConfig) -> Result<Arc<dyn CdnClient>, CdnError> + Send + Sync>;

#[derive(Clone, Default)]
pub struct CdnClientRegistry {
    factories: BTreeMap<String, CdnClientFactory>,
}

impl std::fmt::Debug for CdnClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdnClientRegistry")
            .field("providers", &self.providers())
            .finish()
    }
}

impl CdnClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in Cloudflare and Fastly clients.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(cloudflare::PROVIDER, |config| {
            Ok(Arc::new(CloudflareClient::new(config.clone())?) as Arc<dyn CdnClient>)
        });
        registry.register(fastly::PROVIDER, |config| {
            Ok(Arc::new(FastlyClient::new(config.clone())?) as Arc<dyn CdnClient>)
        });
        registry
    }

    /// Register a factory; a later registration for the same id wins.
    pub fn register<F>(&mut self, provider_id: impl Into<String>, factory: F)
    where
        F: Fn(&CdnProviderConfig) -> Result<Arc<dyn CdnClient>, CdnError> + Send + Sync + 'static,
    {
        self.factories.insert(provider_id.into(), Arc::new(factory));
    }

    pub fn is_supported(&self, provider_id: &str) -> bool {
        self.factories.contains_key(provider_id)
    }

    /// Registered provider ids, sorted.
    pub fn providers(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Build a client, distinguishing an unknown provider from a client
    /// that could not be constructed.
    pub fn build(
        &self,
        provider_id: &str,
        config: &CdnProviderConfig,
    ) -> Result<Arc<dyn CdnClient>, CdnError> {
        let factory = self
            .factories
            .get(provider_id)
            .ok_or_else(|| CdnError::UnsupportedProvider(provider_id.to_string()))?;
        factory(config)
    }

    /// Build a client, or `None` when the provider is unknown or its client
    /// cannot be constructed.
    pub fn get(&self, provider_id: &str, config: &CdnProviderConfig) -> Option<Arc<dyn CdnClient>> {
        match self.build(provider_id, config) {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::error!(provider = provider_id, "cannot build CDN client: {e}");
                None
            }
        }
    }
}
