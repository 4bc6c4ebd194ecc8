//! Engine configuration and collaborators for the commands that do I/O.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use edgepatch_deploy::{
    EdgeDeployer, EngineConfig, HttpHtmlFetcher, HttpObjectStore, InMemoryObjectStore,
};

use crate::input;

/// Load the engine configuration from `path`, or from `EDGEPATCH_*`
/// variables when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            let config: EngineConfig = input::load(path)?;
            config
                .validate()
                .with_context(|| format!("invalid configuration in {}", path.display()))?;
            Ok(config)
        }
        None => EngineConfig::from_env().context("invalid EDGEPATCH_* configuration"),
    }
}

/// Deployer backed by the HTTP object store and HTML fetcher.
pub fn build_deployer(config: EngineConfig) -> Result<EdgeDeployer> {
    let store_url = config
        .store_url
        .clone()
        .context("storeUrl (EDGEPATCH_STORE_URL) is required for this command")?;
    let store = HttpObjectStore::new(&store_url, config.store_token.clone(), config.timeout_secs)?;
    let fetcher = HttpHtmlFetcher::new(config.timeout_secs)?;
    tracing::debug!(store_url = %store_url, bucket = %config.bucket, "using HTTP object store");
    Ok(EdgeDeployer::new(config, Arc::new(store), Arc::new(fetcher)))
}

/// Deployer for `check` and `generate`, which never touch storage or the
/// network.
pub fn offline_deployer(config: EngineConfig) -> Result<EdgeDeployer> {
    let fetcher = HttpHtmlFetcher::new(config.timeout_secs)?;
    Ok(EdgeDeployer::new(
        config,
        Arc::new(InMemoryObjectStore::new()),
        Arc::new(fetcher),
    ))
}
