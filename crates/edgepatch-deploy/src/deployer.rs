//! # Edge Deployer
//!
//! Generate, deploy and roll back. Preview lives in [`crate::preview`] and
//! shares the helpers defined here.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use url::Url;

use edgepatch_cdn::{CdnClient, CdnClientRegistry, InvalidationResult};
use edgepatch_core::key::parse_page_url;
use edgepatch_core::{
    merge_documents, ConfigDocument, ConfigKey, DomainConfig, Eligibility, Opportunity, Site,
    Suggestion,
};
use edgepatch_mappers::{MapperRegistry, OpportunityMapper};

use crate::config::EngineConfig;
use crate::error::{DeployError, StorageError};
use crate::html::HtmlFetcher;
use crate::result::{DeploymentResult, RollbackResult};
use crate::sleep::{Sleeper, TokioSleeper};
use crate::store::{storage_path, ObjectStore};

pub(crate) const NO_URL_REASON: &str = "suggestion has no resolvable url";
pub(crate) const NO_PATCH_REASON: &str = "no patch was generated for suggestion";
pub(crate) const FOREIGN_HOST_REASON: &str = "suggestion url is not on the site's host";

/// A configured CDN provider for one site. `client` is `None` when the
/// provider's configuration is incomplete.
pub(crate) struct CdnTarget {
    pub(crate) provider: String,
    pub(crate) client: Option<Arc<dyn CdnClient>>,
}

/// Suggestions that resolve to the same page.
pub(crate) struct UrlGroup {
    pub(crate) url: Url,
    pub(crate) key: ConfigKey,
    pub(crate) suggestions: Vec<Suggestion>,
}

/// The deployment engine.
///
/// Registries are owned state: register custom mappers or CDN providers
/// through [`mappers_mut`](Self::mappers_mut) and
/// [`cdn_registry_mut`](Self::cdn_registry_mut) before serving traffic.
pub struct EdgeDeployer {
    pub(crate) mappers: MapperRegistry,
    pub(crate) cdn: CdnClientRegistry,
    pub(crate) store: Arc<dyn ObjectStore>,
    pub(crate) fetcher: Arc<dyn HtmlFetcher>,
    pub(crate) sleeper: Arc<dyn Sleeper>,
    pub(crate) config: EngineConfig,
}

impl std::fmt::Debug for EdgeDeployer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeDeployer")
            .field("mappers", &self.mappers)
            .field("cdn", &self.cdn)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl EdgeDeployer {
    /// Engine with the built-in mappers and CDN providers.
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn ObjectStore>,
        fetcher: Arc<dyn HtmlFetcher>,
    ) -> Self {
        Self {
            mappers: MapperRegistry::with_defaults(),
            cdn: CdnClientRegistry::with_defaults(),
            store,
            fetcher,
            sleeper: Arc::new(TokioSleeper),
            config,
        }
    }

    pub fn with_mappers(mut self, mappers: MapperRegistry) -> Self {
        self.mappers = mappers;
        self
    }

    pub fn with_cdn_registry(mut self, cdn: CdnClientRegistry) -> Self {
        self.cdn = cdn;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn mappers(&self) -> &MapperRegistry {
        &self.mappers
    }

    pub fn mappers_mut(&mut self) -> &mut MapperRegistry {
        &mut self.mappers
    }

    pub fn cdn_registry_mut(&mut self) -> &mut CdnClientRegistry {
        &mut self.cdn
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build a fresh document for `url` from `suggestions`, ignoring any
    /// stored state. `None` when the opportunity type has no mapper.
    pub fn generate_config(
        &self,
        url: &str,
        opportunity: &Opportunity,
        suggestions: &[Suggestion],
    ) -> Option<ConfigDocument> {
        let mapper = self.mappers.get(&opportunity.opportunity_type)?;
        let path = Url::parse(url)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| url.to_string());
        let patches = mapper.suggestions_to_patches(&path, suggestions, &opportunity.id, None);
        Some(ConfigDocument::new(url, self.config.schema_version.as_str(), patches))
    }

    /// Eligibility verdict per suggestion, without any I/O.
    pub fn check_eligibility(
        &self,
        opportunity: &Opportunity,
        suggestions: &[Suggestion],
    ) -> Result<Vec<(String, Eligibility)>, DeployError> {
        let mapper = self.mapper(opportunity)?;
        Ok(suggestions
            .iter()
            .map(|s| (s.id.clone(), mapper.can_deploy(s)))
            .collect())
    }

    /// Merge the suggestions' patches into the production documents,
    /// persist them and invalidate the CDN.
    ///
    /// # Errors
    ///
    /// Input errors are returned before any I/O. A storage failure aborts
    /// the remaining URLs; documents already written stay written.
    pub async fn deploy_suggestions(
        &self,
        site: &Site,
        opportunity: &Opportunity,
        suggestions: &[Suggestion],
    ) -> Result<DeploymentResult, DeployError> {
        let mapper = self.mapper(opportunity)?;
        let targets = self.cdn_targets(site)?;
        let mut result = DeploymentResult::default();

        let eligible = admit_eligible(mapper.as_ref(), suggestions, &mut result);
        let groups = group_by_url(site, eligible, &mut result);
        if groups.is_empty() {
            tracing::info!(
                site_id = %site.id,
                opportunity_id = %opportunity.id,
                failed = result.failed_suggestions.len(),
                "nothing to deploy"
            );
            return Ok(result);
        }

        let domain = self.load_domain_config(site).await?;
        let mut cdn_paths = Vec::with_capacity(groups.len());
        for group in &groups {
            let existing = self.load_document(&self.config.bucket, &group.key).await?;
            let Some((document, deployed)) = self.build_document(
                mapper.as_ref(),
                opportunity,
                group,
                existing.as_ref(),
                domain.as_ref(),
                &mut result,
            ) else {
                continue;
            };
            let path = self.persist(&self.config.bucket, &group.key, &document).await?;
            tracing::info!(
                url = %group.url,
                path = %path,
                patches = document.len(),
                "deployed edge configuration"
            );
            result.storage_paths.push(path);
            cdn_paths.push(group.key.cdn_path());
            result.succeeded_suggestions.extend(deployed);
        }

        result.cdn_invalidations = self.invalidate(&targets, &cdn_paths).await;
        Ok(result)
    }

    /// Remove the suggestions' patches from their documents, persist the
    /// reduced documents and invalidate the CDN.
    ///
    /// Suggestions whose patch is already gone still succeed. A document
    /// left empty is written as an empty document, with `forceFail` cleared.
    pub async fn rollback_suggestions(
        &self,
        site: &Site,
        opportunity: &Opportunity,
        suggestions: &[Suggestion],
    ) -> Result<RollbackResult, DeployError> {
        let mapper = self.mapper(opportunity)?;
        let targets = self.cdn_targets(site)?;
        let mut rollback = RollbackResult::default();

        let groups = group_by_url(site, suggestions.iter(), &mut rollback.outcome);
        if groups.is_empty() {
            return Ok(rollback);
        }

        let domain = self.load_domain_config(site).await?;
        let mut cdn_paths = Vec::with_capacity(groups.len());
        for group in groups {
            let Some(mut document) = self.load_document(&self.config.bucket, &group.key).await?
            else {
                tracing::debug!(url = %group.url, "no deployed document, nothing to roll back");
                rollback.outcome.succeeded_suggestions.extend(group.suggestions);
                continue;
            };

            let ids: Vec<String> = group.suggestions.iter().map(|s| s.id.clone()).collect();
            let removed = mapper.rollback_patches(&mut document, &opportunity.id, &ids);
            if document.is_empty() {
                document.force_fail = false;
            }
            apply_domain_policy(&mut document, domain.as_ref());

            let path = self.persist(&self.config.bucket, &group.key, &document).await?;
            tracing::info!(
                url = %group.url,
                path = %path,
                removed,
                remaining = document.len(),
                "rolled back edge configuration"
            );
            rollback.removed_patches_count += removed;
            rollback.outcome.storage_paths.push(path);
            rollback.outcome.succeeded_suggestions.extend(group.suggestions);
            cdn_paths.push(group.key.cdn_path());
        }

        rollback.outcome.cdn_invalidations = self.invalidate(&targets, &cdn_paths).await;
        Ok(rollback)
    }

    pub(crate) fn mapper(
        &self,
        opportunity: &Opportunity,
    ) -> Result<Arc<dyn OpportunityMapper>, DeployError> {
        self.mappers
            .get(&opportunity.opportunity_type)
            .ok_or_else(|| DeployError::UnsupportedOpportunity(opportunity.opportunity_type.clone()))
    }

    /// Build a client for every provider the site uses. Unknown providers
    /// are an input error; incomplete configuration only skips the group.
    pub(crate) fn cdn_targets(&self, site: &Site) -> Result<Vec<CdnTarget>, DeployError> {
        self.config
            .providers_for(site)
            .iter()
            .map(|provider| {
                let config = self.config.provider_config(provider, site);
                let client = self.cdn.build(provider, &config).map_err(|source| {
                    DeployError::InvalidCdnConfig {
                        provider: provider.clone(),
                        source,
                    }
                })?;
                let client = if client.validate_config() {
                    Some(client)
                } else {
                    tracing::warn!(
                        provider = %provider,
                        site_id = %site.id,
                        "CDN provider is misconfigured, invalidation will be skipped"
                    );
                    None
                };
                Ok(CdnTarget {
                    provider: provider.clone(),
                    client,
                })
            })
            .collect()
    }

    /// Generate patches for one group and merge them onto `existing`.
    ///
    /// Suggestions the mapper produced no patch for are recorded as failed.
    /// Returns `None` when nothing in the group produced a patch.
    pub(crate) fn build_document(
        &self,
        mapper: &dyn OpportunityMapper,
        opportunity: &Opportunity,
        group: &UrlGroup,
        existing: Option<&ConfigDocument>,
        domain: Option<&DomainConfig>,
        result: &mut DeploymentResult,
    ) -> Option<(ConfigDocument, Vec<Suggestion>)> {
        let patches = mapper.suggestions_to_patches(
            group.url.path(),
            &group.suggestions,
            &opportunity.id,
            existing,
        );
        let produced: HashSet<&str> = patches
            .iter()
            .filter_map(|p| p.suggestion_id.as_deref())
            .collect();

        let mut deployed = Vec::with_capacity(group.suggestions.len());
        for suggestion in &group.suggestions {
            if produced.contains(suggestion.id.as_str()) {
                deployed.push(suggestion.clone());
            } else {
                result.fail(suggestion, NO_PATCH_REASON);
            }
        }
        if deployed.is_empty() {
            return None;
        }

        let incoming = ConfigDocument::new(
            group.url.as_str(),
            self.config.schema_version.as_str(),
            patches,
        );
        let mut merged = merge_documents(existing, incoming, None);
        apply_domain_policy(&mut merged, domain);
        Some((merged, deployed))
    }

    pub(crate) async fn load_document(
        &self,
        bucket: &str,
        key: &ConfigKey,
    ) -> Result<Option<ConfigDocument>, DeployError> {
        let Some(bytes) = self.store.get(bucket, key.as_str()).await? else {
            return Ok(None);
        };
        ConfigDocument::from_json(&bytes)
            .map(Some)
            .map_err(|source| {
                StorageError::Corrupt {
                    path: storage_path(bucket, key.as_str()),
                    source,
                }
                .into()
            })
    }

    pub(crate) async fn load_domain_config(
        &self,
        site: &Site,
    ) -> Result<Option<DomainConfig>, DeployError> {
        let key = ConfigKey::domain_config(site.host());
        let Some(bytes) = self.store.get(&self.config.bucket, &key).await? else {
            return Ok(None);
        };
        DomainConfig::from_json(&bytes).map(Some).map_err(|source| {
            StorageError::Corrupt {
                path: storage_path(&self.config.bucket, &key),
                source,
            }
            .into()
        })
    }

    pub(crate) async fn persist(
        &self,
        bucket: &str,
        key: &ConfigKey,
        document: &ConfigDocument,
    ) -> Result<String, DeployError> {
        let body = document.to_json()?;
        Ok(self.store.put(bucket, key.as_str(), body).await?)
    }

    /// Invalidate `paths` through every target concurrently and wait for
    /// all of them. One entry per target, in target order.
    pub(crate) async fn invalidate(
        &self,
        targets: &[CdnTarget],
        paths: &[String],
    ) -> Vec<Option<InvalidationResult>> {
        if paths.is_empty() {
            return Vec::new();
        }
        let calls = targets.iter().map(|target| async move {
            let Some(client) = target.client.as_ref() else {
                return None;
            };
            match client.invalidate_cache(paths).await {
                Ok(outcome) => {
                    tracing::info!(
                        provider = %target.provider,
                        status = %outcome.status,
                        tracking_id = outcome.tracking_id.as_deref().unwrap_or_default(),
                        "CDN invalidation complete"
                    );
                    Some(outcome)
                }
                Err(e) => {
                    tracing::error!(provider = %target.provider, "CDN invalidation failed: {e}");
                    Some(InvalidationResult::failed(
                        target.provider.as_str(),
                        paths.to_vec(),
                        &e,
                    ))
                }
            }
        });
        join_all(calls).await
    }
}

/// Target URL of a suggestion: `data.url` when absolute, else
/// `data.path`, `data.urlPath` or a relative `data.url` joined onto the site
/// base URL. `None` when nothing resolves or the URL is on another host.
pub fn resolve_url(site: &Site, suggestion: &Suggestion) -> Option<Url> {
    locate(site, suggestion).filter(|url| on_site(site, url))
}

/// Whether `url` lives on the site's host. Documents are keyed by host, so
/// any other host would write outside the site's namespace.
fn on_site(site: &Site, url: &Url) -> bool {
    url.host_str().is_some() && url.host_str() == site.base_url.host_str()
}

fn locate(site: &Site, suggestion: &Suggestion) -> Option<Url> {
    let raw_url = suggestion.data_str("url");
    if let Some(url) = raw_url.and_then(|raw| parse_page_url(raw).ok()) {
        return Some(url);
    }
    let path = suggestion
        .data_str("path")
        .or_else(|| suggestion.data_str("urlPath"))
        .or(raw_url)?;
    site.base_url
        .join(path)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
}

/// Split off ineligible suggestions into `result`, returning the rest.
pub(crate) fn admit_eligible<'a>(
    mapper: &dyn OpportunityMapper,
    suggestions: &'a [Suggestion],
    result: &mut DeploymentResult,
) -> Vec<&'a Suggestion> {
    let mut eligible = Vec::with_capacity(suggestions.len());
    for suggestion in suggestions {
        let verdict = mapper.can_deploy(suggestion);
        if verdict.eligible {
            eligible.push(suggestion);
        } else {
            tracing::warn!(
                suggestion_id = %suggestion.id,
                reason = verdict.reason.as_deref().unwrap_or_default(),
                "suggestion is not deployable"
            );
            result.fail(suggestion, verdict.reason_or_default());
        }
    }
    eligible
}

/// Group suggestions by target URL in first-seen order. Suggestions
/// without a usable URL are recorded as failed.
pub(crate) fn group_by_url<'a, I>(
    site: &Site,
    suggestions: I,
    result: &mut DeploymentResult,
) -> Vec<UrlGroup>
where
    I: IntoIterator<Item = &'a Suggestion>,
{
    let mut groups: Vec<UrlGroup> = Vec::new();
    for suggestion in suggestions {
        let resolved = locate(site, suggestion)
            .and_then(|url| ConfigKey::for_url(&url).ok().map(|key| (url, key)));
        let Some((url, key)) = resolved else {
            result.fail(suggestion, NO_URL_REASON);
            continue;
        };
        if !on_site(site, &url) {
            tracing::warn!(
                suggestion_id = %suggestion.id,
                url = %url,
                site_id = %site.id,
                "suggestion targets another host"
            );
            result.fail(suggestion, FOREIGN_HOST_REASON);
            continue;
        }
        match groups.iter_mut().find(|g| g.key == key) {
            Some(group) => group.suggestions.push(suggestion.clone()),
            None => groups.push(UrlGroup {
                url,
                key,
                suggestions: vec![suggestion.clone()],
            }),
        }
    }
    groups
}

/// Force prerendering when the domain requires it.
pub(crate) fn apply_domain_policy(document: &mut ConfigDocument, domain: Option<&DomainConfig>) {
    if domain.is_some_and(|d| d.prerender_required) {
        document.prerender_required = true;
    }
}
