//! # Preview
//!
//! Deploys a batch to the preview bucket and compares the page before and
//! after. The CDN edge may take a while to pick up the preview document,
//! so the optimized fetch is retried while it still matches the original:
//!
//! ```text
//! fetch original ─▶ sleep(warmup) ─▶ fetch optimized ─┬─▶ differs: done
//!                                                     └─▶ same: sleep(retry_delay), refetch (≤ max_retries)
//! ```
//!
//! HTML that never changes is a normal outcome. Every wait and fetch races
//! the caller's [`CancellationToken`]; cancelling drops the in-flight future
//! and returns [`DeployError::Cancelled`].

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use url::Url;

use edgepatch_core::{ConfigKey, Opportunity, Site, Suggestion};

use crate::deployer::{admit_eligible, group_by_url, resolve_url, EdgeDeployer};
use crate::error::{DeployError, FetchError};
use crate::html::FetchMode;
use crate::result::{PreviewHtml, PreviewResult};

/// Timing of the preview comparison loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreviewOptions {
    /// Wait before the first optimized fetch.
    pub warmup_delay_ms: u64,
    /// Extra optimized fetches while the HTML is unchanged.
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            warmup_delay_ms: 2000,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl EdgeDeployer {
    /// Preview a single-URL batch.
    ///
    /// `options` falls back to the engine's configured preview options.
    ///
    /// # Errors
    ///
    /// An empty batch, a site with preview disabled, or a batch spanning
    /// several URLs is rejected before any I/O. Storage failures propagate.
    /// Fetch failures are reported in [`PreviewResult::html_error`].
    pub async fn preview_suggestions(
        &self,
        site: &Site,
        opportunity: &Opportunity,
        suggestions: &[Suggestion],
        options: Option<PreviewOptions>,
        cancel: &CancellationToken,
    ) -> Result<PreviewResult, DeployError> {
        if suggestions.is_empty() {
            return Err(DeployError::EmptyPreviewBatch);
        }
        self.config.validate()?;
        if !site.edge.preview_enabled {
            return Err(DeployError::PreviewDisabled {
                site_id: site.id.clone(),
            });
        }
        let mapper = self.mapper(opportunity)?;
        let targets = self.cdn_targets(site)?;

        let mut urls: Vec<String> = suggestions
            .iter()
            .filter_map(|s| resolve_url(site, s))
            .filter_map(|u| ConfigKey::for_url(&u).ok().map(|_| u.to_string()))
            .collect();
        urls.sort();
        urls.dedup();
        if urls.len() > 1 {
            return Err(DeployError::MixedPreviewUrls(urls));
        }

        let options = options.unwrap_or(self.config.preview);
        let mut preview = PreviewResult::default();
        let eligible = admit_eligible(mapper.as_ref(), suggestions, &mut preview.outcome);
        let Some(group) = group_by_url(site, eligible, &mut preview.outcome).pop() else {
            return Ok(preview);
        };

        let domain = self.load_domain_config(site).await?;
        let production = self.load_document(&self.config.bucket, &group.key).await?;
        let Some((document, deployed)) = self.build_document(
            mapper.as_ref(),
            opportunity,
            &group,
            production.as_ref(),
            domain.as_ref(),
            &mut preview.outcome,
        ) else {
            return Ok(preview);
        };

        let path = self
            .persist(&self.config.preview_bucket, &group.key, &document)
            .await?;
        tracing::info!(url = %group.url, path = %path, "wrote preview configuration");
        preview.outcome.storage_paths.push(path);
        preview.outcome.succeeded_suggestions.extend(deployed);
        preview.outcome.cdn_invalidations = self
            .invalidate(&targets, &[group.key.preview_cdn_path()])
            .await;

        match self.snapshot(&group.url, &group.key, options, cancel).await? {
            Ok(html) => {
                tracing::info!(
                    url = %html.url,
                    changed = html.changed,
                    attempts = html.attempts,
                    "preview comparison finished"
                );
                preview.html = Some(html);
            }
            Err(e) => {
                tracing::error!(url = %group.url, "preview fetch failed: {e}");
                preview.html_error = Some(e.to_string());
            }
        }
        Ok(preview)
    }

    /// Fetch the original and optimized HTML. The outer error is
    /// cancellation; the inner one a failed fetch.
    async fn snapshot(
        &self,
        url: &Url,
        key: &ConfigKey,
        options: PreviewOptions,
        cancel: &CancellationToken,
    ) -> Result<Result<PreviewHtml, FetchError>, DeployError> {
        let original = match until_cancelled(cancel, self.fetcher.fetch(url, &FetchMode::Original)).await? {
            Ok(html) => html,
            Err(e) => return Ok(Err(e)),
        };

        self.pause(options.warmup_delay_ms, cancel).await?;

        let mode = FetchMode::Preview {
            key: key.as_str().to_string(),
        };
        let mut attempts: u32 = 0;
        let optimized = loop {
            attempts += 1;
            let html = match until_cancelled(cancel, self.fetcher.fetch(url, &mode)).await? {
                Ok(html) => html,
                Err(e) => return Ok(Err(e)),
            };
            if html != original || attempts > options.max_retries {
                break html;
            }
            tracing::debug!(url = %url, attempt = attempts, "preview HTML unchanged, retrying");
            self.pause(options.retry_delay_ms, cancel).await?;
        };

        let changed = optimized != original;
        Ok(Ok(PreviewHtml {
            url: url.to_string(),
            original_html: original,
            optimized_html: optimized,
            changed,
            attempts,
        }))
    }

    async fn pause(&self, millis: u64, cancel: &CancellationToken) -> Result<(), DeployError> {
        if millis == 0 {
            return Ok(());
        }
        until_cancelled(cancel, self.sleeper.sleep(Duration::from_millis(millis))).await
    }
}

async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, DeployError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DeployError::Cancelled),
        out = fut => Ok(out),
    }
}
