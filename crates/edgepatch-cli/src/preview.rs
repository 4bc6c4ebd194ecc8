//! `edgepatch preview`: deploy to the preview bucket and compare the page
//! before and after. Ctrl-C cancels the comparison loop.

use anyhow::Result;
use clap::Args;
use tokio_util::sync::CancellationToken;

use edgepatch_deploy::{EdgeDeployer, PreviewOptions};

use crate::deploy::BatchArgs;
use crate::input::{load_opportunity, load_site, load_suggestions};

#[derive(Args, Debug)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub batch: BatchArgs,

    /// Wait before the first optimized fetch.
    #[arg(long)]
    pub warmup_ms: Option<u64>,

    /// Extra optimized fetches while the HTML is unchanged.
    #[arg(long)]
    pub max_retries: Option<u32>,

    #[arg(long)]
    pub retry_delay_ms: Option<u64>,
}

impl PreviewArgs {
    /// Command-line overrides applied on top of the configured options.
    pub fn options(&self, configured: PreviewOptions) -> PreviewOptions {
        PreviewOptions {
            warmup_delay_ms: self.warmup_ms.unwrap_or(configured.warmup_delay_ms),
            max_retries: self.max_retries.unwrap_or(configured.max_retries),
            retry_delay_ms: self.retry_delay_ms.unwrap_or(configured.retry_delay_ms),
        }
    }
}

/// Execute the preview subcommand.
pub async fn run_preview(args: &PreviewArgs, deployer: &EdgeDeployer) -> Result<u8> {
    let site = load_site(&args.batch.site)?;
    let opportunity = load_opportunity(&args.batch.opportunity)?;
    let suggestions = load_suggestions(&args.batch.suggestions)?;
    let options = args.options(deployer.config().preview);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling preview");
            on_interrupt.cancel();
        }
    });

    let outcome = deployer
        .preview_suggestions(&site, &opportunity, &suggestions, Some(options), &cancel)
        .await;
    watcher.abort();
    let result = outcome?;

    crate::print_json(&result)?;
    Ok(crate::exit_code(
        result.outcome.has_failures() || result.html_error.is_some(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_configured_options() {
        let args = PreviewArgs {
            batch: BatchArgs {
                site: "site.json".into(),
                opportunity: "opp.json".into(),
                suggestions: "s.json".into(),
            },
            warmup_ms: Some(0),
            max_retries: None,
            retry_delay_ms: Some(250),
        };
        let options = args.options(PreviewOptions::default());
        assert_eq!(options.warmup_delay_ms, 0);
        assert_eq!(options.max_retries, 3);
        assert_eq!(options.retry_delay_ms, 250);
    }
}
