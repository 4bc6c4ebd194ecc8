//! `edgepatch deploy` and `edgepatch rollback`.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use edgepatch_deploy::EdgeDeployer;

use crate::input::{load_opportunity, load_site, load_suggestions};

/// Inputs shared by deploy, rollback and preview.
#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// Site file with the base URL and edge settings.
    #[arg(long)]
    pub site: PathBuf,

    #[arg(long)]
    pub opportunity: PathBuf,

    #[arg(long)]
    pub suggestions: PathBuf,
}

/// Execute the deploy subcommand.
pub async fn run_deploy(args: &BatchArgs, deployer: &EdgeDeployer) -> Result<u8> {
    let site = load_site(&args.site)?;
    let opportunity = load_opportunity(&args.opportunity)?;
    let suggestions = load_suggestions(&args.suggestions)?;

    let result = deployer
        .deploy_suggestions(&site, &opportunity, &suggestions)
        .await?;
    tracing::info!(
        site_id = %site.id,
        succeeded = result.succeeded_suggestions.len(),
        failed = result.failed_suggestions.len(),
        documents = result.storage_paths.len(),
        "deploy finished"
    );
    crate::print_json(&result)?;
    Ok(crate::exit_code(result.has_failures()))
}

/// Execute the rollback subcommand.
pub async fn run_rollback(args: &BatchArgs, deployer: &EdgeDeployer) -> Result<u8> {
    let site = load_site(&args.site)?;
    let opportunity = load_opportunity(&args.opportunity)?;
    let suggestions = load_suggestions(&args.suggestions)?;

    let result = deployer
        .rollback_suggestions(&site, &opportunity, &suggestions)
        .await?;
    tracing::info!(
        site_id = %site.id,
        removed = result.removed_patches_count,
        "rollback finished"
    );
    crate::print_json(&result)?;
    Ok(crate::exit_code(result.outcome.has_failures()))
}
