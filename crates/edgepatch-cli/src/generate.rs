//! `edgepatch generate`: print the configuration document a batch would
//! produce for one URL, ignoring anything already deployed.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use edgepatch_deploy::EdgeDeployer;

use crate::input::{load_opportunity, load_suggestions};

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Page URL the document is for.
    #[arg(long)]
    pub url: String,

    #[arg(long)]
    pub opportunity: PathBuf,

    #[arg(long)]
    pub suggestions: PathBuf,
}

/// Execute the generate subcommand.
pub fn run_generate(args: &GenerateArgs, deployer: &EdgeDeployer) -> Result<u8> {
    let opportunity = load_opportunity(&args.opportunity)?;
    let suggestions = load_suggestions(&args.suggestions)?;

    let document = deployer
        .generate_config(&args.url, &opportunity, &suggestions)
        .with_context(|| {
            format!(
                "unsupported opportunity type '{}'; supported: {}",
                opportunity.opportunity_type,
                deployer.mappers().list_supported_types().join(", ")
            )
        })?;

    tracing::info!(url = %args.url, patches = document.len(), "generated configuration");
    crate::print_json(&document)?;
    Ok(0)
}
