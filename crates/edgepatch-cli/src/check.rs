//! `edgepatch check`: report which suggestions are deployable without
//! touching storage or the CDN.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use edgepatch_deploy::EdgeDeployer;

use crate::input::{load_opportunity, load_suggestions};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Opportunity file (JSON or YAML).
    #[arg(long)]
    pub opportunity: PathBuf,

    /// Suggestions file: a list or a single suggestion.
    #[arg(long)]
    pub suggestions: PathBuf,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Verdict {
    suggestion_id: String,
    eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

/// Execute the check subcommand.
pub fn run_check(args: &CheckArgs, deployer: &EdgeDeployer) -> Result<u8> {
    let opportunity = load_opportunity(&args.opportunity)?;
    let suggestions = load_suggestions(&args.suggestions)?;

    let verdicts: Vec<Verdict> = deployer
        .check_eligibility(&opportunity, &suggestions)?
        .into_iter()
        .map(|(suggestion_id, e)| Verdict {
            suggestion_id,
            eligible: e.eligible,
            reason: e.reason,
        })
        .collect();

    let rejected = verdicts.iter().filter(|v| !v.eligible).count();
    tracing::info!(
        opportunity_id = %opportunity.id,
        total = verdicts.len(),
        rejected,
        "eligibility check finished"
    );
    crate::print_json(&verdicts)?;
    Ok(crate::exit_code(rejected > 0))
}
