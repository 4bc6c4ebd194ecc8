//! # edgepatch CLI entry point
//!
//! Parses command-line arguments, initializes logging and dispatches to
//! subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use edgepatch_cli::check::{run_check, CheckArgs};
use edgepatch_cli::deploy::{run_deploy, run_rollback, BatchArgs};
use edgepatch_cli::generate::{run_generate, GenerateArgs};
use edgepatch_cli::preview::{run_preview, PreviewArgs};
use edgepatch_cli::settings::{build_deployer, load_config, offline_deployer};

/// Edge-patch configuration engine.
///
/// Turns content suggestions into per-URL edge configuration documents,
/// stores them and invalidates the CDN.
#[derive(Parser, Debug)]
#[command(name = "edgepatch", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Engine configuration file (YAML or JSON). Defaults to EDGEPATCH_*
    /// environment variables.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Report which suggestions are deployable, without I/O.
    Check(CheckArgs),

    /// Print the configuration document for one URL.
    Generate(GenerateArgs),

    /// Deploy suggestions to the production documents.
    Deploy(BatchArgs),

    /// Remove suggestions from the production documents.
    Rollback(BatchArgs),

    /// Deploy to the preview bucket and compare the page HTML.
    Preview(PreviewArgs),
}

fn init_tracing(verbose: u8, format: LogFormat) {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    // Logs go to stderr; stdout carries the JSON result.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    let config = load_config(cli.config.as_deref())?;
    tracing::debug!(?config, "loaded engine configuration");

    match cli.command {
        Commands::Check(args) => run_check(&args, &offline_deployer(config)?),
        Commands::Generate(args) => run_generate(&args, &offline_deployer(config)?),
        Commands::Deploy(args) => run_deploy(&args, &build_deployer(config)?).await,
        Commands::Rollback(args) => run_rollback(&args, &build_deployer(config)?).await,
        Commands::Preview(args) => run_preview(&args, &build_deployer(config)?).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    tracing::debug!("edgepatch CLI v{} starting", env!("CARGO_PKG_VERSION"));

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parse_check() {
        let cli = Cli::try_parse_from([
            "edgepatch",
            "check",
            "--opportunity",
            "opp.json",
            "--suggestions",
            "s.json",
        ])
        .unwrap();
        match cli.command {
            Commands::Check(args) => {
                assert_eq!(args.opportunity, PathBuf::from("opp.json"));
                assert_eq!(args.suggestions, PathBuf::from("s.json"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_parse_deploy_and_rollback_share_inputs() {
        for cmd in ["deploy", "rollback"] {
            let cli = Cli::try_parse_from([
                "edgepatch",
                cmd,
                "--site",
                "site.yaml",
                "--opportunity",
                "opp.json",
                "--suggestions",
                "s.json",
            ])
            .unwrap();
            assert!(matches!(cli.command, Commands::Deploy(_) | Commands::Rollback(_)));
        }
    }

    #[test]
    fn cli_parse_preview_timing_flags() {
        let cli = Cli::try_parse_from([
            "edgepatch",
            "preview",
            "--site",
            "site.json",
            "--opportunity",
            "opp.json",
            "--suggestions",
            "s.json",
            "--warmup-ms",
            "0",
            "--max-retries",
            "1",
        ])
        .unwrap();
        let Commands::Preview(args) = cli.command else {
            panic!("expected preview");
        };
        assert_eq!(args.warmup_ms, Some(0));
        assert_eq!(args.max_retries, Some(1));
        assert_eq!(args.retry_delay_ms, None);
    }

    #[test]
    fn cli_parse_global_flags() {
        let cli = Cli::try_parse_from([
            "edgepatch",
            "-vv",
            "--log-format",
            "json",
            "--config",
            "edgepatch.yaml",
            "generate",
            "--url",
            "https://www.example.com/",
            "--opportunity",
            "o.json",
            "--suggestions",
            "s.json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_format, LogFormat::Json);
        assert_eq!(cli.config, Some(PathBuf::from("edgepatch.yaml")));
    }

    #[test]
    fn cli_parse_requires_subcommand() {
        assert!(Cli::try_parse_from(["edgepatch"]).is_err());
        assert!(Cli::try_parse_from(["edgepatch", "publish"]).is_err());
    }

    #[test]
    fn cli_parse_rejects_unknown_log_format() {
        assert!(Cli::try_parse_from(["edgepatch", "--log-format", "xml", "check"]).is_err());
    }
}
