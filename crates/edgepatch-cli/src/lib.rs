//! # edgepatch-cli — Command-Line Interface for the Edge-Patch Engine
//!
//! Provides the `edgepatch` binary.
//!
//! ## Subcommands
//!
//! - `edgepatch check`: eligibility dry-run, no I/O.
//! - `edgepatch generate`: print the document a batch would produce.
//! - `edgepatch deploy` / `edgepatch rollback`: write production documents
//!   and invalidate the CDN.
//! - `edgepatch preview`: deploy to the preview bucket and compare HTML.
//!
//! ```bash
//! edgepatch check --opportunity opp.json --suggestions suggestions.json
//! edgepatch -v --config edgepatch.yaml deploy --site site.json \
//!     --opportunity opp.json --suggestions suggestions.json
//! ```
//!
//! Every command prints a JSON result on stdout. Exit code `0` means every
//! suggestion succeeded, `2` that at least one failed, `1` an error.

pub mod check;
pub mod deploy;
pub mod generate;
pub mod input;
pub mod preview;
pub mod settings;

/// Exit code when the command ran but some suggestions were not applied.
pub const EXIT_PARTIAL: u8 = 2;

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Exit code for a command whose result may contain failed suggestions.
pub fn exit_code(has_failures: bool) -> u8 {
    if has_failures {
        EXIT_PARTIAL
    } else {
        0
    }
}
