//! Declarative verification engine for product features.
//!
//! A feature declares *how* it is proven done as a tree of strategies
//! (`test`, `e2e`, `script`, `command`, `file`, `http`, `manual`, `ai`,
//! combined with `composite` AND/OR nodes). The [`verify`] module resolves
//! each strategy to an executor and produces a uniform
//! [`StrategyResult`](strategy::StrategyResult). Every side effect goes
//! through a [`ports`] trait so runs can be recorded and replayed.

pub mod adapters;
pub mod cassette;
pub mod cli;
pub mod commands;
pub mod context;
pub mod logging;
pub mod ports;
pub mod strategy;
pub mod verify;

use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails, a command fails, or
/// a verification does not pass.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = cli::Cli::try_parse_from(args).map_err(|err| err.to_string())?;
    commands::dispatch(&cli.command)
}

#[cfg(test)]
mod tests {
    use super::run;

    #[test]
    fn run_lists_types() {
        assert!(run(["verity", "types"]).is_ok());
    }

    #[test]
    fn run_errors_on_unknown_subcommand() {
        assert!(run(["verity", "unknown"]).is_err());
    }

    #[test]
    fn run_errors_on_missing_feature_file() {
        let err = run(["verity", "check", "/definitely/not/a/feature.md"]).unwrap_err();
        assert!(err.contains("Failed to read"), "{err}");
    }
}
