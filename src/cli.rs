//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI parser for `verity`.
#[derive(Debug, Parser)]
#[command(name = "verity", version, about = "Run declarative feature verification strategies")]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a feature's verification strategy tree.
    Check {
        /// Feature document (Markdown with YAML frontmatter, YAML, or JSON).
        feature: PathBuf,
        /// Project root the strategies run against (defaults to the current directory).
        #[arg(long)]
        root: Option<PathBuf>,
        /// Print the result as JSON instead of a report.
        #[arg(long)]
        json: bool,
    },
    /// List the registered strategy types.
    Types,
}
