//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// brdgen - verified BRD generation
#[derive(Parser)]
#[command(
    name = "brdgen",
    about = "Generate verified planning documents from feature requests",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Generate a verified BRD from a feature request
    Generate {
        /// Feature request text (or @path to read it from a file)
        request: String,

        /// Comma-separated affected component names
        #[arg(long, value_delimiter = ',')]
        components: Vec<String>,

        /// Include the evidence report in the output
        #[arg(long)]
        evidence: bool,

        /// Output format
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,
    },

    /// Decompose an approved BRD (JSON file) into epics
    Epics {
        /// Path to the approved BRD JSON
        brd: PathBuf,
    },

    /// Expand approved epics (JSON file) into backlog stories
    Backlogs {
        /// Path to the approved epics JSON
        epics: PathBuf,
    },

    /// Check knowledge source health
    Health,
}

/// Output format for generated documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Markdown,
}
