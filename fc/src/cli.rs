//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::query::QueryMode;

/// FilterCoord - shared update coordinator for filter controls
#[derive(Parser)]
#[command(
    name = "fc",
    about = "Run filter coordination scenarios and compile query fragments",
    version,
    after_help = "Logs are written to: ~/.local/share/filtercoord/logs/fc.log"
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
    /// Run a scenario of contributors against an in-memory view
    Simulate {
        /// Scenario file (YAML)
        #[arg(value_name = "SCENARIO")]
        scenario: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Compile a file of per-contributor fragments into one query
    Compile {
        /// Fragment file (YAML or JSON)
        #[arg(value_name = "FRAGMENTS")]
        fragments: PathBuf,

        /// Query mode of the target view
        #[arg(short, long, default_value = "textual")]
        mode: QueryMode,
    },
}

/// Output format for scenario reports
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}
