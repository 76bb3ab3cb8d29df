//! fc - FilterCoord command-line tool
//!
//! Runs contributor scenarios against an in-memory view and compiles fragment files.

use std::fs;
use std::path::Path;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::info;

use filtercoord::cli::{Cli, Command, OutputFormat};
use filtercoord::config::{Config, LoggingConfig};
use filtercoord::query::QueryMode;
use filtercoord::simulate::{self, Scenario};

fn setup_logging(logging: &LoggingConfig, verbose: bool) -> Result<()> {
    let log_dir = logging.resolve_dir();
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Write to log file, not stdout/stderr
    let log_file = fs::File::create(log_dir.join("fc.log")).context("Failed to create log file")?;
    let filter = if verbose {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level))
    };

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(filter)
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config first: it decides where logs go
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    setup_logging(&config.logging, cli.verbose).context("Failed to setup logging")?;
    info!("fc loaded config: debounce={}ms", config.coordinator.debounce_ms);

    match cli.command {
        Command::Simulate { scenario, format } => cmd_simulate(&config, &scenario, format).await,
        Command::Compile { fragments, mode } => cmd_compile(&fragments, mode),
    }
}

async fn cmd_simulate(config: &Config, path: &Path, format: OutputFormat) -> Result<()> {
    let scenario = Scenario::load(path).context(format!("Failed to load scenario {}", path.display()))?;
    let report = simulate::run(&scenario, &config.coordinator).await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print!("{}", report.to_text()),
    }

    if !report.settled {
        eprintln!("{} view did not settle within {}ms", "warning:".yellow(), scenario.view.settle_timeout_ms);
    }
    Ok(())
}

fn cmd_compile(path: &Path, mode: QueryMode) -> Result<()> {
    let entries =
        simulate::load_fragments(path).context(format!("Failed to load fragments {}", path.display()))?;
    let query = simulate::compile_fragments(&entries, mode);
    println!("{}", serde_json::to_string_pretty(&query)?);
    Ok(())
}
