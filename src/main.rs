mod ccache;
mod conan;
mod config;
mod driver;
mod logging;
mod report;
mod runner;
mod stats;
mod summary;

use clap::Parser;
use config::{CheckConfig, Overrides, DEFAULT_CONFIG_PATH};
use driver::{Check, CheckOutcome};
use runner::ProcessRunner;
use std::path::PathBuf;

/// Check if ccache works with conan: rebuild a package under several
/// configurations and report cache hits and misses after each build.
#[derive(Parser, Debug)]
#[command(name = "ccache-conan-check", version, about)]
pub struct Cli {
    /// conan package used to run checks
    #[arg(value_name = "PACKAGE")]
    package: PathBuf,

    /// Verbose output (debug logging, captured command output)
    #[arg(short, long)]
    verbose: bool,

    /// Config file path [default: ccache-check.toml]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// ccache command (overrides config)
    #[arg(long)]
    ccache: Option<String>,

    /// conan command (overrides config)
    #[arg(long)]
    conan: Option<String>,

    /// Per-command timeout in seconds, 0 for none (overrides config)
    #[arg(long)]
    timeout: Option<u64>,

    /// Write a JSON summary of the run to this path
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Print the commands that would run, don't run them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    tracing::debug!(?cli, "parsed CLI arguments");

    if let Err(e) = run(cli).await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let (config_path, required) = match cli.config {
        Some(path) => (path, true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };
    let mut config = CheckConfig::load(&config_path, required)?;
    config.apply_overrides(Overrides {
        ccache: cli.ccache,
        conan: cli.conan,
        timeout_secs: cli.timeout,
    });

    let check = Check::new(&config, &cli.package)?;

    if cli.dry_run {
        tracing::info!("dry run, commands are listed but not executed");
        for command in check.planned_commands() {
            tracing::info!("would execute: {command}");
        }
        return Ok(());
    }

    let mut runner = ProcessRunner::new(config.runner.timeout());
    match check.run(&mut runner).await? {
        CheckOutcome::Completed(summary) => {
            if let Some(path) = &cli.summary {
                summary.write(path).map_err(driver::CheckError::from)?;
            }
        }
        CheckOutcome::CacheUnavailable => {}
    }
    Ok(())
}
