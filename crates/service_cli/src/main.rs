//! Wealth CLI - Command Line Operations for Portfolio Risk Simulation
//!
//! This is the operational entry point for the wealth simulation engine.
//!
//! # Commands
//!
//! - `wealth run --input <batch.json>` - Simulate a client batch and report risk
//! - `wealth demo` - Run a built-in three-client batch
//! - `wealth check` - Show system and configuration diagnostics
//!
//! # Configuration
//!
//! Settings load from `wealth.toml` (or `--config`), then `WEALTH_SEED`,
//! `WEALTH_SCENARIOS`, `WEALTH_PERIODS` and `WEALTH_LOG_LEVEL`. `RUST_LOG`
//! takes precedence over the configured log level; `--verbose` raises it to
//! debug.
//!
//! # Architecture
//!
//! As the **S**ervice layer, this crate orchestrates the wealth engine layers
//! behind a single command-line interface.

use std::path::Path;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;
mod error;
mod input;

pub use error::{CliError, Result};

use config::CliConfig;

/// Portfolio risk and optimisation engine CLI
#[derive(Parser)]
#[command(name = "wealth")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "wealth.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a batch of clients and report risk
    Run {
        /// Path to the batch input file (JSON)
        #[arg(short, long)]
        input: String,

        /// Write the reports as JSON to this file
        #[arg(short, long)]
        output: Option<String>,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Run a built-in demonstration batch
    Demo,

    /// Check system configuration
    Check,
}

fn init_tracing(config: &CliConfig, verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose {
            "debug"
        } else {
            config.log_level.as_filter_str()
        };
        EnvFilter::new(level)
    });
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = CliConfig::load(Path::new(&cli.config))
        .with_context(|| format!("loading configuration from {}", cli.config))?;
    init_tracing(&config, cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    if let Some(threads) = config.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("configuring the worker pool")?;
    }

    match cli.command {
        Commands::Run {
            input,
            output,
            format,
        } => commands::run::run(&config, &input, output.as_deref(), &format)?,
        Commands::Demo => commands::demo::run(&config)?,
        Commands::Check => commands::check::run(&config, &cli.config)?,
    }
    Ok(())
}
