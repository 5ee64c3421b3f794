//! Wheelguard CLI: command-line front end for the scroll filter.
//!
//! Usage:
//!   wheelguard replay <LOG>        Run a recorded wheel log through the filter
//!   wheelguard monitor             Filter the live wheel in dry-run mode
//!   wheelguard record              Record calibration samples
//!   wheelguard calibrate <FILE>    Derive filter parameters from samples
//!   wheelguard config <ACTION>     Show or edit the configuration
//!   wheelguard check               Check system capabilities

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use wheelguard_scroll_model::CalibrationPhase;

mod commands;

#[derive(Parser)]
#[command(
    name = "wheelguard",
    about = "Mouse-wheel jitter filter with guided calibration",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the standard location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded wheel log through the filter
    Replay {
        /// Path to the JSONL wheel log
        log: PathBuf,

        /// Resolve settings as if this application had focus
        #[arg(long)]
        app: Option<String>,

        /// Write the ticks that passed to this JSONL file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print every decision
        #[arg(long)]
        decisions: bool,
    },

    /// Filter the live wheel and print decisions without suppressing anything
    Monitor {
        /// Input device to read (defaults to the first wheel found)
        #[arg(long)]
        device: Option<PathBuf>,

        /// Resolve settings as if this application had focus
        #[arg(long)]
        app: Option<String>,

        /// Stop after this many seconds
        #[arg(long)]
        duration: Option<u64>,
    },

    /// Record calibration samples with a guided session
    Record {
        /// Record only this phase: flow|sprint|brake|precision
        #[arg(long)]
        phase: Option<CalibrationPhase>,

        /// Sample file to create or extend
        #[arg(short, long, default_value = "calibration-samples.json")]
        samples: PathBuf,

        /// Also write every raw tick to this JSONL log
        #[arg(long)]
        log: Option<PathBuf>,

        /// Input device to read (defaults to the first wheel found)
        #[arg(long)]
        device: Option<PathBuf>,
    },

    /// Derive recommended settings from recorded samples
    Calibrate {
        /// Path to the sample file
        samples: PathBuf,

        /// Save the recommended values to the configuration
        #[arg(long)]
        apply: bool,

        /// With --apply, store the values as a profile for this application
        #[arg(long, requires = "apply")]
        profile: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or edit the configuration
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },

    /// Check system capabilities
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(wheelguard_common::config_file_path);

    let mut logging = commands::load_config(&config_path)
        .map(|config| config.logging)
        .unwrap_or_default();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    wheelguard_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Replay {
            log,
            app,
            output,
            decisions,
        } => commands::replay::run(&config_path, &log, app, output, decisions).await,
        Commands::Monitor {
            device,
            app,
            duration,
        } => commands::monitor::run(&config_path, device, app, duration).await,
        Commands::Record {
            phase,
            samples,
            log,
            device,
        } => commands::record::run(&config_path, phase, &samples, log, device).await,
        Commands::Calibrate {
            samples,
            apply,
            profile,
            json,
        } => commands::calibrate::run(&config_path, &samples, apply, profile, json),
        Commands::Config { action } => commands::config::run(&config_path, action),
        Commands::Check => commands::check::run(&config_path),
    }
}
