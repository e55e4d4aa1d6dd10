//! rtseq - periodic real-time service runner
//!
//! Loads a sequencer configuration, runs synthetic workloads under the
//! release driver, and prints per-service timing reports.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod commands;
mod config;
mod error;
mod output;
mod workload;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::CliError;

#[derive(Parser)]
#[command(name = "rtseq")]
#[command(about = "Periodic real-time service runner")]
#[command(version)]
#[command(long_about = "
rtseq runs a set of periodic services, each on its own thread, released by a
shared tick or by per-service timers. Each service runs a synthetic workload
and reports execution time, jitter and missed deadlines when the run ends.

Use --json for machine-readable output suitable for scripting.
")]
struct Cli {
    /// Output in JSON format for machine parsing
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a configuration until the duration elapses or Ctrl-C
    Run {
        /// Configuration file (.yaml, .yml or .json)
        #[arg(short, long, env = "RTSEQ_CONFIG")]
        config: PathBuf,

        /// Stop after this many milliseconds; runs until Ctrl-C if omitted
        #[arg(short, long)]
        duration_ms: Option<u64>,
    },

    /// Validate a configuration and list its services by period
    Check {
        /// Configuration file (.yaml, .yml or .json)
        #[arg(short, long, env = "RTSEQ_CONFIG")]
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match execute_command(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                output::print_error_json(&e);
            } else {
                output::print_error_human(&e);
            }
            ExitCode::from(exit_code(&e))
        }
    }
}

fn execute_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Run {
            config,
            duration_ms,
        } => commands::run::execute(config, *duration_ms, cli.json),
        Commands::Check { config } => commands::check::execute(config, cli.json),
    }
}

fn exit_code(error: &anyhow::Error) -> u8 {
    error
        .downcast_ref::<CliError>()
        .map_or(1, CliError::exit_code)
}
