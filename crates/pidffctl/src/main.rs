//! pidffctl - PID force feedback command-line tools
//!
//! Checks capability tables, dry-runs effect downloads and decodes inbound
//! reports without touching real hardware.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod commands;
mod error;
mod files;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pidff_errors::PidError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::download::DownloadOptions;
use crate::error::CliError;

#[derive(Parser)]
#[command(name = "pidffctl")]
#[command(about = "PID force feedback tools - check capability tables and dry-run effect downloads")]
#[command(version)]
#[command(long_about = "
pidffctl works on a device capability table (YAML or JSON) and prints the
exact HID PID reports the effect engine would write for it. Nothing is sent
to a device: reports go to a recording transport.

Use --json for machine-readable output suitable for scripting.
")]
struct Cli {
    /// Output in JSON format for machine parsing
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a capability table and list what the device can play
    Check {
        /// Capability table (.yaml or .json)
        caps: PathBuf,
    },

    /// Create an effect and print the reports its download writes
    Download {
        /// Capability table (.yaml or .json)
        caps: PathBuf,

        /// Effect file: kind plus initial parameters
        effect: PathBuf,

        /// Start the effect after downloading
        #[arg(long)]
        start: bool,

        /// Play count when starting (4294967295 loops forever)
        #[arg(long, default_value_t = 1, requires = "start")]
        iterations: u32,

        /// Stop every other effect when starting
        #[arg(long, requires = "start")]
        solo: bool,

        /// Also print the reports written when the session is acquired
        #[arg(long)]
        with_acquire: bool,
    },

    /// Decode an inbound report (PID State or Block Load)
    Decode {
        /// Capability table (.yaml or .json)
        caps: PathBuf,

        /// Report bytes in hex, report id first
        hex: String,
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
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("pidffctl={log_level},pidff_engine={log_level}").into()
            }),
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

fn exit_code(error: &anyhow::Error) -> u8 {
    if let Some(cli_error) = error.downcast_ref::<CliError>() {
        return cli_error.exit_code();
    }
    match error.downcast_ref::<PidError>() {
        Some(e) if e.is_caller_fixable() => 4,
        Some(_) => 5,
        None => 1,
    }
}

fn execute_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Check { caps } => commands::check::execute(caps, cli.json),
        Commands::Download {
            caps,
            effect,
            start,
            iterations,
            solo,
            with_acquire,
        } => {
            let options = DownloadOptions {
                start: *start,
                iterations: *iterations,
                solo: *solo,
                with_acquire: *with_acquire,
            };
            commands::download::execute(caps, effect, options, cli.json)
        }
        Commands::Decode { caps, hex } => commands::decode::execute(caps, hex, cli.json),
    }
}
