//! adtrack CLI - drive the impression tracker from the command line.
//!
//! `simulate` plays a scripted scenario against a live tracker and prints
//! every key it sends; `keys` shows the keys a placement would produce.

mod commands;
mod config;
mod error;
mod logging;
mod scenario;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use commands::keys::KeysArgs;
use commands::simulate::SimulateArgs;
use config::TimingOverrides;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "adtrack", version, about = "Ad impression tracking simulator")]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Play a scenario file against a live tracker
    Simulate {
        /// Scenario file (JSON)
        scenario: PathBuf,

        /// Tracker config file (INI with a [tracker] section)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Quiescence probe interval in milliseconds
        #[arg(long)]
        probe_interval_ms: Option<u64>,

        /// Minimum spacing between processed motion signals in milliseconds
        #[arg(long)]
        min_signal_spacing_ms: Option<u64>,

        /// Print only the summary
        #[arg(short, long)]
        quiet: bool,
    },
    /// Print the event keys for a placement label and event name
    Keys {
        /// Placement label used as the key prefix
        label: String,

        /// Event name
        event_name: String,
    },
}

fn run(cli: Cli) -> Result<(), CliError> {
    logging::init_logging(cli.verbose)?;

    match cli.command {
        Commands::Simulate {
            scenario,
            config,
            probe_interval_ms,
            min_signal_spacing_ms,
            quiet,
        } => commands::simulate::run(SimulateArgs {
            scenario,
            config,
            timing: TimingOverrides {
                probe_interval_ms,
                min_signal_spacing_ms,
            },
            quiet,
        }),
        Commands::Keys { label, event_name } => {
            commands::keys::run(KeysArgs { label, event_name })
        }
    }
}

fn main() {
    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
