//! Varianter CLI - Command-line interface
//!
//! Submits image variant tasks, reports their status, and resumes pending
//! work through the varianter library.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::submit::SubmitArgs;
use error::CliError;
use runner::CliRunner;

#[derive(Debug, Parser)]
#[command(name = "varianter", version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Put the store and variant output under this directory
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Submit an image (local path or http(s) URL) for processing
    Submit {
        /// Source image
        source: String,

        /// Wait for the task to finish and print its final state
        #[arg(long)]
        wait: bool,

        /// Seconds to wait with --wait
        #[arg(long, default_value_t = 300)]
        timeout: u64,
    },

    /// Show the state of a task
    Status {
        /// Task id returned by submit
        id: String,
    },

    /// Resume pending tasks from previous runs and exit when done
    Run,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.as_deref();
    let data_dir = cli.data_dir.as_deref();

    match cli.command {
        Commands::Init { force } => commands::init::run(config_path, force),
        Commands::Config(command) => commands::config::run(command, config_path),
        Commands::Submit {
            source,
            wait,
            timeout,
        } => {
            let runner = CliRunner::new(config_path, data_dir)?;
            commands::submit::run(
                &runner,
                SubmitArgs {
                    source,
                    wait,
                    timeout_secs: timeout,
                },
            )
        }
        Commands::Status { id } => {
            let runner = CliRunner::new(config_path, data_dir)?;
            commands::status::run(&runner, &id)
        }
        Commands::Run => {
            let runner = CliRunner::new(config_path, data_dir)?;
            commands::run::run(&runner)
        }
    }
}
