//! CLI entry point and dispatch logic
//!
//! `run()` parses arguments, discovers the configuration, creates the tokio
//! runtime, dispatches to a command handler and owns all error output.

use clap::Parser;

use super::args::{Cli, Commands};
use super::commands;

use crate::{Config, ExitCode, StackforgeError};

/// Main CLI execution function.
///
/// Prints everything, including errors, and returns the process exit code
/// on failure; `main` only calls `std::process::exit`.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    if let Err(e) = stackforge_utils::logging::init_tracing(cli.verbose) {
        eprintln!("warning: could not initialise logging: {e}");
    }

    let cli_args = cli.to_cli_args();
    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => {
            let err = StackforgeError::Config(err);
            eprintln!("{}", err.display_for_user());
            return Err(err.to_exit_code());
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ Failed to create async runtime: {e}");
            return Err(ExitCode::INTERNAL);
        }
    };

    let operation = cli.command.operation();
    let result = rt.block_on(async {
        match cli.command {
            Commands::Generate { json } => commands::execute_generate_command(&config, json).await,
            Commands::Preview { json } => commands::execute_preview_command(&config, json),
            Commands::Doctor { json } => commands::execute_doctor_command(&config, json),
            Commands::Cache(cmd) => commands::execute_cache_command(&config, cmd),
        }
    });

    match result {
        Ok(code) if code == ExitCode::SUCCESS => Ok(()),
        Ok(code) => Err(code),
        Err(error) => {
            if let Some(err) = error.downcast_ref::<StackforgeError>() {
                eprintln!("{}", err.display_for_user());
                return Err(err.to_exit_code());
            }
            eprintln!("✗ {operation} failed: {error:#}");
            eprintln!("\n  General troubleshooting:");
            eprintln!("    - Run with --verbose for more detailed output");
            eprintln!("    - Run 'stackforge doctor' to check your environment");
            Err(ExitCode::INTERNAL)
        }
    }
}
