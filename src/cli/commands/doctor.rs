//! Doctor command implementation
//!
//! Handles `stackforge doctor` command for environment health checks.

use anyhow::{Context, Result};

use stackforge_doctor::DoctorCommand;

use super::common::print_json;
use crate::{Config, ExitCode};

/// Execute the doctor command for environment health checks
pub fn execute_doctor_command(config: &Config, json: bool) -> Result<ExitCode> {
    let output = DoctorCommand::new(config.clone())
        .run()
        .context("Failed to run doctor checks")?;

    if json {
        print_json(&output)?;
    } else {
        stackforge_utils::logging::log_doctor_report(&output);
        if !output.ok {
            println!();
            println!("Some checks failed. Please address the issues above before generating.");
        }
    }

    Ok(if output.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::INTERNAL
    })
}
