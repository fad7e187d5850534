//! Generate command implementation
//!
//! Handles `stackforge generate`: runs the orchestrator on a blocking thread
//! while Ctrl+C cancels the shared token.

use anyhow::{Context, Result};
use std::sync::Arc;

use stackforge_doctor::{OfflineDetector, SystemToolProbe};
use stackforge_engine::{GeneratorRegistry, Orchestrator, OrchestratorOptions};
use stackforge_runner::{CancellationToken, NativeRunner};
use stackforge_utils::error::{ErrorCategory, display_for_user};

use super::common::{open_cache, print_json, resolve_output_dir};
use crate::{Config, ExitCode, GenerationReport, StackforgeError};

/// Execute the generate command
pub async fn execute_generate_command(config: &Config, json: bool) -> Result<ExitCode> {
    let specs = config.component_specs().map_err(StackforgeError::Config)?;
    let output_dir = resolve_output_dir(config)?;

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received; canceling generation");
                cancel.cancel();
            }
        })
    };

    let config = config.clone();
    let token = cancel.clone();
    let report = tokio::task::spawn_blocking(move || {
        let cache = open_cache(&config);
        let offline = OfflineDetector::new().status(config.offline(), config.detect_offline());
        if offline.is_offline() {
            tracing::info!(status = offline.describe(), "Running offline");
        }
        let options = OrchestratorOptions::from_config(&config, offline.is_offline());
        let registry = GeneratorRegistry::with_defaults(Arc::new(NativeRunner::new()));
        let orchestrator =
            Orchestrator::new(options, registry, cache, Arc::new(SystemToolProbe::new()));
        orchestrator.generate(&specs, &output_dir, &token)
    })
    .await
    .context("Generation task panicked")?;
    interrupt.abort();

    if json {
        print_json(&report)?;
    } else {
        print_report(&report);
    }

    Ok(exit_code_for(&report))
}

/// Exit code a finished run maps to.
pub fn exit_code_for(report: &GenerationReport) -> ExitCode {
    if report.success {
        ExitCode::SUCCESS
    } else if report
        .errors
        .iter()
        .any(|e| e.category == ErrorCategory::Canceled)
    {
        ExitCode::CANCELED
    } else {
        ExitCode::GENERATION_FAILED
    }
}

fn print_report(report: &GenerationReport) {
    for component in &report.components {
        let mark = if component.success { "✓" } else { "✗" };
        let method = if component.method.is_some() {
            format!(" [{}]", component.method_str())
        } else {
            String::new()
        };
        println!(
            "{mark} {} ({}){method} in {:.1}s",
            component.name,
            component.component_type,
            component.duration.as_secs_f64()
        );
        if let Some(path) = &component.output_path {
            println!("    → {path}");
        }
        for step in &component.manual_steps {
            println!("    • {step}");
        }
    }

    if !report.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &report.warnings {
            println!("  ⚠ {warning}");
        }
    }

    if report.success {
        println!(
            "\n✓ Generated {} component(s) into {} in {:.1}s",
            report.succeeded_count(),
            report.output_dir,
            report.duration.as_secs_f64()
        );
        if let Some(backup) = &report.backup_path {
            println!("  Previous contents kept at {backup}");
        }
        return;
    }

    eprintln!();
    for error in &report.errors {
        eprintln!("{}", display_for_user(error));
    }
    match &report.rollback {
        Some(rollback) if rollback.succeeded => {
            eprintln!("✗ Generation failed; {} was restored to its previous state", report.output_dir);
        }
        Some(rollback) => {
            eprintln!("✗ Generation failed and rollback was incomplete:");
            for warning in &rollback.warnings {
                eprintln!("    - {warning}");
            }
        }
        None => eprintln!("✗ Generation failed before anything was written"),
    }
}
