//! Preview command implementation
//!
//! Handles `stackforge preview`: a dry run over what the tool cache already
//! knows. Network detection is skipped so a preview never waits on a probe.

use anyhow::Result;
use std::sync::Arc;

use stackforge_doctor::SystemToolProbe;
use stackforge_engine::{GeneratorRegistry, Orchestrator, OrchestratorOptions, PreviewReport};
use stackforge_runner::NativeRunner;

use super::common::{open_cache, print_json, resolve_output_dir};
use crate::{Config, ExitCode, StackforgeError};

/// Execute the preview command
pub fn execute_preview_command(config: &Config, json: bool) -> Result<ExitCode> {
    let specs = config.component_specs().map_err(StackforgeError::Config)?;
    let output_dir = resolve_output_dir(config)?;

    let options = OrchestratorOptions::from_config(config, config.offline());
    let registry = GeneratorRegistry::with_defaults(Arc::new(NativeRunner::new()));
    let orchestrator = Orchestrator::new(
        options,
        registry,
        open_cache(config),
        Arc::new(SystemToolProbe::new()),
    );
    let report = orchestrator.preview(&specs, &output_dir);

    if json {
        print_json(&report)?;
    } else {
        print_preview(&report);
    }

    Ok(if report.ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::GENERATION_FAILED
    })
}

fn print_preview(report: &PreviewReport) {
    println!("Preview for {}", report.output_dir);
    println!();
    for component in &report.components {
        match (&component.method, &component.error) {
            (Some(method), None) => {
                let reason = component
                    .reason
                    .map(|r| r.to_string())
                    .unwrap_or_default();
                println!("  {} ({}): {method} ({reason})", component.name, component.component_type);
            }
            (_, Some(error)) => {
                println!("  {} ({}): ✗ {error}", component.name, component.component_type);
            }
            (None, None) => {
                println!("  {} ({}): no strategy", component.name, component.component_type);
            }
        }
        println!("      → {}", component.target_path);
        if !component.missing_tools.is_empty() {
            println!("      missing tools: {}", component.missing_tools.join(", "));
        }
        for file in &component.expected_files {
            println!("      · {file}");
        }
    }
    for warning in &report.warnings {
        println!("  ⚠ {warning}");
    }
}
