//! Cache command implementation
//!
//! Handles `stackforge cache <stats|validate|export|import|refresh|clear>`.

use anyhow::Result;

use stackforge_doctor::{SystemToolProbe, all_required_tools};
use stackforge_toolcache::{CacheExporter, CacheValidator, ToolCacheManager};

use super::common::{open_cache, print_json, save_cache};
use crate::cli::args::CacheCommands;
use crate::{Config, ExitCode, StackforgeError};

/// Execute a cache subcommand
pub fn execute_cache_command(config: &Config, command: CacheCommands) -> Result<ExitCode> {
    let cache = open_cache(config);

    match command {
        CacheCommands::Stats { json } => {
            let stats = cache.stats();
            if json {
                print_json(&stats)?;
            } else {
                println!("Tool cache: {}", config.cache_path());
                println!("  entries:     {}", stats.total_entries);
                println!("  available:   {}", stats.available_tools);
                println!("  unavailable: {}", stats.unavailable_tools);
                println!("  ttl:         {}s", stats.ttl_secs);
            }
            Ok(ExitCode::SUCCESS)
        }
        CacheCommands::Validate { repair, json } => {
            let validator = CacheValidator::new();
            let report = validator.validate(&cache);
            let repaired = if repair && !report.valid {
                let removed = validator.repair(&cache);
                save_cache(&cache)?;
                removed
            } else {
                Vec::new()
            };

            if json {
                print_json(&report)?;
            } else {
                let mark = if report.valid { "✓" } else { "✗" };
                println!(
                    "{mark} {} entries, {} corrupted",
                    report.total_entries,
                    report.corrupted_entries.len()
                );
                for name in &report.corrupted_entries {
                    println!("    - {name}");
                }
                for warning in &report.warnings {
                    println!("  ⚠ {warning}");
                }
                if !repaired.is_empty() {
                    println!("Removed {} invalid entries", repaired.len());
                }
            }

            Ok(if report.valid || !repaired.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::CACHE_ERROR
            })
        }
        CacheCommands::Export { path } => {
            let exported = CacheExporter::new()
                .export(&cache, &path)
                .map_err(StackforgeError::Cache)?;
            println!("✓ Exported {} entries to {path}", exported.entries.len());
            Ok(ExitCode::SUCCESS)
        }
        CacheCommands::Import { path } => {
            let count = CacheExporter::new()
                .import(&cache, &path)
                .map_err(StackforgeError::Cache)?;
            save_cache(&cache)?;
            println!("✓ Imported {count} entries from {path}");
            Ok(ExitCode::SUCCESS)
        }
        CacheCommands::Refresh { tools } => {
            let tools = if !tools.is_empty() {
                tools
            } else if cache.is_empty() {
                all_required_tools().into_iter().map(String::from).collect()
            } else {
                cache.names()
            };
            let manager = ToolCacheManager::new(cache.clone());
            let summary = manager.refresh(&SystemToolProbe::new(), Some(tools.as_slice()));
            save_cache(&cache)?;

            for name in &summary.probed {
                let status = cache
                    .peek(name)
                    .map(|e| {
                        if e.available {
                            format!("✓ {}", e.version)
                        } else {
                            "✗ not installed".to_string()
                        }
                    })
                    .unwrap_or_default();
                println!("  {name}: {status}");
            }
            for failure in &summary.failed {
                println!("  ⚠ {failure}");
            }
            Ok(ExitCode::SUCCESS)
        }
        CacheCommands::Clear => {
            let removed = cache.len();
            cache.clear();
            save_cache(&cache)?;
            println!("✓ Cleared {removed} entries");
            Ok(ExitCode::SUCCESS)
        }
    }
}
