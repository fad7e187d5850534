//! Logging and observability for stackforge
//!
//! Structured logging via `tracing`. The CLI calls [`init_tracing`] once;
//! library code only emits events and never installs a subscriber.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{Level, debug, error, info, span, warn};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::types::{CacheStats, CheckStatus, ComponentResult, DoctorOutput, RollbackSummary};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise verbose mode enables debug output for
/// stackforge crates, including the live output lines of external tools.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("stackforge=debug,info")
            } else {
                EnvFilter::try_new("stackforge=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(true)
                    .with_line_number(false)
                    .with_file(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .with_line_number(false)
                    .with_file(false)
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}

/// Span wrapping one component's generation.
pub fn component_span(component_type: &str, name: &str) -> tracing::Span {
    span!(
        Level::INFO,
        "component",
        component_type = %component_type,
        name = %name,
    )
}

pub fn log_component_start(component_type: &str, name: &str) {
    info!(component_type = %component_type, name = %name, "Generating component");
}

/// Log a finished component, successful or not.
pub fn log_component_complete(result: &ComponentResult) {
    let duration_ms = result.duration.as_millis();
    if result.success {
        info!(
            component_type = %result.component_type,
            name = %result.name,
            method = result.method_str(),
            tool = result.tool_used.as_deref().unwrap_or("-"),
            duration_ms = %duration_ms,
            "Component generated"
        );
        for step in &result.manual_steps {
            info!(name = %result.name, step = %step, "Manual step required");
        }
    } else {
        let message = result
            .error
            .as_ref()
            .map_or_else(|| "unknown error".to_string(), ToString::to_string);
        log_component_error(&result.name, result.method_str(), &message, duration_ms);
    }
    for warning in &result.warnings {
        warn!(name = %result.name, warning = %warning, "Component warning");
    }
}

pub fn log_component_error(name: &str, method: &str, error: &str, duration_ms: u128) {
    error!(
        name = %name,
        method = %method,
        error = %error,
        duration_ms = %duration_ms,
        "Component generation failed"
    );
}

/// Log tool cache statistics
pub fn log_cache_stats(stats: &CacheStats) {
    info!(
        target: "stackforge::cache",
        total = stats.total_entries,
        available = stats.available_tools,
        unavailable = stats.unavailable_tools,
        ttl_secs = stats.ttl_secs,
        "Tool cache stats: total={}, available={}, unavailable={}",
        stats.total_entries,
        stats.available_tools,
        stats.unavailable_tools
    );
}

/// Log what a rollback did; failures inside it are warnings, not errors.
pub fn log_rollback_report(summary: &RollbackSummary) {
    for dir in &summary.removed_temp_dirs {
        debug!(path = %dir, "Removed staging directory");
    }
    if let Some(backup) = &summary.restored_backup {
        info!(backup = %backup, "Restored output directory from backup");
    }
    for warning in &summary.warnings {
        warn!(warning = %warning, "Rollback incomplete");
    }
    if summary.succeeded {
        info!("Rollback completed");
    } else {
        warn!("Rollback completed with warnings");
    }
}

/// Print a doctor report to stdout in human-readable form.
pub fn log_doctor_report(report: &DoctorOutput) {
    println!("stackforge environment check");
    println!("----------------------------");

    let mut counts = [0usize; 3];
    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => {
                counts[0] += 1;
                "ok  "
            }
            CheckStatus::Warn => {
                counts[1] += 1;
                "warn"
            }
            CheckStatus::Fail => {
                counts[2] += 1;
                "FAIL"
            }
        };
        println!("[{marker}] {:<22} {}", check.name, check.details);
    }

    if let Some(stats) = &report.cache_stats {
        println!();
        println!(
            "tool cache: {} entries ({} available, {} unavailable), ttl {}s",
            stats.total_entries, stats.available_tools, stats.unavailable_tools, stats.ttl_secs
        );
    }

    println!();
    println!(
        "{} passed, {} warnings, {} failed",
        counts[0], counts[1], counts[2]
    );
}

/// Wall-clock timings for named pipeline stages.
#[derive(Debug)]
pub struct StageTimer {
    verbose: bool,
    started: HashMap<String, Instant>,
    finished: Vec<(String, Duration)>,
}

impl StageTimer {
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            started: HashMap::new(),
            finished: Vec::new(),
        }
    }

    pub fn start(&mut self, stage: &str) {
        if self.verbose {
            debug!(stage = %stage, "Starting stage");
        }
        self.started.insert(stage.to_string(), Instant::now());
    }

    /// Stop timing `stage`; returns zero if it was never started.
    pub fn end(&mut self, stage: &str) -> Duration {
        let duration = self
            .started
            .remove(stage)
            .map_or(Duration::ZERO, |start| start.elapsed());
        if self.verbose {
            debug!(stage = %stage, duration_ms = %duration.as_millis(), "Completed stage");
        }
        self.finished.push((stage.to_string(), duration));
        duration
    }

    #[must_use]
    pub fn summary(&self) -> &[(String, Duration)] {
        &self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_timer_records_in_order() {
        let mut timer = StageTimer::new(false);
        timer.start("validate");
        timer.end("validate");
        timer.start("generate");
        timer.end("generate");

        let names: Vec<&str> = timer.summary().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["validate", "generate"]);
    }

    #[test]
    fn test_stage_timer_unknown_stage_is_zero() {
        let mut timer = StageTimer::new(true);
        assert_eq!(timer.end("never-started"), Duration::ZERO);
    }

    #[test]
    fn test_component_span_has_name() {
        let span = component_span("nextjs", "web");
        // no subscriber installed in unit tests
        let _entered = span.enter();
    }
}
