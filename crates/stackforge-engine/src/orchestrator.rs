//! The generation pipeline.
//!
//! `generate` runs, in order: batch validation, tool probing through the
//! cache, output backup, the worker pool, relocation into the final layout,
//! structure validation and cleanup. Any component failure or relocation
//! failure rolls the filesystem back and marks the report failed.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use stackforge_config::{ComponentSpec, Config, MAX_WORKERS, MapMode};
use stackforge_runner::CancellationToken;
use stackforge_toolcache::{ToolCache, ToolCacheManager, ToolProbe};
use stackforge_utils::error::GenerationError;
use stackforge_utils::logging::{component_span, log_component_complete, log_component_start};
use stackforge_utils::paths::{backups_dir, ensure_dir_all};
use stackforge_utils::types::{ComponentResult, ComponentType, GenerationMethod, GenerationReport};

use crate::decision::DecisionEngine;
use crate::generator::{GenerationContext, GeneratorRegistry};
use crate::pool::{PoolConfig, WorkerPool};
use crate::rollback::RollbackManager;
use crate::strategy::{StrategyInputs, StrategyReason, missing_tools, select_strategy};
use crate::structure::{MapOptions, StructureMapper, canonical_path};

/// Scratch area inside the output directory
pub const STAGING_DIR: &str = ".stackforge";

/// Run-wide settings, usually resolved from [`Config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorOptions {
    pub prefer_external_tools: bool,
    /// Forced or detected offline; resolved by the caller
    pub offline: bool,
    pub parallel: bool,
    pub max_workers: usize,
    pub backup: bool,
    pub keep_backup: bool,
    pub map_mode: MapMode,
    pub verbose: bool,
    pub backup_root: Utf8PathBuf,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            prefer_external_tools: true,
            offline: false,
            parallel: true,
            max_workers: MAX_WORKERS,
            backup: true,
            keep_backup: false,
            map_mode: MapMode::default(),
            verbose: false,
            backup_root: backups_dir(),
        }
    }
}

impl OrchestratorOptions {
    #[must_use]
    pub fn from_config(config: &Config, offline: bool) -> Self {
        Self {
            prefer_external_tools: config.prefer_external_tools(),
            offline,
            parallel: config.parallel(),
            max_workers: config.max_workers(),
            backup: config.backup(),
            keep_backup: config.keep_backup(),
            map_mode: config.map_mode(),
            verbose: config.verbose(),
            backup_root: backups_dir(),
        }
    }

    const fn strategy_inputs(&self) -> StrategyInputs {
        StrategyInputs {
            prefer_external_tools: self.prefer_external_tools,
            offline: self.offline,
        }
    }

    fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            parallel: self.parallel,
            max_workers: self.max_workers.clamp(1, MAX_WORKERS),
        }
    }
}

/// Dry-run view of one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentPreview {
    pub name: String,
    pub component_type: ComponentType,
    /// `None` when no strategy is available
    pub method: Option<GenerationMethod>,
    pub reason: Option<StrategyReason>,
    pub required_tools: Vec<String>,
    pub missing_tools: Vec<String>,
    pub target_path: Utf8PathBuf,
    pub expected_files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<GenerationError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewReport {
    pub output_dir: Utf8PathBuf,
    pub components: Vec<ComponentPreview>,
    pub warnings: Vec<String>,
}

impl PreviewReport {
    /// True when every component has a strategy.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.components.iter().all(|c| c.error.is_none())
    }
}

pub struct Orchestrator {
    options: OrchestratorOptions,
    registry: GeneratorRegistry,
    manager: ToolCacheManager,
    probe: Arc<dyn ToolProbe>,
    mapper: StructureMapper,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("options", &self.options)
            .field("registry", &self.registry)
            .field("mapper", &self.mapper)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        options: OrchestratorOptions,
        registry: GeneratorRegistry,
        cache: Arc<ToolCache>,
        probe: Arc<dyn ToolProbe>,
    ) -> Self {
        Self {
            options,
            registry,
            manager: ToolCacheManager::new(cache),
            probe,
            mapper: StructureMapper::new(),
        }
    }

    #[must_use]
    pub fn with_mapper(mut self, mapper: StructureMapper) -> Self {
        self.mapper = mapper;
        self
    }

    #[must_use]
    pub const fn options(&self) -> &OrchestratorOptions {
        &self.options
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<ToolCache> {
        self.manager.cache()
    }

    /// Generate every enabled component of `specs` into `output_dir`.
    ///
    /// Never returns an error; failures are carried by the report.
    pub fn generate(
        &self,
        specs: &[ComponentSpec],
        output_dir: &Utf8Path,
        cancel: &CancellationToken,
    ) -> GenerationReport {
        let started = Instant::now();
        let mut report = GenerationReport {
            success: false,
            components: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            duration: std::time::Duration::ZERO,
            output_dir: output_dir.to_owned(),
            backup_path: None,
            rollback: None,
            started_at: Utc::now(),
        };

        let enabled: Vec<ComponentSpec> = specs.iter().filter(|s| s.enabled).cloned().collect();
        if enabled.is_empty() {
            report.success = true;
            report.warnings.push("no enabled components; nothing to generate".to_string());
            return finish(report, started);
        }
        if let Err(err) = check_unique_names(&enabled) {
            report.errors.push(err);
            return finish(report, started);
        }

        self.probe_tools(&enabled, &mut report.warnings);

        let timestamp = report.started_at.format("%Y%m%d-%H%M%S-%3f").to_string();
        let mut rollback = RollbackManager::new(output_dir, &self.options.backup_root);
        if let Err(err) = rollback.snapshot(&timestamp, self.options.backup) {
            report.errors.push(err);
            return finish(report, started);
        }
        report.backup_path = rollback.backup_path().map(Utf8Path::to_owned);

        let staging_root = output_dir.join(STAGING_DIR);
        let staging = staging_root.join("staging").join(&timestamp);
        let staging_root_is_new = !staging_root.exists();
        if let Err(e) = ensure_dir_all(&staging) {
            report.errors.push(
                GenerationError::structure_mapping(format!("could not create staging directory {staging}"))
                    .with_cause(e),
            );
            report.rollback = Some(rollback.rollback());
            return finish(report, started);
        }
        rollback.register_temp_dir(if staging_root_is_new { &staging_root } else { &staging });

        let ctx = GenerationContext::new(&staging, cancel.clone()).with_verbose(self.options.verbose);
        let pool = WorkerPool::new(self.options.pool_config());
        let outcome = pool.run(&enabled, |_, spec| self.run_component(spec, &ctx));

        for index in &outcome.skipped {
            report.warnings.push(format!(
                "component '{}' was not generated because an earlier component failed",
                enabled[*index].name
            ));
        }
        let all_succeeded = outcome.all_succeeded();
        report.components = outcome.into_completed();
        report
            .errors
            .extend(report.components.iter().filter_map(|r| r.error.clone()));

        if !all_succeeded {
            report.rollback = Some(rollback.rollback());
            return finish(report, started);
        }

        if let Err(err) = self.relocate(&enabled, output_dir, &mut report) {
            report.errors.push(err);
            report.rollback = Some(rollback.rollback());
            return finish(report, started);
        }

        let layout: Vec<_> = enabled
            .iter()
            .zip(suffixes(&enabled))
            .map(|(spec, suffix)| (spec.component_type, canonical_path(spec.component_type, suffix.as_deref())))
            .collect();
        report.warnings.extend(self.mapper.validate(output_dir, &layout));

        if self.options.map_mode == MapMode::Symlink {
            // components link into staging
            for dir in rollback.release_temp_dirs() {
                report.warnings.push(format!("staging directory {dir} kept for symlinked components"));
            }
        }
        report.warnings.extend(rollback.cleanup(self.options.keep_backup));
        if !self.options.keep_backup {
            report.backup_path = None;
        }

        report.success = true;
        finish(report, started)
    }

    /// Strategy and expected output per enabled component, without probing,
    /// executing or writing anything.
    #[must_use]
    pub fn preview(&self, specs: &[ComponentSpec], output_dir: &Utf8Path) -> PreviewReport {
        let enabled: Vec<ComponentSpec> = specs.iter().filter(|s| s.enabled).cloned().collect();
        let mut warnings = Vec::new();
        if enabled.is_empty() {
            warnings.push("no enabled components; nothing to generate".to_string());
        }
        if let Err(err) = check_unique_names(&enabled) {
            warnings.push(err.to_string());
        }

        let cache = self.manager.cache();
        let components = enabled
            .iter()
            .zip(suffixes(&enabled))
            .map(|(spec, suffix)| {
                let ty = spec.component_type;
                let mut preview = ComponentPreview {
                    name: spec.name.clone(),
                    component_type: ty,
                    method: None,
                    reason: None,
                    required_tools: ty.required_tools().iter().map(ToString::to_string).collect(),
                    missing_tools: missing_tools(ty, cache),
                    target_path: output_dir.join(canonical_path(ty, suffix.as_deref())),
                    expected_files: Vec::new(),
                    error: None,
                };
                if let Err(e) = spec.validate() {
                    preview.error = Some(GenerationError::from_config(&spec.name, &e));
                    return preview;
                }
                match select_strategy(ty, self.options.strategy_inputs(), cache, self.registry.has_fallback(ty)) {
                    Ok(decision) => {
                        preview.expected_files = match decision.method {
                            GenerationMethod::Bootstrap => self
                                .registry
                                .bootstrap(ty)
                                .map(|e| e.expected_files(spec))
                                .unwrap_or_default(),
                            GenerationMethod::Fallback => self
                                .registry
                                .fallback(ty)
                                .map(|g| g.expected_files(spec))
                                .unwrap_or_default(),
                        };
                        preview.method = Some(decision.method);
                        preview.reason = Some(decision.reason);
                    }
                    Err(err) => preview.error = Some(err.with_component(&spec.name)),
                }
                preview
            })
            .collect();

        PreviewReport {
            output_dir: output_dir.to_owned(),
            components,
            warnings,
        }
    }

    /// Probe-on-miss for every tool the batch needs, then persist.
    fn probe_tools(&self, enabled: &[ComponentSpec], warnings: &mut Vec<String>) {
        if self.options.offline || !self.options.prefer_external_tools {
            tracing::debug!(
                offline = self.options.offline,
                prefer_external_tools = self.options.prefer_external_tools,
                "Skipping tool probes"
            );
            return;
        }
        let tools: BTreeSet<&str> = enabled
            .iter()
            .flat_map(|s| s.component_type.required_tools().iter().copied())
            .collect();
        let tools: Vec<&str> = tools.into_iter().collect();

        let summary = self.manager.ensure(self.probe.as_ref(), &tools);
        for failure in &summary.failed {
            warnings.push(failure.to_string());
        }
        if summary.changed()
            && let Err(e) = self.manager.cache().save()
        {
            warnings.push(format!("could not save tool cache: {e}"));
        }
        stackforge_utils::logging::log_cache_stats(&self.manager.cache().stats());
    }

    /// One pool job: strategy selection and the decision engine.
    fn run_component(&self, spec: &ComponentSpec, ctx: &GenerationContext) -> ComponentResult {
        let span = component_span(spec.component_type.as_str(), &spec.name);
        let _guard = span.enter();
        log_component_start(spec.component_type.as_str(), &spec.name);
        let started = Instant::now();

        let early_failure = |err: GenerationError| {
            let mut result = ComponentResult::pending(spec.component_type, &spec.name);
            result.error = Some(err.with_component(&spec.name));
            result.duration = started.elapsed();
            result
        };

        let result = if ctx.cancel.is_cancelled() {
            early_failure(GenerationError::canceled(format!(
                "generation of '{}' was canceled before it started",
                spec.name
            )))
        } else if let Err(e) = spec.validate() {
            early_failure(GenerationError::from_config(&spec.name, &e))
        } else {
            let ty = spec.component_type;
            match select_strategy(
                ty,
                self.options.strategy_inputs(),
                self.manager.cache(),
                self.registry.has_fallback(ty),
            ) {
                Ok(decision) => {
                    tracing::info!(
                        method = %decision.method,
                        reason = %decision.reason,
                        missing = ?decision.missing_tools,
                        "Selected generation strategy"
                    );
                    DecisionEngine::new(&self.registry)
                        .run(spec, decision.method, ctx)
                        .result
                }
                Err(err) => early_failure(err),
            }
        };

        log_component_complete(&result);
        result
    }

    /// Move every generated component into its canonical directory.
    fn relocate(
        &self,
        enabled: &[ComponentSpec],
        output_dir: &Utf8Path,
        report: &mut GenerationReport,
    ) -> Result<(), GenerationError> {
        let options = MapOptions::new(self.options.map_mode);
        for ((spec, suffix), result) in enabled
            .iter()
            .zip(suffixes(enabled))
            .zip(report.components.iter_mut())
        {
            let Some(source) = result.output_path.clone() else {
                return Err(GenerationError::structure_mapping(format!(
                    "component '{}' reported no output directory",
                    spec.name
                ))
                .with_component(&spec.name));
            };
            let options = match suffix {
                Some(s) => options.clone().with_suffix(s),
                None => options.clone(),
            };
            let dest = self
                .mapper
                .map(&source, output_dir, spec.component_type, &options)
                .map_err(|e| e.with_component(&spec.name))?;
            report.warnings.extend(self.mapper.run_hooks(&source, &dest));
            result.output_path = Some(dest);
        }
        Ok(())
    }
}

/// Per-component canonical-dir suffix: the component name when its type is
/// shared with another enabled component.
fn suffixes(enabled: &[ComponentSpec]) -> Vec<Option<String>> {
    let mut counts: HashMap<ComponentType, usize> = HashMap::new();
    for spec in enabled {
        *counts.entry(spec.component_type).or_default() += 1;
    }
    enabled
        .iter()
        .map(|s| (counts[&s.component_type] > 1).then(|| s.name.clone()))
        .collect()
}

fn check_unique_names(enabled: &[ComponentSpec]) -> Result<(), GenerationError> {
    let mut seen = HashSet::new();
    for spec in enabled {
        if !seen.insert(spec.name.as_str()) {
            return Err(GenerationError::validation(format!(
                "component name '{}' is used more than once",
                spec.name
            ))
            .with_component(&spec.name)
            .with_suggestion("Give every component a unique name"));
        }
    }
    Ok(())
}

fn finish(mut report: GenerationReport, started: Instant) -> GenerationReport {
    report.duration = started.elapsed();
    tracing::info!(
        success = report.success,
        succeeded = report.succeeded_count(),
        failed = report.failed_count(),
        warnings = report.warnings.len(),
        duration_ms = %report.duration.as_millis(),
        "Generation finished"
    );
    report
}
