//! stackforge - multi-component project scaffolding
//!
//! Generates a project made of several components (Next.js frontend, Go
//! backend, Android and iOS apps) in one run. Each component is produced by
//! its platform tool when installed and from embedded templates otherwise;
//! any failure rolls the output directory back to its prior state.
//!
//! # Quick Start (CLI)
//!
//! ```bash
//! stackforge preview
//! stackforge generate --output-dir ./acme
//! stackforge doctor --json
//! ```
//!
//! # Quick Start (Library)
//!
//! ```rust,no_run
//! use camino::Utf8Path;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use stackforge::{
//!     CancellationToken, ComponentSpec, ComponentType, GeneratorRegistry, NativeRunner,
//!     Orchestrator, OrchestratorOptions, SystemToolProbe, ToolCache,
//! };
//!
//! let cache = Arc::new(ToolCache::in_memory(Duration::from_secs(300)));
//! let registry = GeneratorRegistry::with_defaults(Arc::new(NativeRunner::new()));
//! let orchestrator = Orchestrator::new(
//!     OrchestratorOptions::default(),
//!     registry,
//!     cache,
//!     Arc::new(SystemToolProbe::new()),
//! );
//! let specs = vec![ComponentSpec::new(ComponentType::GoBackend, "api")];
//! let report = orchestrator.generate(&specs, Utf8Path::new("./acme"), &CancellationToken::new());
//! println!("success: {}", report.success);
//! ```
//!
//! # Crates
//!
//! - `stackforge-engine`: strategy selection, retry/fallback, worker pool,
//!   rollback, structure mapping and the orchestrator
//! - `stackforge-toolcache`: TTL cache of tool probe results
//! - `stackforge-config`: layered configuration
//! - `stackforge-doctor`: tool probing and environment checks
//! - `stackforge-runner`: external process execution
//! - `stackforge-utils`: shared types, errors, exit codes, logging

pub mod cli;

pub use stackforge_config::{CliArgs, ComponentOptions, ComponentSpec, Config, MapMode};
pub use stackforge_doctor::{DoctorCommand, OfflineDetector, SystemToolProbe};
pub use stackforge_engine::{
    GeneratorRegistry, Orchestrator, OrchestratorOptions, PreviewReport, StructureMapper,
    TemplateFallback,
};
pub use stackforge_runner::{CancellationToken, NativeRunner, ProcessRunner};
pub use stackforge_toolcache::{
    CacheExporter, CacheValidator, ToolCache, ToolCacheManager, ToolProbe,
};
pub use stackforge_utils::error::{
    CacheError, ConfigError, ErrorCategory, GenerationError, StackforgeError, UserFriendlyError,
};
pub use stackforge_utils::exit_codes::ExitCode;
pub use stackforge_utils::types::{
    ComponentResult, ComponentType, GenerationMethod, GenerationReport, RollbackSummary,
};
