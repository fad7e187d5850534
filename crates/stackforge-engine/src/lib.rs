//! Generation orchestration engine for stackforge
//!
//! Turns a batch of component specs into a project tree:
//!
//! - [`select_strategy`]: bootstrap (external tool) or fallback (embedded templates)
//! - [`DecisionEngine`]: per-component retry / fallback state machine
//! - [`WorkerPool`]: bounded parallel execution with input-ordered results
//! - [`RollbackManager`]: backup, scratch-dir tracking and restore
//! - [`StructureMapper`]: relocation into the canonical layout and checks
//! - [`Orchestrator`]: the pipeline tying these together, plus dry-run preview

pub mod bootstrap;
pub mod decision;
pub mod generator;
pub mod orchestrator;
pub mod pool;
pub mod rollback;
pub mod strategy;
pub mod structure;
pub mod templates;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use bootstrap::{ToolBootstrapper, expected_files_for};
pub use decision::{
    ComponentRun, Decision, DecisionEngine, ErrorContext, GenerationState, MAX_BOOTSTRAP_ATTEMPTS,
    decide,
};
pub use generator::{
    BootstrapExecutor, BootstrapOutcome, FallbackGenerator, FallbackOutcome, GenerationContext,
    GeneratorRegistry,
};
pub use orchestrator::{
    ComponentPreview, Orchestrator, OrchestratorOptions, PreviewReport, STAGING_DIR,
};
pub use pool::{PoolConfig, PoolOutcome, WorkerPool};
pub use rollback::{PriorState, RollbackManager};
pub use strategy::{StrategyDecision, StrategyInputs, StrategyReason, select_strategy};
pub use structure::{EnvReferenceRewriter, MapOptions, PostMapHook, StructureMapper, canonical_path};
pub use templates::TemplateFallback;
