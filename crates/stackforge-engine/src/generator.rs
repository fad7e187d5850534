//! Generator capability traits and the registry keyed by component type.
//!
//! A component is produced either by a [`BootstrapExecutor`] (an external
//! platform tool) or a [`FallbackGenerator`] (embedded boilerplate). The
//! engine never compares type strings; it asks the [`GeneratorRegistry`].

use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use stackforge_config::ComponentSpec;
use stackforge_runner::{CancellationToken, ProcessRunner, StreamLine};
use stackforge_utils::error::GenerationError;
use stackforge_utils::types::ComponentType;

use crate::bootstrap::ToolBootstrapper;
use crate::templates::TemplateFallback;

/// Per-run state shared by every generator invocation.
#[derive(Debug, Clone)]
pub struct GenerationContext {
    /// Scratch root; each component writes into `<staging_dir>/<name>`
    pub staging_dir: Utf8PathBuf,
    pub cancel: CancellationToken,
    /// Forward tool output line by line
    pub verbose: bool,
}

impl GenerationContext {
    #[must_use]
    pub fn new(staging_dir: impl Into<Utf8PathBuf>, cancel: CancellationToken) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            cancel,
            verbose: false,
        }
    }

    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Where `spec`'s generator must leave its output.
    #[must_use]
    pub fn component_dir(&self, spec: &ComponentSpec) -> Utf8PathBuf {
        self.staging_dir.join(&spec.name)
    }
}

/// What a bootstrap tool run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapOutcome {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub output_dir: Utf8PathBuf,
    /// Program that produced the output, e.g. `npx`
    pub tool: String,
    pub manual_steps: Vec<String>,
}

/// What an embedded generator produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackOutcome {
    pub output_path: Utf8PathBuf,
    /// Follow-up the user must do by hand; never empty for embedded templates
    pub manual_steps: Vec<String>,
    pub warnings: Vec<String>,
}

/// Produces a component by running an installed platform tool.
pub trait BootstrapExecutor: Send + Sync {
    fn component_type(&self) -> ComponentType;

    fn supports(&self, component_type: ComponentType) -> bool {
        component_type == self.component_type()
    }

    /// Flags always passed to the tool, before spec-derived ones.
    fn default_flags(&self) -> Vec<String>;

    /// Reject a spec this executor cannot handle. Failures are validation
    /// errors and never retried.
    fn validate_config(&self, spec: &ComponentSpec) -> Result<(), GenerationError>;

    fn execute(
        &self,
        spec: &ComponentSpec,
        ctx: &GenerationContext,
    ) -> Result<BootstrapOutcome, GenerationError>;

    /// Like [`BootstrapExecutor::execute`], forwarding tool output to `sink`.
    fn execute_streaming(
        &self,
        spec: &ComponentSpec,
        ctx: &GenerationContext,
        sink: &mut dyn FnMut(StreamLine),
    ) -> Result<BootstrapOutcome, GenerationError> {
        let _ = sink;
        self.execute(spec, ctx)
    }

    /// Key files the tool is expected to create, relative to the component dir.
    fn expected_files(&self, spec: &ComponentSpec) -> Vec<String>;
}

/// Produces a component by writing embedded boilerplate.
pub trait FallbackGenerator: Send + Sync {
    fn component_type(&self) -> ComponentType;

    fn supports(&self, component_type: ComponentType) -> bool {
        component_type == self.component_type()
    }

    fn validate_config(&self, spec: &ComponentSpec) -> Result<(), GenerationError>;

    fn generate(
        &self,
        spec: &ComponentSpec,
        ctx: &GenerationContext,
    ) -> Result<FallbackOutcome, GenerationError>;

    fn expected_files(&self, spec: &ComponentSpec) -> Vec<String>;
}

/// Generators available to a run, at most one of each kind per type.
///
/// Constructed explicitly so a run (or a test) decides which types have a
/// fallback at all.
#[derive(Clone, Default)]
pub struct GeneratorRegistry {
    bootstrap: HashMap<ComponentType, Arc<dyn BootstrapExecutor>>,
    fallback: HashMap<ComponentType, Arc<dyn FallbackGenerator>>,
}

impl GeneratorRegistry {
    /// Registry with nothing registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tool bootstrappers and embedded templates for every component type.
    #[must_use]
    pub fn with_defaults(runner: Arc<dyn ProcessRunner>) -> Self {
        let mut registry = Self::new();
        for ty in ComponentType::ALL {
            registry.register_bootstrap(Arc::new(ToolBootstrapper::new(ty, Arc::clone(&runner))));
            registry.register_fallback(Arc::new(TemplateFallback::new(ty)));
        }
        registry
    }

    /// Register `executor` for its type, replacing any previous one.
    pub fn register_bootstrap(&mut self, executor: Arc<dyn BootstrapExecutor>) -> &mut Self {
        self.bootstrap.insert(executor.component_type(), executor);
        self
    }

    /// Register `generator` for its type, replacing any previous one.
    pub fn register_fallback(&mut self, generator: Arc<dyn FallbackGenerator>) -> &mut Self {
        self.fallback.insert(generator.component_type(), generator);
        self
    }

    pub fn remove_fallback(&mut self, component_type: ComponentType) -> &mut Self {
        self.fallback.remove(&component_type);
        self
    }

    #[must_use]
    pub fn bootstrap(&self, component_type: ComponentType) -> Option<&Arc<dyn BootstrapExecutor>> {
        self.bootstrap
            .get(&component_type)
            .filter(|e| e.supports(component_type))
    }

    #[must_use]
    pub fn fallback(&self, component_type: ComponentType) -> Option<&Arc<dyn FallbackGenerator>> {
        self.fallback
            .get(&component_type)
            .filter(|g| g.supports(component_type))
    }

    #[must_use]
    pub fn has_fallback(&self, component_type: ComponentType) -> bool {
        self.fallback(component_type).is_some()
    }
}

impl fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bootstrap: Vec<_> = self.bootstrap.keys().map(ComponentType::as_str).collect();
        let mut fallback: Vec<_> = self.fallback.keys().map(ComponentType::as_str).collect();
        bootstrap.sort_unstable();
        fallback.sort_unstable();
        f.debug_struct("GeneratorRegistry")
            .field("bootstrap", &bootstrap)
            .field("fallback", &fallback)
            .finish()
    }
}

/// Remove a partially written component directory so the next attempt
/// starts clean.
pub(crate) fn clear_component_dir(dir: &Utf8Path) -> Result<(), GenerationError> {
    stackforge_utils::paths::remove_dir_if_exists(dir)
        .map(|_| ())
        .map_err(|e| {
            GenerationError::tool_execution(format!("could not clear {dir}"))
                .with_cause(e)
        })
}
