//! Scripted generators for exercising the engine without real tools.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use stackforge_config::ComponentSpec;
use stackforge_utils::atomic_write::write_file_atomic;
use stackforge_utils::error::GenerationError;
use stackforge_utils::types::ComponentType;

use crate::bootstrap::expected_files_for;
use crate::generator::{
    BootstrapExecutor, BootstrapOutcome, FallbackGenerator, FallbackOutcome, GenerationContext,
};

fn write_expected(spec: &ComponentSpec, ctx: &GenerationContext) -> Result<(), GenerationError> {
    let dir = ctx.component_dir(spec);
    for file in expected_files_for(spec) {
        write_file_atomic(&dir.join(&file), &format!("// {file}\n"))
            .map_err(|e| GenerationError::tool_execution(format!("could not write {file}")).with_cause(e))?;
    }
    Ok(())
}

/// Bootstrap executor that replays a script of failures, then succeeds.
///
/// Each call pops the next scripted error; once the script is empty every call
/// succeeds and writes the component's expected files.
#[derive(Debug)]
pub struct ScriptedExecutor {
    component_type: ComponentType,
    script: Mutex<VecDeque<GenerationError>>,
    calls: AtomicUsize,
    delay: Duration,
}

impl ScriptedExecutor {
    #[must_use]
    pub fn new(component_type: ComponentType) -> Self {
        Self {
            component_type,
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    /// Queue a failure for the next unscripted call.
    #[must_use]
    pub fn then_fail(self, error: GenerationError) -> Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(error);
        self
    }

    /// Fail every call with `error`.
    #[must_use]
    pub fn always_fail(self, error: GenerationError) -> Self {
        (0..8).fold(self, |exec, _| exec.then_fail(error.clone()))
    }

    /// Sleep before each call; cancellation is observed after the sleep.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl BootstrapExecutor for ScriptedExecutor {
    fn component_type(&self) -> ComponentType {
        self.component_type
    }

    fn default_flags(&self) -> Vec<String> {
        Vec::new()
    }

    fn validate_config(&self, spec: &ComponentSpec) -> Result<(), GenerationError> {
        spec.validate()
            .map_err(|e| GenerationError::from_config(&spec.name, &e))
    }

    fn execute(
        &self,
        spec: &ComponentSpec,
        ctx: &GenerationContext,
    ) -> Result<BootstrapOutcome, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if ctx.cancel.is_cancelled() {
            return Err(GenerationError::canceled("scripted bootstrap canceled"));
        }
        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        if let Some(error) = next {
            // leave partial output behind like a real tool would
            let _ = write_file_atomic(&ctx.component_dir(spec).join("partial.txt"), "partial\n");
            return Err(error);
        }

        write_expected(spec, ctx)?;
        Ok(BootstrapOutcome {
            success: true,
            exit_code: Some(0),
            output_dir: ctx.component_dir(spec),
            tool: "scripted".to_string(),
            manual_steps: Vec::new(),
        })
    }

    fn expected_files(&self, spec: &ComponentSpec) -> Vec<String> {
        expected_files_for(spec)
    }
}

/// Fallback generator with a fixed outcome.
#[derive(Debug)]
pub struct StaticFallback {
    component_type: ComponentType,
    failure: Option<GenerationError>,
    calls: AtomicUsize,
}

impl StaticFallback {
    #[must_use]
    pub const fn new(component_type: ComponentType) -> Self {
        Self {
            component_type,
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn failing(mut self, error: GenerationError) -> Self {
        self.failure = Some(error);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FallbackGenerator for StaticFallback {
    fn component_type(&self) -> ComponentType {
        self.component_type
    }

    fn validate_config(&self, spec: &ComponentSpec) -> Result<(), GenerationError> {
        spec.validate()
            .map_err(|e| GenerationError::from_config(&spec.name, &e))
    }

    fn generate(
        &self,
        spec: &ComponentSpec,
        ctx: &GenerationContext,
    ) -> Result<FallbackOutcome, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        write_expected(spec, ctx)?;
        Ok(FallbackOutcome {
            output_path: ctx.component_dir(spec),
            manual_steps: vec![format!("Finish setting up {}", spec.name)],
            warnings: Vec::new(),
        })
    }

    fn expected_files(&self, spec: &ComponentSpec) -> Vec<String> {
        expected_files_for(spec)
    }
}
