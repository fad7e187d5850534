//! Retry / fallback decision engine.
//!
//! Per component: `Init -> Bootstrapping -> {Retrying, FallingBack,
//! Succeeded, Failed}`. Bootstrap gets at most [`MAX_BOOTSTRAP_ATTEMPTS`]
//! attempts and only retryable categories earn a second one. Fallback runs
//! exactly once and its failure is terminal.

use serde::Serialize;
use std::fmt;
use std::time::Instant;

use stackforge_config::ComponentSpec;
use stackforge_utils::error::GenerationError;
use stackforge_utils::types::{ComponentResult, GenerationMethod};

use crate::bootstrap::log_stream_line;
use crate::generator::{GenerationContext, GeneratorRegistry, clear_component_dir};

/// Total bootstrap attempts per component, first try included
pub const MAX_BOOTSTRAP_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationState {
    Init,
    Bootstrapping,
    Retrying,
    FallingBack,
    Succeeded,
    Failed,
}

impl GenerationState {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Whether the state machine allows `self -> next`.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        use GenerationState::{Bootstrapping, FallingBack, Failed, Init, Retrying, Succeeded};
        matches!(
            (self, next),
            (Init, Bootstrapping | FallingBack | Failed)
                | (Bootstrapping | Retrying, Retrying | FallingBack | Succeeded | Failed)
                | (FallingBack, Succeeded | Failed)
        )
    }
}

impl fmt::Display for GenerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Init => "init",
            Self::Bootstrapping => "bootstrapping",
            Self::Retrying => "retrying",
            Self::FallingBack => "falling_back",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        })
    }
}

/// Where a component's retry loop stands when an attempt fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    pub operation: String,
    pub component: String,
    pub phase: GenerationState,
    pub attempt_number: u32,
    /// Another bootstrap attempt is allowed by the attempt ceiling
    pub can_retry: bool,
    /// A fallback generator is registered for the component type
    pub can_fallback: bool,
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Retry,
    Fallback,
    Fail,
}

/// Classify a failed attempt.
///
/// Retry needs a retryable category and headroom under the ceiling. Otherwise
/// fallback needs a category that permits it and a registered generator.
/// A failure while already falling back is always terminal.
#[must_use]
pub fn decide(error: &GenerationError, ctx: &ErrorContext) -> Decision {
    if ctx.phase == GenerationState::FallingBack {
        return Decision::Fail;
    }
    if error.category.is_retryable() && ctx.can_retry {
        Decision::Retry
    } else if error.category.allows_fallback() && ctx.can_fallback {
        Decision::Fallback
    } else {
        Decision::Fail
    }
}

/// Record of one component run, for logging and tests.
#[derive(Debug, Clone)]
pub struct ComponentRun {
    pub result: ComponentResult,
    pub transitions: Vec<GenerationState>,
    pub bootstrap_attempts: u32,
}

/// Drives one component from its selected strategy to a terminal state.
#[derive(Debug, Clone, Copy)]
pub struct DecisionEngine<'a> {
    registry: &'a GeneratorRegistry,
}

struct Machine {
    state: GenerationState,
    transitions: Vec<GenerationState>,
}

impl Machine {
    fn new() -> Self {
        Self {
            state: GenerationState::Init,
            transitions: vec![GenerationState::Init],
        }
    }

    fn go(&mut self, component: &str, next: GenerationState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {next}",
            self.state
        );
        tracing::debug!(component = %component, from = %self.state, to = %next, "State transition");
        self.state = next;
        self.transitions.push(next);
    }
}

impl<'a> DecisionEngine<'a> {
    #[must_use]
    pub const fn new(registry: &'a GeneratorRegistry) -> Self {
        Self { registry }
    }

    /// Run `spec` starting with `method`.
    ///
    /// Never panics on generator failure; every outcome becomes a
    /// [`ComponentResult`]. `method` on the result is the method that produced
    /// it or, on failure, the last method attempted.
    #[must_use]
    pub fn run(
        &self,
        spec: &ComponentSpec,
        method: GenerationMethod,
        ctx: &GenerationContext,
    ) -> ComponentRun {
        let started = Instant::now();
        let mut machine = Machine::new();
        let mut result = ComponentResult::pending(spec.component_type, &spec.name);
        let mut attempts = 0;

        let outcome = self.drive(spec, method, ctx, &mut machine, &mut result, &mut attempts);
        match outcome {
            Ok(()) => {
                result.success = true;
                result.error = None;
            }
            Err(err) => {
                result.success = false;
                result.error = Some(err);
            }
        }
        result.duration = started.elapsed();

        ComponentRun {
            result,
            transitions: machine.transitions,
            bootstrap_attempts: attempts,
        }
    }

    fn drive(
        &self,
        spec: &ComponentSpec,
        method: GenerationMethod,
        ctx: &GenerationContext,
        machine: &mut Machine,
        result: &mut ComponentResult,
        attempts: &mut u32,
    ) -> Result<(), GenerationError> {
        let fallback = self.registry.fallback(spec.component_type);

        if method == GenerationMethod::Fallback {
            let Some(generator) = fallback else {
                machine.go(&spec.name, GenerationState::Failed);
                return Err(GenerationError::fallback_unavailable(format!(
                    "no embedded generator registered for {}",
                    spec.component_type
                ))
                .with_component(&spec.name));
            };
            if let Err(e) = generator.validate_config(spec) {
                machine.go(&spec.name, GenerationState::Failed);
                return Err(e);
            }
            machine.go(&spec.name, GenerationState::FallingBack);
            return self.fall_back(spec, ctx, machine, result);
        }

        let Some(executor) = self.registry.bootstrap(spec.component_type) else {
            // no bootstrap executor behaves like a missing tool
            let err = GenerationError::tool_not_found(spec.component_type.required_tools().join(", ").as_str())
                .with_component(&spec.name);
            return self.after_bootstrap_failure(err, 0, spec, ctx, machine, result);
        };
        if let Err(e) = executor.validate_config(spec) {
            machine.go(&spec.name, GenerationState::Failed);
            return Err(e);
        }

        machine.go(&spec.name, GenerationState::Bootstrapping);
        result.method = Some(GenerationMethod::Bootstrap);
        let component_dir = ctx.component_dir(spec);

        loop {
            *attempts += 1;
            let attempt = *attempts;
            let outcome = if ctx.cancel.is_cancelled() {
                Err(GenerationError::canceled(format!(
                    "generation of '{}' was canceled",
                    spec.name
                ))
                .with_component(&spec.name))
            } else if ctx.verbose {
                executor.execute_streaming(spec, ctx, &mut |line| log_stream_line(&spec.name, &line))
            } else {
                executor.execute(spec, ctx)
            };

            let err = match outcome {
                Ok(done) if done.success => {
                    result.tool_used = Some(done.tool);
                    result.output_path = Some(done.output_dir);
                    result.manual_steps = done.manual_steps;
                    machine.go(&spec.name, GenerationState::Succeeded);
                    return Ok(());
                }
                Ok(done) => GenerationError::tool_execution(format!(
                    "{} reported failure (exit code {:?})",
                    done.tool, done.exit_code
                ))
                .with_component(&spec.name),
                Err(e) => e,
            };

            tracing::warn!(
                component = %spec.name,
                attempt,
                category = %err.category,
                error = %err,
                "Bootstrap attempt failed"
            );

            let error_ctx = ErrorContext {
                operation: "bootstrap".to_string(),
                component: spec.name.clone(),
                phase: machine.state,
                attempt_number: attempt,
                can_retry: attempt < MAX_BOOTSTRAP_ATTEMPTS,
                can_fallback: fallback.is_some(),
            };
            if decide(&err, &error_ctx) == Decision::Retry {
                if let Err(clear) = clear_component_dir(&component_dir) {
                    tracing::warn!(component = %spec.name, error = %clear, "Could not clear partial output");
                }
                machine.go(&spec.name, GenerationState::Retrying);
                continue;
            }
            return self.after_bootstrap_failure(err, attempt, spec, ctx, machine, result);
        }
    }

    fn after_bootstrap_failure(
        &self,
        err: GenerationError,
        attempt: u32,
        spec: &ComponentSpec,
        ctx: &GenerationContext,
        machine: &mut Machine,
        result: &mut ComponentResult,
    ) -> Result<(), GenerationError> {
        let can_fallback = self.registry.has_fallback(spec.component_type);
        let error_ctx = ErrorContext {
            operation: "bootstrap".to_string(),
            component: spec.name.clone(),
            phase: machine.state,
            attempt_number: attempt,
            can_retry: false,
            can_fallback,
        };
        if decide(&err, &error_ctx) != Decision::Fallback {
            machine.go(&spec.name, GenerationState::Failed);
            return Err(err);
        }

        if let Err(clear) = clear_component_dir(&ctx.component_dir(spec)) {
            tracing::warn!(component = %spec.name, error = %clear, "Could not clear partial output");
        }
        result.warnings.push(format!(
            "bootstrap failed ({}): {err}; used embedded templates instead",
            err.category
        ));
        machine.go(&spec.name, GenerationState::FallingBack);
        self.fall_back(spec, ctx, machine, result)
    }

    fn fall_back(
        &self,
        spec: &ComponentSpec,
        ctx: &GenerationContext,
        machine: &mut Machine,
        result: &mut ComponentResult,
    ) -> Result<(), GenerationError> {
        result.method = Some(GenerationMethod::Fallback);
        result.tool_used = None;

        let Some(generator) = self.registry.fallback(spec.component_type) else {
            machine.go(&spec.name, GenerationState::Failed);
            return Err(GenerationError::fallback_unavailable(format!(
                "no embedded generator registered for {}",
                spec.component_type
            ))
            .with_component(&spec.name));
        };

        if ctx.cancel.is_cancelled() {
            machine.go(&spec.name, GenerationState::Failed);
            return Err(GenerationError::canceled(format!(
                "generation of '{}' was canceled",
                spec.name
            ))
            .with_component(&spec.name));
        }

        match generator.generate(spec, ctx) {
            Ok(outcome) => {
                result.output_path = Some(outcome.output_path);
                result.manual_steps = outcome.manual_steps;
                result.warnings.extend(outcome.warnings);
                machine.go(&spec.name, GenerationState::Succeeded);
                Ok(())
            }
            Err(err) => {
                machine.go(&spec.name, GenerationState::Failed);
                Err(err)
            }
        }
    }
}
