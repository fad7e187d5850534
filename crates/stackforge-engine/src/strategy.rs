//! Per-component choice between bootstrap and fallback generation.
//!
//! Pure function of the inputs and the cache state at decision time. It runs
//! once per component; a failing bootstrap is handled by the decision engine,
//! never by re-selecting.

use serde::Serialize;
use std::fmt;

use stackforge_toolcache::ToolCache;
use stackforge_utils::error::GenerationError;
use stackforge_utils::types::{ComponentType, GenerationMethod};

/// Run-wide flags that feed every selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyInputs {
    pub prefer_external_tools: bool,
    /// Forced or detected offline
    pub offline: bool,
}

impl Default for StrategyInputs {
    fn default() -> Self {
        Self {
            prefer_external_tools: true,
            offline: false,
        }
    }
}

/// Which rule picked the strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyReason {
    Offline,
    ExternalToolsDisabled,
    ToolsAvailable,
    ToolsMissing,
}

impl fmt::Display for StrategyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Offline => "offline mode",
            Self::ExternalToolsDisabled => "external tools disabled",
            Self::ToolsAvailable => "all required tools available",
            Self::ToolsMissing => "required tools missing",
        })
    }
}

/// Outcome of [`select_strategy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyDecision {
    pub method: GenerationMethod,
    pub reason: StrategyReason,
    /// Required tools not cached as available
    pub missing_tools: Vec<String>,
}

/// Required tools for `component_type` that the cache does not report as
/// available (absent and expired entries count as missing).
#[must_use]
pub fn missing_tools(component_type: ComponentType, cache: &ToolCache) -> Vec<String> {
    component_type
        .required_tools()
        .iter()
        .filter(|tool| !cache.get(tool).is_some_and(|entry| entry.available))
        .map(|tool| (*tool).to_string())
        .collect()
}

/// Pick bootstrap or fallback for one component; first matching rule wins.
///
/// 1. offline: fallback
/// 2. external tools disabled: fallback
/// 3. every required tool cached as available: bootstrap
/// 4. otherwise: fallback
///
/// Every fallback outcome needs a registered fallback generator; without one
/// the component has no strategy and the error is `FallbackUnavailable`.
pub fn select_strategy(
    component_type: ComponentType,
    inputs: StrategyInputs,
    cache: &ToolCache,
    has_fallback: bool,
) -> Result<StrategyDecision, GenerationError> {
    let missing = missing_tools(component_type, cache);

    let reason = if inputs.offline {
        StrategyReason::Offline
    } else if !inputs.prefer_external_tools {
        StrategyReason::ExternalToolsDisabled
    } else if missing.is_empty() {
        return Ok(StrategyDecision {
            method: GenerationMethod::Bootstrap,
            reason: StrategyReason::ToolsAvailable,
            missing_tools: missing,
        });
    } else {
        StrategyReason::ToolsMissing
    };

    if !has_fallback {
        let mut err = GenerationError::fallback_unavailable(format!(
            "no generation strategy for {component_type}: {reason} and no embedded generator is registered"
        ));
        for tool in &missing {
            err = err.with_suggestion(format!("Install '{tool}'"));
        }
        return Err(err);
    }

    Ok(StrategyDecision {
        method: GenerationMethod::Fallback,
        reason,
        missing_tools: missing,
    })
}
