use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
pub use stackforge_runner::RunnerError;

/// Library-level error type with user-friendly reporting.
///
/// `StackforgeError` is what the CLI sees. Component-scoped failures never
/// reach this type directly; the engine resolves them into a
/// [`ComponentResult`](crate::types::ComponentResult) and only batch-level or
/// setup failures surface here.
///
/// | Exit Code | Error Type |
/// |-----------|------------|
/// | 2 | Configuration errors |
/// | 3 | Generation failed |
/// | 4 | Tool cache errors |
/// | 130 | Canceled |
/// | 1 | Other errors |
#[derive(Error, Debug)]
pub enum StackforgeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Tool cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Runner error: {0}")]
    Runner(#[from] RunnerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Stable label for grouping similar errors
    fn category(&self) -> &'static str;
}

// ============================================================================
// Generation errors
// ============================================================================

/// Category of a generation failure; drives retry and fallback decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Bad input; the component spec itself is unusable.
    Validation,
    /// A required external tool is not installed.
    ToolNotFound,
    /// The external tool ran and failed (non-zero exit or timeout).
    ToolExecution,
    /// The invocation was canceled by the caller.
    Canceled,
    /// No generation strategy is left for the component.
    FallbackUnavailable,
    /// Relocating generated output into the final layout failed.
    StructureMapping,
    /// Cleanup or restore after a failure did not complete.
    Rollback,
}

impl ErrorCategory {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::ToolNotFound => "tool_not_found",
            Self::ToolExecution => "tool_execution",
            Self::Canceled => "canceled",
            Self::FallbackUnavailable => "fallback_unavailable",
            Self::StructureMapping => "structure_mapping",
            Self::Rollback => "rollback",
        }
    }

    /// Only transient tool failures earn another bootstrap attempt.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ToolExecution)
    }

    /// Categories for which switching to the embedded generator makes sense.
    #[must_use]
    pub const fn allows_fallback(&self) -> bool {
        matches!(self, Self::ToolNotFound | Self::ToolExecution)
    }

    /// Batch-scoped failures abort the pipeline and trigger rollback.
    #[must_use]
    pub const fn is_batch_scoped(&self) -> bool {
        matches!(self, Self::StructureMapping)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single error shape the decision engine reasons about.
///
/// Other errors (runner, IO, config) are wrapped into this at the boundary
/// where they meet a component.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct GenerationError {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl GenerationError {
    #[must_use]
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            component: None,
            cause: None,
            suggestions: Vec::new(),
        }
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Validation, message)
    }

    #[must_use]
    pub fn tool_not_found(tool: &str) -> Self {
        Self::new(
            ErrorCategory::ToolNotFound,
            format!("required tool '{tool}' is not installed"),
        )
        .with_suggestion(format!("Install '{tool}' and make sure it is on PATH"))
    }

    #[must_use]
    pub fn tool_execution(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::ToolExecution, message)
    }

    #[must_use]
    pub fn canceled(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Canceled, message)
    }

    #[must_use]
    pub fn fallback_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::FallbackUnavailable, message)
    }

    #[must_use]
    pub fn structure_mapping(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::StructureMapping, message)
    }

    #[must_use]
    pub fn rollback(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Rollback, message)
    }

    #[must_use]
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    #[must_use]
    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Wrap a configuration problem that concerns one component.
    #[must_use]
    pub fn from_config(component: &str, err: &ConfigError) -> Self {
        Self::validation(err.to_string()).with_component(component)
    }
}

impl From<RunnerError> for GenerationError {
    fn from(err: RunnerError) -> Self {
        match &err {
            RunnerError::ProgramNotFound { program } => Self::tool_not_found(program),
            RunnerError::Canceled { .. } => Self::canceled(err.to_string()),
            RunnerError::Timeout { .. }
            | RunnerError::SpawnFailed { .. }
            | RunnerError::WaitFailed { .. } => Self::tool_execution(err.to_string()),
        }
    }
}

impl UserFriendlyError for GenerationError {
    fn user_message(&self) -> String {
        match &self.component {
            Some(component) => format!("[{}] {component}: {}", self.category, self.message),
            None => format!("[{}] {}", self.category, self.message),
        }
    }

    fn context(&self) -> Option<String> {
        let base = match self.category {
            ErrorCategory::Validation => {
                "The component configuration was rejected before any generator ran."
            }
            ErrorCategory::ToolNotFound => {
                "The external tool for this component type could not be found on PATH."
            }
            ErrorCategory::ToolExecution => {
                "The external tool ran but failed; transient failures are retried once."
            }
            ErrorCategory::Canceled => "Generation was canceled before the tool finished.",
            ErrorCategory::FallbackUnavailable => {
                "No embedded generator is registered for this component type."
            }
            ErrorCategory::StructureMapping => {
                "Generated output could not be moved into the project layout."
            }
            ErrorCategory::Rollback => "Restoring the previous output directory did not complete.",
        };
        match &self.cause {
            Some(cause) => Some(format!("{base} Cause: {cause}")),
            None => Some(base.to_string()),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        let mut suggestions = self.suggestions.clone();
        let defaults: &[&str] = match self.category {
            ErrorCategory::Validation => &[
                "Fix the component options in .stackforge/config.toml",
                "Run 'stackforge preview' to check configuration without generating",
            ],
            ErrorCategory::ToolNotFound => &[
                "Run 'stackforge doctor' to see which tools are available",
                "Run 'stackforge cache refresh' after installing new tools",
            ],
            ErrorCategory::ToolExecution => &[
                "Re-run with --verbose to see the tool's output",
                "Increase tool_timeout_secs if the tool is slow",
                "Use --no-external-tools to generate from embedded templates",
            ],
            ErrorCategory::Canceled => &["Re-run the command to start a fresh generation"],
            ErrorCategory::FallbackUnavailable => &[
                "Install the external tools this component type needs",
                "Remove --no-external-tools or --offline if they are set",
            ],
            ErrorCategory::StructureMapping => &[
                "Remove or rename the conflicting directory in the output tree",
                "Choose a different output_dir",
            ],
            ErrorCategory::Rollback => &[
                "Inspect the backup directory listed in the report and restore manually",
            ],
        };
        suggestions.extend(defaults.iter().map(|s| (*s).to_string()));
        suggestions
    }

    fn category(&self) -> &'static str {
        self.category.as_str()
    }
}

// ============================================================================
// Configuration errors
// ============================================================================

/// Configuration-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Unknown component type '{value}' for component '{name}'")]
    UnknownComponentType { name: String, value: String },

    #[error("Duplicate component name '{name}'")]
    DuplicateComponent { name: String },

    #[error("Configuration validation failed: {error_count} errors")]
    ValidationFailed {
        errors: Vec<String>,
        error_count: usize,
    },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(reason) => {
                format!("Configuration file has invalid format: {reason}")
            }
            Self::NotFound { path } => format!("Configuration file not found: {path}"),
            Self::InvalidValue { key, value } => {
                format!("Configuration '{key}' has invalid value: {value}")
            }
            Self::UnknownComponentType { name, value } => {
                format!("Component '{name}' uses unsupported type '{value}'")
            }
            Self::DuplicateComponent { name } => {
                format!("Component name '{name}' is used more than once")
            }
            Self::ValidationFailed { errors, .. } => format!(
                "Configuration validation failed with {} errors: {}",
                errors.len(),
                errors.join(", ")
            ),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidFile(_) => Some(
                "Configuration files must be valid TOML with [defaults], [cache] and [[components]] sections."
                    .to_string(),
            ),
            Self::NotFound { .. } => Some(
                "stackforge searches for .stackforge/config.toml starting from the current directory upward."
                    .to_string(),
            ),
            Self::InvalidValue { key, .. } => Some(format!(
                "The '{key}' option has specific format requirements."
            )),
            Self::UnknownComponentType { .. } => Some(
                "Supported component types are: nextjs, go-backend, android, ios.".to_string(),
            ),
            Self::DuplicateComponent { .. } => Some(
                "Component names identify output directories and must be unique.".to_string(),
            ),
            Self::ValidationFailed { .. } => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check the TOML syntax using a TOML validator".to_string(),
                "Compare with the example configuration in the README".to_string(),
            ],
            Self::NotFound { .. } => vec![
                "Create .stackforge/config.toml in your project root".to_string(),
                "Use --config <path> to point at a configuration file".to_string(),
            ],
            Self::InvalidValue { key, .. } => match key.as_str() {
                "module_path" => vec!["Use a Go module path such as 'example.com/api'".to_string()],
                "package_name" => {
                    vec!["Use a Java package name such as 'com.example.app'".to_string()]
                }
                "bundle_id" => vec!["Use a reverse-DNS bundle id such as 'com.example.App'".to_string()],
                "ttl_secs" => vec!["Use a TTL between 0 and 86400 seconds".to_string()],
                _ => vec![
                    "Check the documentation for valid values for this option".to_string(),
                    "Remove the option to use the default value".to_string(),
                ],
            },
            Self::UnknownComponentType { .. } => {
                vec!["Use one of: nextjs, go-backend, android, ios".to_string()]
            }
            Self::DuplicateComponent { name } => {
                vec![format!("Rename one of the '{name}' components")]
            }
            Self::ValidationFailed { .. } => {
                vec!["Fix each listed problem and re-run the command".to_string()]
            }
        }
    }

    fn category(&self) -> &'static str {
        "configuration"
    }
}

// ============================================================================
// Tool cache errors
// ============================================================================

/// Tool cache persistence, export and import errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache IO failed at {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Cache file {path} is not valid JSON: {reason}")]
    Parse { path: String, reason: String },

    #[error("Unsupported cache export version '{version}' (expected '{expected}')")]
    UnsupportedVersion { version: String, expected: String },

    #[error("Cache export is missing the 'entries' field")]
    MissingEntries,

    #[error("Cache entry '{name}' is null")]
    NilEntry { name: String },

    #[error("Cache entry '{name}' is invalid: {reason}")]
    InvalidEntry { name: String, reason: String },
}

impl UserFriendlyError for CacheError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Option<String> {
        Some(
            "The tool cache remembers which external tools are installed so they are not re-probed on every run."
                .to_string(),
        )
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Io { .. } => vec!["Check permissions on the cache directory".to_string()],
            Self::Parse { .. } => vec![
                "Run 'stackforge cache clear' and let tools be re-probed".to_string(),
            ],
            Self::UnsupportedVersion { .. } | Self::MissingEntries => vec![
                "Re-export the cache with the current stackforge version".to_string(),
            ],
            Self::NilEntry { .. } | Self::InvalidEntry { .. } => vec![
                "Run 'stackforge cache validate' to list problem entries".to_string(),
                "Run 'stackforge cache refresh' to re-probe all tools".to_string(),
            ],
        }
    }

    fn category(&self) -> &'static str {
        "tool_cache"
    }
}

impl UserFriendlyError for StackforgeError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(e) => e.user_message(),
            Self::Cache(e) => e.user_message(),
            Self::Generation(e) => e.user_message(),
            Self::Runner(e) => e.to_string(),
            Self::Io(e) => format!("File system error: {e}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(e) => e.context(),
            Self::Cache(e) => e.context(),
            Self::Generation(e) => e.context(),
            Self::Runner(_) | Self::Io(_) => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(e) => e.suggestions(),
            Self::Cache(e) => e.suggestions(),
            Self::Generation(e) => e.suggestions(),
            Self::Runner(_) => vec!["Re-run with --verbose for tool output".to_string()],
            Self::Io(_) => vec!["Check file permissions and free disk space".to_string()],
        }
    }

    fn category(&self) -> &'static str {
        match self {
            Self::Config(e) => e.category(),
            Self::Cache(e) => e.category(),
            Self::Generation(e) => UserFriendlyError::category(e),
            Self::Runner(_) => "process",
            Self::Io(_) => "filesystem",
        }
    }
}

/// Render any [`UserFriendlyError`] for the terminal:
///
/// ```text
/// Error: <user_message>
///
/// Context: <context>
///
/// Suggestions:
///   • <suggestion>
/// ```
#[must_use]
pub fn display_for_user(err: &dyn UserFriendlyError) -> String {
    let mut output = format!("Error: {}\n", err.user_message());
    if let Some(ctx) = err.context() {
        output.push_str(&format!("\nContext: {ctx}\n"));
    }
    let suggestions = err.suggestions();
    if !suggestions.is_empty() {
        output.push_str("\nSuggestions:\n");
        for suggestion in suggestions {
            output.push_str(&format!("  • {suggestion}\n"));
        }
    }
    output
}

impl StackforgeError {
    /// User-facing message with context and suggestions.
    ///
    /// ```rust
    /// use stackforge_utils::error::{CacheError, StackforgeError};
    ///
    /// let err = StackforgeError::Cache(CacheError::MissingEntries);
    /// let message = err.display_for_user();
    /// assert!(message.starts_with("Error: "));
    /// assert!(message.contains("Suggestions:"));
    /// ```
    #[must_use]
    pub fn display_for_user(&self) -> String {
        display_for_user(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_tool_execution_is_retryable() {
        assert!(ErrorCategory::ToolExecution.is_retryable());
        for category in [
            ErrorCategory::Validation,
            ErrorCategory::ToolNotFound,
            ErrorCategory::Canceled,
            ErrorCategory::FallbackUnavailable,
            ErrorCategory::StructureMapping,
            ErrorCategory::Rollback,
        ] {
            assert!(!category.is_retryable(), "{category} must not retry");
        }
    }

    #[test]
    fn test_fallback_eligibility() {
        assert!(ErrorCategory::ToolNotFound.allows_fallback());
        assert!(ErrorCategory::ToolExecution.allows_fallback());
        assert!(!ErrorCategory::Validation.allows_fallback());
        assert!(!ErrorCategory::Canceled.allows_fallback());
    }

    #[test]
    fn test_runner_error_classification() {
        let not_found: GenerationError = RunnerError::ProgramNotFound {
            program: "gradle".to_string(),
        }
        .into();
        assert_eq!(not_found.category, ErrorCategory::ToolNotFound);
        assert!(not_found.message.contains("gradle"));

        let timeout: GenerationError = RunnerError::Timeout {
            timeout_seconds: 300,
        }
        .into();
        assert_eq!(timeout.category, ErrorCategory::ToolExecution);

        let canceled: GenerationError = RunnerError::Canceled {
            program: "npx".to_string(),
        }
        .into();
        assert_eq!(canceled.category, ErrorCategory::Canceled);
    }

    #[test]
    fn test_user_message_includes_component() {
        let err = GenerationError::tool_execution("exit code 1").with_component("web");
        assert_eq!(err.user_message(), "[tool_execution] web: exit code 1");
        assert_eq!(err.to_string(), "exit code 1");
    }

    #[test]
    fn test_explicit_suggestions_come_first() {
        let err = GenerationError::tool_not_found("go");
        let suggestions = err.suggestions();
        assert_eq!(suggestions[0], "Install 'go' and make sure it is on PATH");
        assert!(suggestions.len() > 1);
    }

    #[test]
    fn test_generation_error_serializes_category() {
        let err = GenerationError::canceled("stop").with_cause("ctrl-c");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["category"], "canceled");
        assert_eq!(json["cause"], "ctrl-c");
        assert!(json.get("component").is_none());
    }
}
