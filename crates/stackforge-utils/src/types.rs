use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ConfigError, GenerationError};

/// Supported component types.
///
/// Each type knows which external tools its bootstrap path needs and where
/// its output lives in the final project layout.
///
/// ```rust
/// use stackforge_utils::types::ComponentType;
///
/// let ty: ComponentType = "go-backend".parse().unwrap();
/// assert_eq!(ty.required_tools(), &["go"]);
/// assert_eq!(ty.canonical_dir(), "backend");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComponentType {
    #[serde(rename = "nextjs")]
    Nextjs,
    #[serde(rename = "go-backend")]
    GoBackend,
    #[serde(rename = "android")]
    Android,
    #[serde(rename = "ios")]
    Ios,
}

impl ComponentType {
    pub const ALL: [Self; 4] = [Self::Nextjs, Self::GoBackend, Self::Android, Self::Ios];

    /// Type tag as used in configuration files and reports.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Nextjs => "nextjs",
            Self::GoBackend => "go-backend",
            Self::Android => "android",
            Self::Ios => "ios",
        }
    }

    /// External tools that must all be available for bootstrap generation.
    #[must_use]
    pub const fn required_tools(&self) -> &'static [&'static str] {
        match self {
            Self::Nextjs => &["npx"],
            Self::GoBackend => &["go"],
            Self::Android => &["gradle", "android"],
            Self::Ios => &["swift", "xcodebuild"],
        }
    }

    /// Directory (relative to the project root) the component is relocated into.
    #[must_use]
    pub const fn canonical_dir(&self) -> &'static str {
        match self {
            Self::Nextjs => "frontend",
            Self::GoBackend => "backend",
            Self::Android => "mobile/android",
            Self::Ios => "mobile/ios",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: "type".to_string(),
                value: s.to_string(),
            })
    }
}

/// How a component was (or was attempted to be) produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMethod {
    /// An installed external platform tool produced the component.
    Bootstrap,
    /// Embedded boilerplate was written directly.
    Fallback,
}

impl GenerationMethod {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bootstrap => "bootstrap",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for GenerationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one component's generation run.
///
/// Written exactly once by the worker that processed the component; read-only
/// afterwards. `method` is `None` only when the component failed before any
/// generator was attempted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentResult {
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    pub name: String,
    pub success: bool,
    pub method: Option<GenerationMethod>,
    pub tool_used: Option<String>,
    pub output_path: Option<Utf8PathBuf>,
    pub manual_steps: Vec<String>,
    pub warnings: Vec<String>,
    pub duration: Duration,
    pub error: Option<GenerationError>,
}

impl ComponentResult {
    /// A result with no method, no output and no error; filled in by the caller.
    #[must_use]
    pub fn pending(component_type: ComponentType, name: impl Into<String>) -> Self {
        Self {
            component_type,
            name: name.into(),
            success: false,
            method: None,
            tool_used: None,
            output_path: None,
            manual_steps: Vec::new(),
            warnings: Vec::new(),
            duration: Duration::ZERO,
            error: None,
        }
    }

    /// Method tag as a string; empty when no generator was attempted.
    #[must_use]
    pub fn method_str(&self) -> &'static str {
        self.method.map_or("", |m| m.as_str())
    }
}

/// Summary of a rollback attempt, embedded in failed reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackSummary {
    /// True when every cleanup and restore step completed.
    pub succeeded: bool,
    pub removed_temp_dirs: Vec<Utf8PathBuf>,
    pub restored_backup: Option<Utf8PathBuf>,
    pub warnings: Vec<String>,
}

/// Aggregate report for one generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub success: bool,
    pub components: Vec<ComponentResult>,
    pub warnings: Vec<String>,
    pub errors: Vec<GenerationError>,
    pub duration: Duration,
    pub output_dir: Utf8PathBuf,
    pub backup_path: Option<Utf8PathBuf>,
    pub rollback: Option<RollbackSummary>,
    pub started_at: DateTime<Utc>,
}

impl GenerationReport {
    #[must_use]
    pub fn succeeded_count(&self) -> usize {
        self.components.iter().filter(|c| c.success).count()
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.components.iter().filter(|c| !c.success).count()
    }
}

/// Status of a doctor check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// A single doctor check result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorCheck {
    pub name: String,
    pub status: CheckStatus,
    pub details: String,
}

/// Tool cache statistics as reported by `doctor` and `cache stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub available_tools: usize,
    pub unavailable_tools: usize,
    pub ttl_secs: u64,
}

/// Doctor command output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorOutput {
    pub schema_version: String,
    pub emitted_at: DateTime<Utc>,
    pub ok: bool,
    pub checks: Vec<DoctorCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_stats: Option<CacheStats>,
}

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Cli,
    Config,
    Default,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cli => write!(f, "cli"),
            Self::Config => write!(f, "config"),
            Self::Default => write!(f, "default"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_type_round_trips_through_tag() {
        for ty in ComponentType::ALL {
            assert_eq!(ty.as_str().parse::<ComponentType>().unwrap(), ty);
        }
        assert!("rails".parse::<ComponentType>().is_err());
    }

    #[test]
    fn test_component_type_serde_uses_tag() {
        let json = serde_json::to_string(&ComponentType::GoBackend).unwrap();
        assert_eq!(json, "\"go-backend\"");
    }

    #[test]
    fn test_android_requires_two_tools() {
        assert_eq!(ComponentType::Android.required_tools(), &["gradle", "android"]);
    }

    #[test]
    fn test_pending_result_has_empty_method() {
        let result = ComponentResult::pending(ComponentType::Ios, "app");
        assert!(!result.success);
        assert_eq!(result.method_str(), "");
    }
}
