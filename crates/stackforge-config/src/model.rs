use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use stackforge_utils::error::ConfigError;
use stackforge_utils::paths;
use stackforge_utils::types::ConfigSource;

use crate::components::ComponentSpec;

/// Default per-invocation timeout for external tools (5 minutes)
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 300;
/// Default tool cache TTL (1 hour)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
/// Upper bound for the tool cache TTL (24 hours)
pub const MAX_CACHE_TTL_SECS: u64 = 86_400;
/// Upper bound on concurrent component workers
pub const MAX_WORKERS: usize = 4;
/// Project name used when neither CLI nor file sets one
pub const DEFAULT_PROJECT_NAME: &str = "stackforge-app";

/// How generated components are relocated into the final layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MapMode {
    #[default]
    Move,
    Copy,
    Symlink,
}

impl MapMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Copy => "copy",
            Self::Symlink => "symlink",
        }
    }
}

impl fmt::Display for MapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MapMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "move" => Ok(Self::Move),
            "copy" => Ok(Self::Copy),
            "symlink" => Ok(Self::Symlink),
            other => Err(ConfigError::InvalidValue {
                key: "map_mode".to_string(),
                value: format!("{other} (expected move, copy or symlink)"),
            }),
        }
    }
}

/// `[defaults]` section. Every field is optional so file values can be
/// layered over built-in defaults and under CLI flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    pub project_name: Option<String>,
    pub output_dir: Option<Utf8PathBuf>,
    pub prefer_external_tools: Option<bool>,
    pub offline: Option<bool>,
    pub detect_offline: Option<bool>,
    pub parallel: Option<bool>,
    pub max_workers: Option<usize>,
    pub tool_timeout_secs: Option<u64>,
    pub backup: Option<bool>,
    pub keep_backup: Option<bool>,
    pub map_mode: Option<MapMode>,
    pub verbose: Option<bool>,
}

/// `[cache]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    pub ttl_secs: Option<u64>,
    pub path: Option<Utf8PathBuf>,
}

/// One `[[components]]` entry exactly as written in the file.
///
/// Converted into a typed [`ComponentSpec`] by [`RawComponent::into_spec`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawComponent {
    #[serde(rename = "type")]
    pub component_type: String,
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub options: toml::Table,
}

fn default_enabled() -> bool {
    true
}

impl RawComponent {
    #[must_use]
    pub fn new(component_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            component_type: component_type.into(),
            name: name.into(),
            enabled: true,
            timeout_secs: None,
            options: toml::Table::new(),
        }
    }
}

/// Configuration for stackforge operations.
///
/// Built by [`Config::discover`] with precedence CLI arguments > config file >
/// built-in defaults; `source_attribution` records where each value came from.
/// Accessors resolve the layered `Option`s into concrete values.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub defaults: Defaults,
    pub cache: CacheSection,
    pub components: Vec<RawComponent>,
    pub source_attribution: HashMap<String, ConfigSource>,
    /// File the configuration was loaded from, if any
    pub config_path: Option<Utf8PathBuf>,
}

impl Config {
    #[must_use]
    pub fn project_name(&self) -> &str {
        self.defaults
            .project_name
            .as_deref()
            .unwrap_or(DEFAULT_PROJECT_NAME)
    }

    /// Output directory; defaults to `./<project_name>`.
    #[must_use]
    pub fn output_dir(&self) -> Utf8PathBuf {
        self.defaults
            .output_dir
            .clone()
            .unwrap_or_else(|| Utf8PathBuf::from(self.project_name()))
    }

    #[must_use]
    pub fn prefer_external_tools(&self) -> bool {
        self.defaults.prefer_external_tools.unwrap_or(true)
    }

    #[must_use]
    pub fn offline(&self) -> bool {
        self.defaults.offline.unwrap_or(false)
    }

    #[must_use]
    pub fn detect_offline(&self) -> bool {
        self.defaults.detect_offline.unwrap_or(false)
    }

    #[must_use]
    pub fn parallel(&self) -> bool {
        self.defaults.parallel.unwrap_or(true)
    }

    /// Worker count, clamped to `1..=MAX_WORKERS`.
    #[must_use]
    pub fn max_workers(&self) -> usize {
        self.defaults
            .max_workers
            .unwrap_or(MAX_WORKERS)
            .clamp(1, MAX_WORKERS)
    }

    #[must_use]
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(
            self.defaults
                .tool_timeout_secs
                .unwrap_or(DEFAULT_TOOL_TIMEOUT_SECS),
        )
    }

    #[must_use]
    pub fn backup(&self) -> bool {
        self.defaults.backup.unwrap_or(true)
    }

    #[must_use]
    pub fn keep_backup(&self) -> bool {
        self.defaults.keep_backup.unwrap_or(false)
    }

    #[must_use]
    pub fn map_mode(&self) -> MapMode {
        self.defaults.map_mode.unwrap_or_default()
    }

    #[must_use]
    pub fn verbose(&self) -> bool {
        self.defaults.verbose.unwrap_or(false)
    }

    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs.unwrap_or(DEFAULT_CACHE_TTL_SECS))
    }

    /// Tool cache file; defaults to `<STACKFORGE_HOME>/cache/tools.json`.
    #[must_use]
    pub fn cache_path(&self) -> Utf8PathBuf {
        self.cache
            .path
            .clone()
            .unwrap_or_else(paths::default_tool_cache_file)
    }

    /// Convert every `[[components]]` entry into a typed spec.
    ///
    /// Stops at the first invalid component; use [`Config::validate`] to
    /// collect every problem at once.
    pub fn component_specs(&self) -> Result<Vec<ComponentSpec>, ConfigError> {
        let timeout = self.tool_timeout();
        self.components
            .iter()
            .map(|raw| raw.into_spec(timeout))
            .collect()
    }

    /// Resolve `output_dir` against `base` when it is relative.
    #[must_use]
    pub fn output_dir_from(&self, base: &Utf8Path) -> Utf8PathBuf {
        let out = self.output_dir();
        if out.is_absolute() { out } else { base.join(out) }
    }
}
