use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use stackforge_utils::error::ConfigError;
use stackforge_utils::types::ConfigSource;

use crate::{CacheSection, CliArgs, Config, Defaults, RawComponent};

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    defaults: Option<Defaults>,
    cache: Option<CacheSection>,
    #[serde(default)]
    components: Vec<RawComponent>,
}

/// Copy each `Some` field of `$src` into `$dst`, recording `$source`.
macro_rules! layer {
    ($attr:ident, $source:expr, $dst:ident <- $src:ident : $($field:ident),+ $(,)?) => {
        $(
            if $src.$field.is_some() {
                $dst.$field = $src.$field.clone();
                $attr.insert(stringify!($field).to_string(), $source);
            }
        )+
    };
}

impl Config {
    /// Discover and load configuration with precedence: CLI > file > defaults
    ///
    /// Uses the current working directory for config file discovery when no
    /// explicit path is given.
    pub fn discover(cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir()
            .map_err(|e| ConfigError::InvalidFile(format!("cannot read current directory: {e}")))?;
        let cwd = Utf8PathBuf::from_path_buf(cwd).map_err(|p| {
            ConfigError::InvalidFile(format!("current directory is not UTF-8: {}", p.display()))
        })?;
        Self::discover_from(&cwd, cli_args)
    }

    /// Discover and load configuration starting from a specific directory.
    ///
    /// Path-driven variant used by tests to avoid process-global state.
    pub fn discover_from(start_dir: &Utf8Path, cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let mut source_attribution = HashMap::new();
        let mut defaults = Defaults::default();
        let mut cache = CacheSection::default();
        let mut components = Vec::new();

        let config_path = match &cli_args.config_path {
            Some(explicit) => {
                if !explicit.exists() {
                    return Err(ConfigError::NotFound {
                        path: explicit.to_string(),
                    });
                }
                Some(explicit.clone())
            }
            None => Self::discover_config_file_from(start_dir),
        };

        if let Some(path) = &config_path {
            tracing::debug!(path = %path, "Loading configuration file");
            let file = Self::load_config_file(path)?;
            let src = ConfigSource::Config;

            if let Some(file_defaults) = file.defaults {
                layer!(source_attribution, src, defaults <- file_defaults:
                    project_name, output_dir, prefer_external_tools, offline, detect_offline,
                    parallel, max_workers, tool_timeout_secs, backup, keep_backup, map_mode,
                    verbose,
                );
            }
            if let Some(file_cache) = file.cache {
                if file_cache.ttl_secs.is_some() {
                    cache.ttl_secs = file_cache.ttl_secs;
                    source_attribution.insert("cache_ttl_secs".to_string(), src);
                }
                if file_cache.path.is_some() {
                    cache.path = file_cache.path;
                    source_attribution.insert("cache_path".to_string(), src);
                }
            }
            components = file.components;
        }

        // CLI overrides (highest priority)
        let cli = ConfigSource::Cli;
        let mut set_cli = |key: &str| {
            source_attribution.insert(key.to_string(), cli);
        };
        if let Some(name) = &cli_args.project_name {
            defaults.project_name = Some(name.clone());
            set_cli("project_name");
        }
        if let Some(dir) = &cli_args.output_dir {
            defaults.output_dir = Some(dir.clone());
            set_cli("output_dir");
        }
        if cli_args.no_external_tools {
            defaults.prefer_external_tools = Some(false);
            set_cli("prefer_external_tools");
        }
        if cli_args.offline {
            defaults.offline = Some(true);
            set_cli("offline");
        }
        if cli_args.detect_offline {
            defaults.detect_offline = Some(true);
            set_cli("detect_offline");
        }
        if cli_args.sequential {
            defaults.parallel = Some(false);
            set_cli("parallel");
        }
        if let Some(workers) = cli_args.max_workers {
            defaults.max_workers = Some(workers);
            set_cli("max_workers");
        }
        if let Some(timeout) = cli_args.tool_timeout_secs {
            defaults.tool_timeout_secs = Some(timeout);
            set_cli("tool_timeout_secs");
        }
        if cli_args.no_backup {
            defaults.backup = Some(false);
            set_cli("backup");
        }
        if cli_args.keep_backup {
            defaults.keep_backup = Some(true);
            set_cli("keep_backup");
        }
        if let Some(mode) = cli_args.map_mode {
            defaults.map_mode = Some(mode);
            set_cli("map_mode");
        }
        if let Some(verbose) = cli_args.verbose {
            defaults.verbose = Some(verbose);
            set_cli("verbose");
        }
        if let Some(ttl) = cli_args.cache_ttl_secs {
            cache.ttl_secs = Some(ttl);
            set_cli("cache_ttl_secs");
        }
        if let Some(path) = &cli_args.cache_path {
            cache.path = Some(path.clone());
            set_cli("cache_path");
        }

        let config = Self {
            defaults,
            cache,
            components,
            source_attribution,
            config_path,
        };

        config.validate()?;
        Ok(config)
    }

    /// Search upward from `start_dir` for `.stackforge/config.toml`.
    ///
    /// Stops at repository root markers (.git, .hg, .svn) or the filesystem root.
    #[must_use]
    pub fn discover_config_file_from(start_dir: &Utf8Path) -> Option<Utf8PathBuf> {
        let mut current = Some(start_dir);

        while let Some(dir) = current {
            let candidate = dir.join(".stackforge").join("config.toml");
            if candidate.is_file() {
                return Some(candidate);
            }
            if dir.join(".git").exists() || dir.join(".hg").exists() || dir.join(".svn").exists()
            {
                break;
            }
            current = dir.parent();
        }

        None
    }

    fn load_config_file(path: &Utf8Path) -> Result<TomlConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.to_string(),
                }
            } else {
                ConfigError::InvalidFile(format!("{path}: {e}"))
            }
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::InvalidFile(format!("{path}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MapMode;
    use std::fs;
    use tempfile::TempDir;

    fn project(config: &str) -> (TempDir, Utf8PathBuf) {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::create_dir_all(root.join(".stackforge")).unwrap();
        fs::write(root.join(".stackforge/config.toml"), config).unwrap();
        (temp, root)
    }

    const SAMPLE: &str = r#"
[defaults]
project_name = "shop"
max_workers = 2
map_mode = "copy"

[cache]
ttl_secs = 600

[[components]]
type = "nextjs"
name = "web"

[[components]]
type = "go-backend"
name = "api"
timeout_secs = 60
[components.options]
module_path = "example.com/shop/api"
"#;

    #[test]
    fn test_file_values_override_defaults() {
        let (_temp, root) = project(SAMPLE);
        let config = Config::discover_from(&root, &CliArgs::default()).unwrap();

        assert_eq!(config.project_name(), "shop");
        assert_eq!(config.max_workers(), 2);
        assert_eq!(config.map_mode(), MapMode::Copy);
        assert_eq!(config.cache_ttl().as_secs(), 600);
        assert_eq!(config.components.len(), 2);
        assert_eq!(
            config.source_attribution.get("max_workers"),
            Some(&ConfigSource::Config)
        );
    }

    #[test]
    fn test_cli_overrides_file() {
        let (_temp, root) = project(SAMPLE);
        let cli = CliArgs {
            max_workers: Some(1),
            no_external_tools: true,
            ..CliArgs::default()
        };
        let config = Config::discover_from(&root, &cli).unwrap();

        assert_eq!(config.max_workers(), 1);
        assert!(!config.prefer_external_tools());
        assert_eq!(
            config.source_attribution.get("max_workers"),
            Some(&ConfigSource::Cli)
        );
    }

    #[test]
    fn test_discovery_walks_upward_from_subdirectory() {
        let (_temp, root) = project(SAMPLE);
        let nested = root.join("a/b/c");
        fs::create_dir_all(&nested).unwrap();

        let found = Config::discover_config_file_from(&nested).unwrap();
        assert_eq!(found, root.join(".stackforge/config.toml"));
    }

    #[test]
    fn test_discovery_stops_at_repository_root() {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        fs::create_dir_all(root.join("repo/.git")).unwrap();

        assert!(Config::discover_config_file_from(&root.join("repo")).is_none());
    }

    #[test]
    fn test_missing_explicit_config_is_not_found() {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let cli = CliArgs {
            config_path: Some(root.join("nope.toml")),
            ..CliArgs::default()
        };
        let err = Config::discover_from(&root, &cli).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn test_invalid_toml_is_invalid_file() {
        let (_temp, root) = project("[defaults\nbroken");
        let err = Config::discover_from(&root, &CliArgs::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFile(_)));
    }

    #[test]
    fn test_unknown_section_rejected() {
        let (_temp, root) = project("[llm]\nprovider = \"x\"\n");
        assert!(Config::discover_from(&root, &CliArgs::default()).is_err());
    }

    #[test]
    fn test_no_config_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();

        let config = Config::discover_from(&root, &CliArgs::default()).unwrap();
        assert!(config.config_path.is_none());
        assert!(config.components.is_empty());
    }
}
