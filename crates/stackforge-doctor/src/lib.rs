//! Doctor command for environment health checks
//!
//! Reports which scaffolding tools are installed (through the tool cache, so
//! a doctor run also warms it), whether the cache file is sound, whether the
//! output directory is writable and whether the run would be offline.

pub use stackforge_utils::types::{CheckStatus, DoctorCheck, DoctorOutput};

pub mod network;
pub mod probe;

pub use network::{OfflineDetector, OfflineStatus};
pub use probe::SystemToolProbe;

use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;

use stackforge_config::Config;
use stackforge_toolcache::{CacheValidator, ToolCache, ToolCacheManager, ToolProbe};
use stackforge_utils::logging;
use stackforge_utils::types::ComponentType;

/// Every tool any component type can bootstrap with, sorted.
#[must_use]
pub fn all_required_tools() -> Vec<&'static str> {
    ComponentType::ALL
        .iter()
        .flat_map(ComponentType::required_tools)
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Doctor command implementation
pub struct DoctorCommand {
    config: Config,
    manager: ToolCacheManager,
    probe: Arc<dyn ToolProbe>,
    detector: OfflineDetector,
}

impl DoctorCommand {
    /// Doctor over the configured cache file and the real system.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let cache = Arc::new(ToolCache::open(config.cache_path(), config.cache_ttl()));
        Self {
            config,
            manager: ToolCacheManager::new(cache),
            probe: Arc::new(SystemToolProbe::new()),
            detector: OfflineDetector::new(),
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<ToolCache>) -> Self {
        self.manager = ToolCacheManager::new(cache);
        self
    }

    #[must_use]
    pub fn with_probe(mut self, probe: Arc<dyn ToolProbe>) -> Self {
        self.probe = probe;
        self
    }

    #[must_use]
    pub fn with_detector(mut self, detector: OfflineDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Run all health checks and return the doctor output
    pub fn run(&self) -> Result<DoctorOutput> {
        let mut checks = vec![
            self.check_config(),
            self.check_tool_cache(),
            self.check_output_dir(),
            self.check_network(),
        ];
        checks.extend(self.check_tools());

        // Sort checks by name for stable output
        checks.sort_by(|a, b| a.name.cmp(&b.name));

        let ok = !checks.iter().any(|c| c.status == CheckStatus::Fail);
        let cache_stats = self.manager.cache().stats();
        logging::log_cache_stats(&cache_stats);

        Ok(DoctorOutput {
            schema_version: "1".to_string(),
            emitted_at: Utc::now(),
            ok,
            checks,
            cache_stats: Some(cache_stats),
        })
    }

    fn check_config(&self) -> DoctorCheck {
        let source = self
            .config
            .config_path
            .as_ref()
            .map_or_else(|| "built-in defaults".to_string(), ToString::to_string);
        match self.config.component_specs() {
            Ok(specs) => {
                let enabled = specs.iter().filter(|s| s.enabled).count();
                DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Pass,
                    details: format!(
                        "{} components ({enabled} enabled) from {source}",
                        specs.len()
                    ),
                }
            }
            Err(e) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Fail,
                details: format!("{source}: {e}"),
            },
        }
    }

    /// One check per known tool, answered from the cache or a fresh probe.
    fn check_tools(&self) -> Vec<DoctorCheck> {
        let tools = all_required_tools();
        let summary = self.manager.ensure(self.probe.as_ref(), &tools);
        if summary.changed()
            && let Err(e) = self.manager.cache().save()
        {
            tracing::warn!(error = %e, "Could not persist tool cache");
        }

        tools
            .iter()
            .map(|tool| {
                let name = format!("tool_{tool}");
                if let Some(failure) = summary.failed.iter().find(|f| f.tool == *tool) {
                    return DoctorCheck {
                        name,
                        status: CheckStatus::Warn,
                        details: failure.to_string(),
                    };
                }
                match self.manager.cache().get(tool) {
                    Some(entry) if entry.available => DoctorCheck {
                        name,
                        status: CheckStatus::Pass,
                        details: if entry.version.is_empty() {
                            "installed (version unknown)".to_string()
                        } else {
                            entry.version
                        },
                    },
                    _ => DoctorCheck {
                        name,
                        status: CheckStatus::Warn,
                        details: "not installed; embedded templates will be used".to_string(),
                    },
                }
            })
            .collect()
    }

    fn check_tool_cache(&self) -> DoctorCheck {
        let report = CacheValidator::new().validate(self.manager.cache());
        let location = self
            .manager
            .cache()
            .path()
            .map_or_else(|| "in-memory".to_string(), ToString::to_string);
        if !report.valid {
            DoctorCheck {
                name: "tool_cache".to_string(),
                status: CheckStatus::Fail,
                details: format!(
                    "{location}: invalid entries {} (run 'stackforge cache validate --repair')",
                    report.corrupted_entries.join(", ")
                ),
            }
        } else if !report.warnings.is_empty() {
            DoctorCheck {
                name: "tool_cache".to_string(),
                status: CheckStatus::Warn,
                details: format!("{location}: {}", report.warnings.join("; ")),
            }
        } else {
            DoctorCheck {
                name: "tool_cache".to_string(),
                status: CheckStatus::Pass,
                details: format!("{location}: {} entries", report.total_entries),
            }
        }
    }

    fn check_output_dir(&self) -> DoctorCheck {
        let output_dir = self.config.output_dir();
        let probe_dir = nearest_existing_dir(&output_dir);
        match tempfile::NamedTempFile::new_in(&probe_dir) {
            Ok(_) => {
                let details = if output_dir.exists() {
                    format!("{output_dir} exists and is writable; it will be backed up first")
                } else {
                    format!("{output_dir} can be created under {probe_dir}")
                };
                DoctorCheck {
                    name: "output_dir".to_string(),
                    status: CheckStatus::Pass,
                    details,
                }
            }
            Err(e) => DoctorCheck {
                name: "output_dir".to_string(),
                status: CheckStatus::Fail,
                details: format!("Cannot write to {probe_dir}: {e}"),
            },
        }
    }

    fn check_network(&self) -> DoctorCheck {
        let status = self
            .detector
            .status(self.config.offline(), self.config.detect_offline());
        DoctorCheck {
            name: "network".to_string(),
            status: if status.is_offline() {
                CheckStatus::Warn
            } else {
                CheckStatus::Pass
            },
            details: status.describe().to_string(),
        }
    }
}

/// `path` itself or its closest existing ancestor; `.` for a relative path
/// with no existing prefix.
fn nearest_existing_dir(path: &Utf8Path) -> Utf8PathBuf {
    path.ancestors()
        .find(|p| !p.as_str().is_empty() && p.is_dir())
        .map_or_else(|| Utf8PathBuf::from("."), Utf8Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackforge_toolcache::test_support::StaticProbe;
    use std::time::Duration;
    use tempfile::TempDir;

    fn config_in(temp: &TempDir) -> Config {
        let mut config = Config::default();
        config.defaults.output_dir =
            Some(Utf8PathBuf::from_path_buf(temp.path().join("app")).unwrap());
        config
    }

    fn doctor(config: Config, probe: Arc<StaticProbe>) -> (Arc<ToolCache>, DoctorCommand) {
        let cache = Arc::new(ToolCache::in_memory(Duration::from_secs(3600)));
        let doctor = DoctorCommand::new(config)
            .with_cache(Arc::clone(&cache))
            .with_probe(probe);
        (cache, doctor)
    }

    #[test]
    fn test_all_required_tools_sorted_unique() {
        assert_eq!(
            all_required_tools(),
            vec!["android", "go", "gradle", "npx", "swift", "xcodebuild"]
        );
    }

    #[test]
    fn test_doctor_output_structure() {
        let temp = TempDir::new().unwrap();
        let probe = Arc::new(StaticProbe::new().with_tool("go", "go version go1.22.1"));
        let (cache, doctor) = doctor(config_in(&temp), probe);

        let output = doctor.run().unwrap();
        assert_eq!(output.schema_version, "1");
        assert!(output.ok, "missing tools only warn: {:?}", output.checks);

        let names: Vec<String> = output.checks.iter().map(|c| c.name.clone()).collect();
        let mut sorted_names = names.clone();
        sorted_names.sort();
        assert_eq!(names, sorted_names, "Checks should be sorted by name");

        let go = output.checks.iter().find(|c| c.name == "tool_go").unwrap();
        assert_eq!(go.status, CheckStatus::Pass);
        let npx = output.checks.iter().find(|c| c.name == "tool_npx").unwrap();
        assert_eq!(npx.status, CheckStatus::Warn);

        assert_eq!(cache.stats().total_entries, 6);
        assert_eq!(output.cache_stats.unwrap().available_tools, 1);
    }

    #[test]
    fn test_second_run_served_from_cache() {
        let temp = TempDir::new().unwrap();
        let probe = Arc::new(StaticProbe::new().with_tools(&["npx"]));
        let (_cache, doctor) = doctor(config_in(&temp), Arc::clone(&probe));

        doctor.run().unwrap();
        doctor.run().unwrap();
        assert_eq!(probe.availability_calls("npx"), 1);
    }

    #[test]
    fn test_invalid_cache_entry_fails() {
        let temp = TempDir::new().unwrap();
        let cache_path = Utf8PathBuf::from_path_buf(temp.path().join("tools.json")).unwrap();
        std::fs::write(
            &cache_path,
            r#"{"npx":{"available":true,"version":"9","cachedAt":"2999-01-01T00:00:00Z","ttl":60}}"#,
        )
        .unwrap();
        let cache = Arc::new(ToolCache::open(&cache_path, Duration::from_secs(3600)));

        let output = DoctorCommand::new(config_in(&temp))
            .with_cache(cache)
            .with_probe(Arc::new(StaticProbe::new()))
            .run()
            .unwrap();

        assert!(!output.ok);
        let check = output.checks.iter().find(|c| c.name == "tool_cache").unwrap();
        assert_eq!(check.status, CheckStatus::Fail);
        assert!(check.details.contains("npx"));
    }

    #[test]
    fn test_offline_config_warns() {
        let temp = TempDir::new().unwrap();
        let mut config = config_in(&temp);
        config.defaults.offline = Some(true);
        let (_cache, doctor) = doctor(config, Arc::new(StaticProbe::new()));

        let output = doctor.run().unwrap();
        let network = output.checks.iter().find(|c| c.name == "network").unwrap();
        assert_eq!(network.status, CheckStatus::Warn);
    }

    #[test]
    fn test_output_dir_check_uses_existing_ancestor() {
        let temp = TempDir::new().unwrap();
        let nested = Utf8PathBuf::from_path_buf(temp.path().join("a/b/c")).unwrap();
        assert_eq!(
            nearest_existing_dir(&nested).as_std_path(),
            temp.path()
        );
        assert_eq!(nearest_existing_dir(Utf8Path::new("no-such-dir-xyz")), Utf8PathBuf::from("."));
    }

    #[test]
    fn test_doctor_output_serializes() {
        let temp = TempDir::new().unwrap();
        let (_cache, doctor) = doctor(config_in(&temp), Arc::new(StaticProbe::new()));
        let output = doctor.run().unwrap();
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["schema_version"], "1");
        assert!(json["checks"].is_array());
    }
}
