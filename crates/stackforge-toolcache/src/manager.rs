use std::sync::Arc;
use thiserror::Error;

use crate::cache::ToolCache;

/// A probe could not determine a tool's status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("probe for '{tool}' failed: {reason}")]
pub struct ProbeError {
    pub tool: String,
    pub reason: String,
}

impl ProbeError {
    #[must_use]
    pub fn new(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            reason: reason.into(),
        }
    }
}

/// Reports whether an external tool is installed and which version.
pub trait ToolProbe: Send + Sync {
    fn is_available(&self, name: &str) -> Result<bool, ProbeError>;

    fn version(&self, name: &str) -> Result<String, ProbeError>;
}

/// Which tools a refresh or ensure pass actually probed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeSummary {
    /// Probed and written to the cache
    pub probed: Vec<String>,
    /// Served from a fresh cache entry
    pub cached: Vec<String>,
    /// Probe failed; nothing cached, tool treated as unavailable this run
    pub failed: Vec<ProbeError>,
}

impl ProbeSummary {
    /// True when the cache was modified and should be saved.
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.probed.is_empty()
    }
}

/// Facade over a [`ToolCache`] and a [`ToolProbe`].
#[derive(Debug, Clone)]
pub struct ToolCacheManager {
    cache: Arc<ToolCache>,
}

impl ToolCacheManager {
    #[must_use]
    pub fn new(cache: Arc<ToolCache>) -> Self {
        Self { cache }
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<ToolCache> {
        &self.cache
    }

    /// Re-probe every known tool (or `tools` when given) and overwrite
    /// entries regardless of TTL.
    pub fn refresh(&self, probe: &dyn ToolProbe, tools: Option<&[String]>) -> ProbeSummary {
        let names = tools.map_or_else(|| self.cache.names(), <[String]>::to_vec);
        let mut summary = ProbeSummary::default();
        for name in names {
            self.probe_into_cache(probe, &name, &mut summary);
        }
        tracing::info!(
            refreshed = summary.probed.len(),
            failed = summary.failed.len(),
            "Refreshed tool cache"
        );
        summary
    }

    /// Serve each tool from the cache, probing only on a miss.
    pub fn ensure(&self, probe: &dyn ToolProbe, tools: &[&str]) -> ProbeSummary {
        let mut summary = ProbeSummary::default();
        for &name in tools {
            if self.cache.get(name).is_some() {
                summary.cached.push(name.to_string());
            } else {
                self.probe_into_cache(probe, name, &mut summary);
            }
        }
        tracing::debug!(
            probed = ?summary.probed,
            cached = ?summary.cached,
            "Ensured tool cache entries"
        );
        summary
    }

    fn probe_into_cache(&self, probe: &dyn ToolProbe, name: &str, summary: &mut ProbeSummary) {
        match probe.is_available(name) {
            Ok(true) => {
                // a tool that runs but will not report a version is still usable
                let version = probe.version(name).unwrap_or_else(|e| {
                    tracing::debug!(tool = %name, error = %e, "Version probe failed");
                    String::new()
                });
                self.cache.set(name, true, version);
                summary.probed.push(name.to_string());
            }
            Ok(false) => {
                self.cache.set(name, false, "");
                summary.probed.push(name.to_string());
            }
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "Tool probe failed");
                summary.failed.push(e);
            }
        }
    }
}
