use camino::Utf8Path;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use stackforge_utils::atomic_write::write_file_atomic;
use stackforge_utils::error::CacheError;

use crate::cache::ToolCache;
use crate::entry::ToolCacheEntry;

/// The only export version accepted by import
pub const EXPORT_FORMAT_VERSION: &str = "1.0";

/// Snapshot of a cache as written by [`CacheExporter::export`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheExportFormat {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub platform: String,
    pub entries: BTreeMap<String, ToolCacheEntry>,
}

/// Lenient shape used on import so that each rejection reason can be told
/// apart instead of surfacing as a generic parse error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportDocument {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    entries: Option<BTreeMap<String, Option<ToolCacheEntry>>>,
}

/// `<os>/<arch>`, e.g. `linux/x86_64`
#[must_use]
pub fn current_platform() -> String {
    format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH)
}

/// Versioned export and all-or-nothing import of cache contents.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheExporter;

impl CacheExporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write every entry, expired or not, to `path`.
    pub fn export(&self, cache: &ToolCache, path: &Utf8Path) -> Result<CacheExportFormat, CacheError> {
        let document = CacheExportFormat {
            version: EXPORT_FORMAT_VERSION.to_string(),
            exported_at: cache.clock().now(),
            platform: current_platform(),
            entries: cache.snapshot(),
        };
        let json = serde_json::to_string_pretty(&document).map_err(|e| CacheError::Io {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        write_file_atomic(path, &json).map_err(|e| CacheError::Io {
            path: path.to_string(),
            reason: format!("{e:#}"),
        })?;
        tracing::info!(path = %path, entries = document.entries.len(), "Exported tool cache");
        Ok(document)
    }

    /// Import entries from `path` into `cache`.
    ///
    /// The file is rejected for a version other than `"1.0"`, a missing
    /// `entries` field or a null entry; every check runs before the first
    /// `set`, so a rejected file leaves the cache untouched. Imported entries
    /// are re-stamped with the importing cache's clock and TTL, so the
    /// exporter's `cachedAt` and `ttl` are not checked (a source host whose
    /// clock runs ahead still imports). Returns the number of entries imported.
    pub fn import(&self, cache: &ToolCache, path: &Utf8Path) -> Result<usize, CacheError> {
        let content = std::fs::read_to_string(path).map_err(|e| CacheError::Io {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        let document: ImportDocument =
            serde_json::from_str(&content).map_err(|e| CacheError::Parse {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        let version = document.version.unwrap_or_default();
        if version != EXPORT_FORMAT_VERSION {
            return Err(CacheError::UnsupportedVersion {
                version,
                expected: EXPORT_FORMAT_VERSION.to_string(),
            });
        }

        let entries = document.entries.ok_or(CacheError::MissingEntries)?;
        let mut validated = Vec::with_capacity(entries.len());
        for (name, entry) in &entries {
            let Some(entry) = entry else {
                return Err(CacheError::NilEntry { name: name.clone() });
            };
            validated.push((name, entry));
        }

        for (name, entry) in &validated {
            cache.set(name, entry.available, entry.version.clone());
        }
        tracing::info!(path = %path, entries = validated.len(), "Imported tool cache");
        Ok(validated.len())
    }
}
