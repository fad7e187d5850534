use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use stackforge_utils::atomic_write::write_file_atomic;
use stackforge_utils::error::CacheError;
use stackforge_utils::types::CacheStats;

use crate::clock::{Clock, SystemClock};
use crate::entry::{MAX_TTL, ToolCacheEntry};

/// What [`ToolCache::load`] found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// File parsed; number of entries loaded
    Loaded(usize),
    /// No file yet (first run) or no path configured
    Missing,
    /// File unreadable or not valid JSON; the cache is now empty
    Corrupt(String),
}

/// TTL cache of tool probe results.
///
/// Safe for concurrent reads from every worker; mutation is expected
/// before or after a generation batch, not during it.
///
/// ```rust
/// use stackforge_toolcache::ToolCache;
/// use std::time::Duration;
///
/// let cache = ToolCache::in_memory(Duration::from_secs(300));
/// cache.set("npx", true, "9.0.0");
/// assert!(cache.get("npx").unwrap().available);
/// assert!(cache.get("go").is_none());
/// ```
#[derive(Debug)]
pub struct ToolCache {
    path: Option<Utf8PathBuf>,
    ttl: Duration,
    entries: RwLock<HashMap<String, ToolCacheEntry>>,
    clock: Arc<dyn Clock>,
    load_error: RwLock<Option<String>>,
}

impl ToolCache {
    /// Cache without a backing file; `save`/`load` are no-ops.
    #[must_use]
    pub fn in_memory(ttl: Duration) -> Self {
        Self {
            path: None,
            ttl: ttl.min(MAX_TTL),
            entries: RwLock::new(HashMap::new()),
            clock: Arc::new(SystemClock),
            load_error: RwLock::new(None),
        }
    }

    /// Cache persisted at `path`. Nothing is read until [`ToolCache::load`].
    #[must_use]
    pub fn with_path(path: impl Into<Utf8PathBuf>, ttl: Duration) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::in_memory(ttl)
        }
    }

    /// Construct and immediately load from `path`.
    #[must_use]
    pub fn open(path: impl Into<Utf8PathBuf>, ttl: Duration) -> Self {
        let cache = Self::with_path(path, ttl);
        let _ = cache.load();
        cache
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub fn path(&self) -> Option<&Utf8Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Fresh entry for `name`, or `None` when absent or expired.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ToolCacheEntry> {
        let now = self.clock.now();
        self.read()
            .get(name)
            .filter(|entry| !entry.is_expired_at(now))
            .cloned()
    }

    /// Raw entry regardless of expiry.
    #[must_use]
    pub fn peek(&self, name: &str) -> Option<ToolCacheEntry> {
        self.read().get(name).cloned()
    }

    /// True when `name` is absent or its entry has expired.
    #[must_use]
    pub fn is_expired(&self, name: &str) -> bool {
        let now = self.clock.now();
        self.read()
            .get(name)
            .is_none_or(|entry| entry.is_expired_at(now))
    }

    /// Overwrite the entry for `name`, stamped with the current time and the
    /// cache's TTL.
    pub fn set(&self, name: &str, available: bool, version: impl Into<String>) {
        let entry = ToolCacheEntry::new(available, version, self.clock.now(), self.ttl);
        self.write().insert(name.to_string(), entry);
    }

    pub(crate) fn remove(&self, name: &str) -> bool {
        self.write().remove(name).is_some()
    }

    /// Counts every stored entry, expired ones included.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let entries = self.read();
        let available = entries.values().filter(|e| e.available).count();
        CacheStats {
            total_entries: entries.len(),
            available_tools: available,
            unavailable_tools: entries.len() - available,
            ttl_secs: self.ttl.as_secs(),
        }
    }

    /// Tool names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Copy of every entry, sorted by tool name.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, ToolCacheEntry> {
        self.read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    /// Reason the last `load` degraded to an empty cache, if it did.
    #[must_use]
    pub fn load_error(&self) -> Option<String> {
        self.load_error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace in-memory entries with the file contents.
    ///
    /// Never fails: a missing file is a first run and a corrupt one degrades
    /// to an empty cache. Corruption is recorded for [`ToolCache::load_error`].
    pub fn load(&self) -> LoadOutcome {
        let Some(path) = &self.path else {
            return LoadOutcome::Missing;
        };

        let outcome = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<HashMap<String, ToolCacheEntry>>(&content)
            {
                Ok(entries) => {
                    let count = entries.len();
                    *self.write() = entries;
                    LoadOutcome::Loaded(count)
                }
                Err(e) => LoadOutcome::Corrupt(e.to_string()),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LoadOutcome::Missing,
            Err(e) => LoadOutcome::Corrupt(e.to_string()),
        };

        let mut load_error = self
            .load_error
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match &outcome {
            LoadOutcome::Corrupt(reason) => {
                tracing::warn!(path = %path, reason = %reason, "Tool cache file is corrupt; starting empty");
                self.write().clear();
                *load_error = Some(reason.clone());
            }
            LoadOutcome::Loaded(count) => {
                tracing::debug!(path = %path, entries = count, "Loaded tool cache");
                *load_error = None;
            }
            LoadOutcome::Missing => *load_error = None,
        }
        outcome
    }

    /// Persist all entries atomically. No-op for an in-memory cache.
    pub fn save(&self) -> Result<(), CacheError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&self.snapshot()).map_err(|e| CacheError::Io {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        write_file_atomic(path, &json).map_err(|e| CacheError::Io {
            path: path.to_string(),
            reason: format!("{e:#}"),
        })?;
        tracing::debug!(path = %path, entries = self.len(), "Saved tool cache");
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, ToolCacheEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, ToolCacheEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}
