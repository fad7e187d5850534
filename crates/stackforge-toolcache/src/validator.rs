use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use stackforge_utils::error::CacheError;

use crate::cache::ToolCache;
use crate::entry::{MAX_TTL, ToolCacheEntry};

/// Result of validating every entry of a cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// True when no entry is corrupted. A file that failed to parse is only
    /// a warning: an empty cache recovers by re-probing.
    pub valid: bool,
    pub total_entries: usize,
    pub corrupted_entries: Vec<String>,
    pub warnings: Vec<String>,
}

/// Checks cache entries against their invariants.
#[derive(Debug, Clone, Copy)]
pub struct CacheValidator {
    max_ttl: Duration,
}

impl Default for CacheValidator {
    fn default() -> Self {
        Self { max_ttl: MAX_TTL }
    }
}

impl CacheValidator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject a nil entry, a `cachedAt` after `now`, a negative TTL or a TTL
    /// above the maximum.
    pub fn validate_entry(
        &self,
        name: &str,
        entry: Option<&ToolCacheEntry>,
        now: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let Some(entry) = entry else {
            return Err(CacheError::NilEntry {
                name: name.to_string(),
            });
        };

        if entry.cached_at > now {
            return Err(CacheError::InvalidEntry {
                name: name.to_string(),
                reason: format!("cachedAt {} is in the future", entry.cached_at.to_rfc3339()),
            });
        }
        if entry.ttl_secs < 0 {
            return Err(CacheError::InvalidEntry {
                name: name.to_string(),
                reason: format!("negative ttl {}", entry.ttl_secs),
            });
        }
        let max = i64::try_from(self.max_ttl.as_secs()).unwrap_or(i64::MAX);
        if entry.ttl_secs > max {
            return Err(CacheError::InvalidEntry {
                name: name.to_string(),
                reason: format!("ttl {} exceeds maximum of {max} seconds", entry.ttl_secs),
            });
        }
        Ok(())
    }

    /// Run [`CacheValidator::validate_entry`] over every entry.
    #[must_use]
    pub fn validate(&self, cache: &ToolCache) -> ValidationReport {
        let now = cache.clock().now();
        let snapshot = cache.snapshot();
        let mut report = ValidationReport {
            valid: true,
            total_entries: snapshot.len(),
            ..ValidationReport::default()
        };

        if let Some(reason) = cache.load_error() {
            report
                .warnings
                .push(format!("cache file could not be parsed and was ignored: {reason}"));
        }

        for (name, entry) in &snapshot {
            if let Err(e) = self.validate_entry(name, Some(entry), now) {
                report.corrupted_entries.push(name.clone());
                report.warnings.push(e.to_string());
            } else if entry.is_expired_at(now) {
                report.warnings.push(format!("entry '{name}' has expired"));
            }
        }

        report.valid = report.corrupted_entries.is_empty();
        report
    }

    /// Drop every entry that fails validation; returns the dropped names.
    pub fn repair(&self, cache: &ToolCache) -> Vec<String> {
        let report = self.validate(cache);
        for name in &report.corrupted_entries {
            cache.remove(name);
            tracing::info!(tool = %name, "Removed invalid tool cache entry");
        }
        report.corrupted_entries
    }
}
