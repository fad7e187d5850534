use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Maximum TTL an entry may carry (24 hours)
pub const MAX_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// One memoized probe result.
///
/// Entries are replaced wholesale by `set`, never mutated in place. The
/// serialized keys (`available`, `version`, `cachedAt`, `ttl`) are shared by
/// the cache file and the export format; `ttl` is in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCacheEntry {
    pub available: bool,
    #[serde(default)]
    pub version: String,
    pub cached_at: DateTime<Utc>,
    /// Signed so that a tampered negative value survives parsing and can be
    /// reported by the validator.
    #[serde(rename = "ttl")]
    pub ttl_secs: i64,
}

impl ToolCacheEntry {
    #[must_use]
    pub fn new(
        available: bool,
        version: impl Into<String>,
        cached_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            available,
            version: version.into(),
            cached_at,
            ttl_secs: i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX),
        }
    }

    #[must_use]
    pub fn ttl(&self) -> TimeDelta {
        TimeDelta::try_seconds(self.ttl_secs).unwrap_or(TimeDelta::MAX)
    }

    /// `now - cached_at > ttl`. An age exactly equal to the TTL is still fresh.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.cached_at) > self.ttl()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_boundary_is_not_expired() {
        let entry = ToolCacheEntry::new(true, "1.0", at(0), Duration::from_secs(300));
        assert!(!entry.is_expired_at(at(299)));
        assert!(!entry.is_expired_at(at(300)));
        assert!(entry.is_expired_at(at(301)));
    }

    #[test]
    fn test_serialized_keys() {
        let entry = ToolCacheEntry::new(true, "9.0.0", at(0), Duration::from_secs(60));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["available"], true);
        assert_eq!(json["version"], "9.0.0");
        assert_eq!(json["ttl"], 60);
        assert!(json.get("cachedAt").is_some());
    }

    #[test]
    fn test_negative_ttl_parses() {
        let entry: ToolCacheEntry = serde_json::from_str(
            r#"{"available":true,"version":"","cachedAt":"2024-01-01T00:00:00Z","ttl":-5}"#,
        )
        .unwrap();
        assert_eq!(entry.ttl_secs, -5);
        assert!(entry.is_expired_at(entry.cached_at));
    }
}
