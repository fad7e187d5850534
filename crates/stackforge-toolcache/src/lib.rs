//! Tool-availability cache for stackforge
//!
//! Probing an external tool (`which` plus `<tool> --version`) is slow, so the
//! results are memoized with a TTL and persisted to a single JSON file. The
//! cache is an explicitly constructed value: load it at startup, pass it
//! around, save it after mutation.
//!
//! - [`ToolCache`]: entries, TTL expiry, persistence
//! - [`CacheValidator`]: per-entry invariants and repair
//! - [`CacheExporter`]: versioned export/import (`"1.0"`)
//! - [`ToolCacheManager`]: refresh and probe-on-miss over a [`ToolProbe`]

mod cache;
mod clock;
mod entry;
mod export;
mod manager;
mod validator;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use cache::{LoadOutcome, ToolCache};
pub use clock::{Clock, SystemClock};
pub use entry::{MAX_TTL, ToolCacheEntry};
pub use export::{CacheExportFormat, CacheExporter, EXPORT_FORMAT_VERSION, current_platform};
pub use manager::{ProbeError, ProbeSummary, ToolCacheManager, ToolProbe};
pub use validator::{CacheValidator, ValidationReport};
