//! Helpers shared by command handlers.

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use std::sync::Arc;

use stackforge_toolcache::{LoadOutcome, ToolCache};

use crate::{Config, StackforgeError};

/// Current directory as UTF-8.
pub fn current_dir() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    Utf8PathBuf::from_path_buf(cwd)
        .map_err(|p| anyhow::anyhow!("current directory is not valid UTF-8: {}", p.display()))
}

/// Output directory with a relative path resolved against the current directory.
pub fn resolve_output_dir(config: &Config) -> Result<Utf8PathBuf> {
    Ok(config.output_dir_from(&current_dir()?))
}

/// Load the configured tool cache, warning (not failing) on a corrupt file.
pub fn open_cache(config: &Config) -> Arc<ToolCache> {
    let cache = ToolCache::with_path(config.cache_path(), config.cache_ttl());
    if let LoadOutcome::Corrupt(reason) = cache.load() {
        eprintln!("⚠ Tool cache at {} was unreadable and starts empty: {reason}", config.cache_path());
    }
    Arc::new(cache)
}

/// Persist the cache, mapping failures to a cache error.
pub fn save_cache(cache: &ToolCache) -> Result<()> {
    cache.save().map_err(StackforgeError::Cache)?;
    Ok(())
}

/// Print a value as pretty JSON.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON output")?;
    println!("{json}");
    Ok(())
}
