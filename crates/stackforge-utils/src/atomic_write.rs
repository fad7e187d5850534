//! Atomic file writes: temp file, fsync, rename.
//!
//! Used for the tool cache, cache exports and every file written by the
//! embedded fallback generators, so a crash never leaves a half-written file.

use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

/// Result of an atomic write operation
#[derive(Debug, Clone, Default)]
pub struct AtomicWriteResult {
    /// Bytes written to the final file
    pub bytes_written: usize,
    /// Whether the cross-filesystem fallback was used
    pub used_cross_filesystem_fallback: bool,
    pub warnings: Vec<String>,
}

/// Atomically write `content` to `path`, creating parent directories.
///
/// Line endings are normalized to LF. If the rename fails with `EXDEV` the
/// content is copied into a second temp file beside the target and renamed
/// from there.
pub fn write_file_atomic(path: &Utf8Path, content: &str) -> Result<AtomicWriteResult> {
    write_bytes_atomic(path, normalize_line_endings(content).as_bytes())
}

/// Byte-level variant of [`write_file_atomic`]; no line-ending normalization.
pub fn write_bytes_atomic(path: &Utf8Path, bytes: &[u8]) -> Result<AtomicWriteResult> {
    let mut result = AtomicWriteResult {
        bytes_written: bytes.len(),
        ..AtomicWriteResult::default()
    };

    let parent = path
        .parent()
        .filter(|p| !p.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create parent directory: {parent}"))?;

    let mut temp_file = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temporary file in: {parent}"))?;
    temp_file
        .write_all(bytes)
        .with_context(|| "Failed to write content to temporary file")?;
    temp_file
        .as_file()
        .sync_all()
        .with_context(|| "Failed to fsync temporary file")?;

    let temp_path = temp_file.path().to_path_buf();

    match temp_file.persist(path.as_std_path()) {
        Ok(_) => {}
        Err(e) if is_cross_filesystem_error(&e.error) => {
            result.used_cross_filesystem_fallback = true;
            result
                .warnings
                .push("Used cross-filesystem fallback (copy, fsync, replace)".to_string());
            // Keep the temp file alive until the fallback has read it.
            let file = e.file;
            cross_filesystem_copy_from_path(&temp_path, path)?;
            drop(file);
        }
        Err(e) => {
            return Err(anyhow::anyhow!(e.error))
                .with_context(|| format!("Failed to atomically write file: {path}"));
        }
    }

    Ok(result)
}

fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n").replace('\r', "\n")
}

#[cfg(unix)]
fn is_cross_filesystem_error(err: &std::io::Error) -> bool {
    err.raw_os_error() == Some(18) // EXDEV
}

#[cfg(windows)]
fn is_cross_filesystem_error(err: &std::io::Error) -> bool {
    err.raw_os_error() == Some(17) // ERROR_NOT_SAME_DEVICE
}

fn cross_filesystem_copy_from_path(temp_path: &Path, target: &Utf8Path) -> Result<()> {
    let content = fs::read(temp_path)
        .with_context(|| "Failed to read temporary file for cross-filesystem copy")?;

    let target_dir = target.parent().unwrap_or_else(|| Utf8Path::new("."));
    let mut target_temp = NamedTempFile::new_in(target_dir)
        .with_context(|| format!("Failed to create temp file in target directory: {target_dir}"))?;
    target_temp
        .write_all(&content)
        .with_context(|| "Failed to write content during cross-filesystem copy")?;
    target_temp
        .as_file()
        .sync_all()
        .with_context(|| "Failed to fsync during cross-filesystem copy")?;
    target_temp
        .persist(target.as_std_path())
        .map_err(|e| anyhow::anyhow!(e.error))
        .with_context(|| "Failed to persist during cross-filesystem copy")?;

    Ok(())
}
