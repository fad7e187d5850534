//! Home-directory resolution and filesystem helpers.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::cell::RefCell;
use std::fs;
use walkdir::WalkDir;

thread_local! {
    static THREAD_HOME: RefCell<Option<Utf8PathBuf>> = const { RefCell::new(None) };
}

/// Resolve stackforge home:
/// 1) thread-local override (tests use this)
/// 2) env `STACKFORGE_HOME`
/// 3) `~/.stackforge`, or `.stackforge` when no home directory is known
#[must_use]
pub fn stackforge_home() -> Utf8PathBuf {
    if let Some(tl) = THREAD_HOME.with(|tl| tl.borrow().clone()) {
        return tl;
    }
    if let Ok(p) = std::env::var("STACKFORGE_HOME") {
        return Utf8PathBuf::from(p);
    }
    dirs::home_dir()
        .and_then(|home| Utf8PathBuf::from_path_buf(home).ok())
        .map_or_else(
            || Utf8PathBuf::from(".stackforge"),
            |home| home.join(".stackforge"),
        )
}

/// Returns `<STACKFORGE_HOME>/cache`
#[must_use]
pub fn cache_dir() -> Utf8PathBuf {
    stackforge_home().join("cache")
}

/// Returns `<STACKFORGE_HOME>/cache/tools.json`
#[must_use]
pub fn default_tool_cache_file() -> Utf8PathBuf {
    cache_dir().join("tools.json")
}

/// Returns `<STACKFORGE_HOME>/backups`
#[must_use]
pub fn backups_dir() -> Utf8PathBuf {
    stackforge_home().join("backups")
}

/// mkdir -p; treat `AlreadyExists` as success (removes TOCTTOU races)
pub fn ensure_dir_all<P: AsRef<std::path::Path>>(p: P) -> std::io::Result<()> {
    match fs::create_dir_all(&p) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}

/// Recursively copy `src` into `dst`, creating `dst`.
///
/// Symlinks are recreated as symlinks on Unix rather than followed.
/// Returns the number of regular files copied.
pub fn copy_dir_all(src: &Utf8Path, dst: &Utf8Path) -> Result<usize> {
    ensure_dir_all(dst).with_context(|| format!("Failed to create directory: {dst}"))?;
    let mut copied = 0;

    for entry in WalkDir::new(src).min_depth(1).follow_links(false) {
        let entry = entry.with_context(|| format!("Failed to walk directory: {src}"))?;
        let relative = entry
            .path()
            .strip_prefix(src.as_std_path())
            .with_context(|| format!("Entry escaped source root: {}", entry.path().display()))?;
        let target = dst.as_std_path().join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            ensure_dir_all(&target)
                .with_context(|| format!("Failed to create directory: {}", target.display()))?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target).with_context(|| {
                format!(
                    "Failed to copy {} to {}",
                    entry.path().display(),
                    target.display()
                )
            })?;
            copied += 1;
        }
    }

    Ok(copied)
}

#[cfg(unix)]
fn copy_symlink(src: &std::path::Path, dst: &std::path::Path) -> Result<()> {
    let link = fs::read_link(src).with_context(|| format!("Failed to read link: {}", src.display()))?;
    std::os::unix::fs::symlink(&link, dst)
        .with_context(|| format!("Failed to recreate link: {}", dst.display()))
}

#[cfg(not(unix))]
fn copy_symlink(src: &std::path::Path, dst: &std::path::Path) -> Result<()> {
    if src.is_dir() {
        let src = Utf8Path::from_path(src).context("Non UTF-8 path")?;
        let dst = Utf8Path::from_path(dst).context("Non UTF-8 path")?;
        copy_dir_all(src, dst).map(|_| ())
    } else {
        fs::copy(src, dst)
            .map(|_| ())
            .with_context(|| format!("Failed to copy {}", src.display()))
    }
}

/// Remove a directory tree if it exists. Returns whether anything was removed.
pub fn remove_dir_if_exists(path: &Utf8Path) -> std::io::Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() || meta.is_file() => {
            fs::remove_file(path)?;
            Ok(true)
        }
        Ok(_) => {
            fs::remove_dir_all(path)?;
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// True when `path` is a directory with at least one entry.
#[must_use]
pub fn dir_has_entries(path: &Utf8Path) -> bool {
    fs::read_dir(path).is_ok_and(|mut entries| entries.next().is_some())
}

/// Convert a std path into a UTF-8 path with a contextual error.
pub fn to_utf8(path: std::path::PathBuf) -> Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path)
        .map_err(|p| anyhow::anyhow!("Path is not valid UTF-8: {}", p.display()))
}

/// RAII guard for isolated home that clears thread-local state on drop
#[cfg(any(test, feature = "test-utils"))]
pub struct HomeGuard {
    inner: tempfile::TempDir,
}

#[cfg(any(test, feature = "test-utils"))]
impl Drop for HomeGuard {
    fn drop(&mut self) {
        THREAD_HOME.with(|tl| *tl.borrow_mut() = None);
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl std::ops::Deref for HomeGuard {
    type Target = tempfile::TempDir;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Give this test thread a unique home under the system temp dir.
#[cfg(any(test, feature = "test-utils"))]
#[must_use]
pub fn with_isolated_home() -> HomeGuard {
    let td = tempfile::TempDir::new().expect("create temp home");
    let p = Utf8PathBuf::from_path_buf(td.path().to_path_buf()).expect("utf8 temp home");
    THREAD_HOME.with(|tl| *tl.borrow_mut() = Some(p));
    HomeGuard { inner: td }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn utf8_temp() -> (TempDir, Utf8PathBuf) {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        (temp, root)
    }

    #[test]
    fn test_isolated_home_overrides_resolution() {
        let guard = with_isolated_home();
        let home = stackforge_home();
        assert_eq!(home.as_std_path(), guard.path());
        assert_eq!(cache_dir(), home.join("cache"));
        assert_eq!(default_tool_cache_file(), home.join("cache").join("tools.json"));
    }

    #[test]
    fn test_copy_dir_all_copies_nested_tree() {
        let (_temp, root) = utf8_temp();
        let src = root.join("src");
        fs::create_dir_all(src.join("a/b")).unwrap();
        fs::write(src.join("top.txt"), "top").unwrap();
        fs::write(src.join("a/b/deep.txt"), "deep").unwrap();

        let dst = root.join("dst");
        let copied = copy_dir_all(&src, &dst).unwrap();

        assert_eq!(copied, 2);
        assert_eq!(fs::read_to_string(dst.join("top.txt")).unwrap(), "top");
        assert_eq!(fs::read_to_string(dst.join("a/b/deep.txt")).unwrap(), "deep");
    }

    #[test]
    fn test_remove_dir_if_exists() {
        let (_temp, root) = utf8_temp();
        let dir = root.join("gone");
        fs::create_dir_all(dir.join("inner")).unwrap();

        assert!(remove_dir_if_exists(&dir).unwrap());
        assert!(!dir.exists());
        assert!(!remove_dir_if_exists(&dir).unwrap());
    }

    #[test]
    fn test_dir_has_entries() {
        let (_temp, root) = utf8_temp();
        assert!(!dir_has_entries(&root.join("missing")));
        fs::create_dir_all(root.join("empty")).unwrap();
        assert!(!dir_has_entries(&root.join("empty")));
        fs::write(root.join("empty/file"), "x").unwrap();
        assert!(dir_has_entries(&root.join("empty")));
    }
}
