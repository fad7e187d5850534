//! Relocation of generated components into the project layout.
//!
//! Each component is produced in a scratch directory and then moved (or
//! copied, or linked) to `<root>/<canonical dir>`. The mapper refuses to
//! overwrite anything that already exists at the destination.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use walkdir::WalkDir;

use stackforge_config::MapMode;
use stackforge_utils::error::GenerationError;
use stackforge_utils::paths::{copy_dir_all, ensure_dir_all, remove_dir_if_exists};
use stackforge_utils::types::ComponentType;

/// Options for a single relocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapOptions {
    pub mode: MapMode,
    /// Extra path segment under the canonical dir, used when several
    /// components share a type
    pub suffix: Option<String>,
}

impl MapOptions {
    #[must_use]
    pub fn new(mode: MapMode) -> Self {
        Self { mode, suffix: None }
    }

    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }
}

/// Destination of `component_type` relative to the project root.
#[must_use]
pub fn canonical_path(component_type: ComponentType, suffix: Option<&str>) -> Utf8PathBuf {
    let base = Utf8PathBuf::from(component_type.canonical_dir());
    match suffix {
        Some(s) => base.join(s),
        None => base,
    }
}

/// Step run after a component has been relocated.
pub trait PostMapHook: Send + Sync {
    fn name(&self) -> &str;

    /// Returns how many files were changed.
    fn after_map(&self, source: &Utf8Path, dest: &Utf8Path) -> anyhow::Result<usize>;
}

/// Rewrites the scratch path to the final path inside `.env*` files.
///
/// Bootstrap tools sometimes bake their working directory into generated
/// environment files.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvReferenceRewriter;

impl PostMapHook for EnvReferenceRewriter {
    fn name(&self) -> &str {
        "env-reference-rewriter"
    }

    fn after_map(&self, source: &Utf8Path, dest: &Utf8Path) -> anyhow::Result<usize> {
        let mut changed = 0;
        for entry in WalkDir::new(dest).follow_links(false) {
            let entry = entry.with_context(|| format!("Failed to walk {dest}"))?;
            let is_env = entry.file_name().to_str().is_some_and(|n| n.starts_with(".env"));
            if !entry.file_type().is_file() || !is_env {
                continue;
            }
            let path = entry.path();
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            if !content.contains(source.as_str()) {
                continue;
            }
            fs::write(path, content.replace(source.as_str(), dest.as_str()))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            changed += 1;
        }
        Ok(changed)
    }
}

#[derive(Default)]
pub struct StructureMapper {
    hooks: Vec<Box<dyn PostMapHook>>,
}

impl std::fmt::Debug for StructureMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hooks: Vec<_> = self.hooks.iter().map(|h| h.name()).collect();
        f.debug_struct("StructureMapper").field("hooks", &hooks).finish()
    }
}

impl StructureMapper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_hook(mut self, hook: Box<dyn PostMapHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Relocate `source` to `<target_root>/<canonical path>` and return the
    /// destination.
    pub fn map(
        &self,
        source: &Utf8Path,
        target_root: &Utf8Path,
        component_type: ComponentType,
        options: &MapOptions,
    ) -> Result<Utf8PathBuf, GenerationError> {
        let dest = target_root.join(canonical_path(component_type, options.suffix.as_deref()));
        let mapping_err = |message: String| GenerationError::structure_mapping(message);

        if !source.is_dir() {
            return Err(mapping_err(format!("generated output {source} is missing")));
        }
        if fs::symlink_metadata(&dest).is_ok() {
            return Err(mapping_err(format!("{dest} already exists"))
                .with_suggestion("Remove or rename the existing directory, or choose another output directory"));
        }
        if let Some(parent) = dest.parent() {
            ensure_dir_all(parent)
                .map_err(|e| mapping_err(format!("could not create {parent}")).with_cause(e))?;
        }

        match options.mode {
            MapMode::Move => move_dir(source, &dest),
            MapMode::Copy => copy_dir_all(source, &dest).map(|_| ()),
            MapMode::Symlink => link_dir(source, &dest),
        }
        .map_err(|e| {
            mapping_err(format!("could not {} {source} to {dest}", options.mode))
                .with_cause(format!("{e:#}"))
        })?;

        tracing::debug!(
            component_type = %component_type,
            source = %source,
            dest = %dest,
            mode = %options.mode,
            "Relocated component"
        );
        Ok(dest)
    }

    /// Run every hook for a relocated component. Hook failures are warnings.
    pub fn run_hooks(&self, source: &Utf8Path, dest: &Utf8Path) -> Vec<String> {
        let mut warnings = Vec::new();
        for hook in &self.hooks {
            match hook.after_map(source, dest) {
                Ok(changed) => {
                    tracing::debug!(hook = hook.name(), dest = %dest, changed, "Post-map hook ran");
                }
                Err(e) => warnings.push(format!("{} failed for {dest}: {e:#}", hook.name())),
            }
        }
        warnings
    }

    /// Structural checks over the final layout; problems come back as
    /// warnings, never errors.
    #[must_use]
    pub fn validate(&self, root: &Utf8Path, components: &[(ComponentType, Utf8PathBuf)]) -> Vec<String> {
        let mut warnings = Vec::new();
        for (component_type, relative) in components {
            let dir = root.join(relative);
            if !dir.is_dir() {
                warnings.push(format!("{component_type} component missing at {dir}"));
                continue;
            }
            if let Some(problem) = check_layout(*component_type, &dir) {
                warnings.push(format!("{component_type} component at {dir}: {problem}"));
            }
        }
        warnings
    }
}

fn check_layout(component_type: ComponentType, dir: &Utf8Path) -> Option<&'static str> {
    let has = |name: &str| dir.join(name).exists();
    match component_type {
        ComponentType::Nextjs => (!has("package.json")).then_some("package.json not found"),
        ComponentType::GoBackend => {
            if !has("go.mod") {
                Some("go.mod not found")
            } else if !has("main.go") && !dir.join("cmd").is_dir() {
                Some("no entry point (main.go or cmd/)")
            } else {
                None
            }
        }
        ComponentType::Android => {
            let found = ["settings.gradle", "settings.gradle.kts", "build.gradle", "build.gradle.kts"]
                .into_iter()
                .any(|f| has(f));
            (!found).then_some("no Gradle settings or build file")
        }
        ComponentType::Ios => {
            let xcodeproj = dir.read_dir_utf8().is_ok_and(|entries| {
                entries
                    .flatten()
                    .any(|e| e.file_name().ends_with(".xcodeproj"))
            });
            (!has("Package.swift") && !xcodeproj).then_some("no Package.swift or .xcodeproj")
        }
    }
}

fn move_dir(source: &Utf8Path, dest: &Utf8Path) -> anyhow::Result<()> {
    if fs::rename(source, dest).is_ok() {
        return Ok(());
    }
    // rename fails across filesystems
    copy_dir_all(source, dest)?;
    remove_dir_if_exists(source).with_context(|| format!("Failed to remove {source} after copy"))?;
    Ok(())
}

#[cfg(unix)]
fn link_dir(source: &Utf8Path, dest: &Utf8Path) -> anyhow::Result<()> {
    let absolute = source
        .canonicalize_utf8()
        .with_context(|| format!("Failed to resolve {source}"))?;
    std::os::unix::fs::symlink(&absolute, dest)
        .with_context(|| format!("Failed to link {dest} to {absolute}"))
}

#[cfg(windows)]
fn link_dir(source: &Utf8Path, dest: &Utf8Path) -> anyhow::Result<()> {
    let absolute = source
        .canonicalize_utf8()
        .with_context(|| format!("Failed to resolve {source}"))?;
    std::os::windows::fs::symlink_dir(&absolute, dest)
        .with_context(|| format!("Failed to link {dest} to {absolute}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn root(temp: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap()
    }

    fn staged(root: &Utf8Path, name: &str, files: &[&str]) -> Utf8PathBuf {
        let dir = root.join("staging").join(name);
        for file in files {
            let path = dir.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, "x").unwrap();
        }
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_canonical_path_with_suffix() {
        assert_eq!(canonical_path(ComponentType::Android, None), "mobile/android");
        assert_eq!(canonical_path(ComponentType::GoBackend, Some("billing")), "backend/billing");
    }

    #[test]
    fn test_move_relocates_and_removes_source() {
        let temp = TempDir::new().unwrap();
        let root = root(&temp);
        let source = staged(&root, "api", &["go.mod", "main.go"]);
        let out = root.join("out");

        let dest = StructureMapper::new()
            .map(&source, &out, ComponentType::GoBackend, &MapOptions::default())
            .unwrap();
        assert_eq!(dest, out.join("backend"));
        assert!(dest.join("go.mod").exists());
        assert!(!source.exists());
    }

    #[test]
    fn test_copy_preserves_source() {
        let temp = TempDir::new().unwrap();
        let root = root(&temp);
        let source = staged(&root, "web", &["package.json"]);
        let out = root.join("out");

        StructureMapper::new()
            .map(&source, &out, ComponentType::Nextjs, &MapOptions::new(MapMode::Copy))
            .unwrap();
        assert!(source.join("package.json").exists());
        assert!(out.join("frontend/package.json").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_mode() {
        let temp = TempDir::new().unwrap();
        let root = root(&temp);
        let source = staged(&root, "app", &["Package.swift"]);
        let out = root.join("out");

        let dest = StructureMapper::new()
            .map(&source, &out, ComponentType::Ios, &MapOptions::new(MapMode::Symlink))
            .unwrap();
        assert!(fs::symlink_metadata(&dest).unwrap().file_type().is_symlink());
        assert!(dest.join("Package.swift").exists());
    }

    #[test]
    fn test_existing_destination_is_never_overwritten() {
        let temp = TempDir::new().unwrap();
        let root = root(&temp);
        let source = staged(&root, "web", &["package.json"]);
        let out = root.join("out");
        fs::create_dir_all(out.join("frontend")).unwrap();
        fs::write(out.join("frontend/mine.txt"), "keep").unwrap();

        let err = StructureMapper::new()
            .map(&source, &out, ComponentType::Nextjs, &MapOptions::default())
            .unwrap_err();
        assert_eq!(err.category, stackforge_utils::error::ErrorCategory::StructureMapping);
        assert!(out.join("frontend/mine.txt").exists());
        assert!(source.exists());
    }

    #[test]
    fn test_validate_reports_warnings() {
        let temp = TempDir::new().unwrap();
        let root = root(&temp);
        fs::create_dir_all(root.join("backend")).unwrap();
        fs::write(root.join("backend/go.mod"), "module x").unwrap();
        fs::create_dir_all(root.join("frontend")).unwrap();
        fs::write(root.join("frontend/package.json"), "{}").unwrap();
        fs::create_dir_all(root.join("mobile/ios/App.xcodeproj")).unwrap();

        let warnings = StructureMapper::new().validate(
            &root,
            &[
                (ComponentType::GoBackend, "backend".into()),
                (ComponentType::Nextjs, "frontend".into()),
                (ComponentType::Ios, "mobile/ios".into()),
                (ComponentType::Android, "mobile/android".into()),
            ],
        );
        assert_eq!(warnings.len(), 2, "{warnings:?}");
        assert!(warnings[0].contains("entry point"));
        assert!(warnings[1].contains("missing"));
    }

    #[test]
    fn test_env_reference_rewriter() {
        let temp = TempDir::new().unwrap();
        let root = root(&temp);
        let source = staged(&root, "web", &["package.json"]);
        fs::write(source.join(".env.local"), format!("ROOT={source}/public\n")).unwrap();
        fs::write(source.join("readme.md"), format!("built in {source}\n")).unwrap();
        let out = root.join("out");

        let mapper = StructureMapper::new().with_hook(Box::new(EnvReferenceRewriter));
        let dest = mapper
            .map(&source, &out, ComponentType::Nextjs, &MapOptions::default())
            .unwrap();
        assert!(mapper.run_hooks(&source, &dest).is_empty());

        let env = fs::read_to_string(dest.join(".env.local")).unwrap();
        assert_eq!(env, format!("ROOT={dest}/public\n"));
        let readme = fs::read_to_string(dest.join("readme.md")).unwrap();
        assert!(readme.contains(source.as_str()));
    }
}
