//! Output directory protection: backups, restore on failure and cleanup.

mod common;

use std::sync::Arc;
use tempfile::TempDir;

use stackforge::{
    CancellationToken, ComponentSpec, ComponentType, GenerationError, GeneratorRegistry,
    TemplateFallback,
};
use stackforge_engine::test_support::{ScriptedExecutor, StaticFallback};
use stackforge_toolcache::test_support::StaticProbe;

use common::{options, orchestrator, utf8_root};

fn failing_batch_registry() -> GeneratorRegistry {
    let mut registry = GeneratorRegistry::new();
    registry.register_fallback(Arc::new(TemplateFallback::new(ComponentType::Nextjs)));
    registry.register_fallback(Arc::new(
        StaticFallback::new(ComponentType::GoBackend)
            .failing(GenerationError::tool_execution("template write failed")),
    ));
    registry
}

#[test]
fn populated_output_is_restored_after_failure() {
    let temp = TempDir::new().unwrap();
    let root = utf8_root(&temp);
    let out = root.join("acme");
    std::fs::create_dir_all(out.join("docs")).unwrap();
    std::fs::write(out.join("README.md"), "keep me\n").unwrap();
    std::fs::write(out.join("docs/notes.txt"), "notes\n").unwrap();

    let mut opts = options(&root);
    opts.offline = true;
    let orch = orchestrator(opts, failing_batch_registry(), StaticProbe::new());

    let specs = vec![
        ComponentSpec::new(ComponentType::Nextjs, "web"),
        ComponentSpec::new(ComponentType::GoBackend, "api"),
    ];
    let report = orch.generate(&specs, &out, &CancellationToken::new());

    assert!(!report.success);
    let rollback = report.rollback.expect("failed run reports its rollback");
    assert!(rollback.succeeded, "{:?}", rollback.warnings);
    assert!(rollback.restored_backup.is_some());

    assert_eq!(std::fs::read_to_string(out.join("README.md")).unwrap(), "keep me\n");
    assert_eq!(std::fs::read_to_string(out.join("docs/notes.txt")).unwrap(), "notes\n");
    assert!(!out.join("frontend").exists());
    assert!(!out.join(stackforge_engine::STAGING_DIR).exists());
}

#[test]
fn empty_output_dir_is_left_empty_after_failure() {
    let temp = TempDir::new().unwrap();
    let root = utf8_root(&temp);
    let out = root.join("acme");
    std::fs::create_dir_all(&out).unwrap();

    let mut opts = options(&root);
    opts.offline = true;
    let orch = orchestrator(opts, failing_batch_registry(), StaticProbe::new());

    let specs = vec![
        ComponentSpec::new(ComponentType::Nextjs, "web"),
        ComponentSpec::new(ComponentType::GoBackend, "api"),
    ];
    let report = orch.generate(&specs, &out, &CancellationToken::new());

    assert!(!report.success);
    assert!(out.is_dir());
    assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
}

#[test]
fn keep_backup_retains_previous_contents() {
    let temp = TempDir::new().unwrap();
    let root = utf8_root(&temp);
    let out = root.join("acme");
    std::fs::create_dir_all(&out).unwrap();
    std::fs::write(out.join("README.md"), "v1\n").unwrap();

    let mut registry = GeneratorRegistry::new();
    registry.register_bootstrap(Arc::new(ScriptedExecutor::new(ComponentType::GoBackend)));
    let mut opts = options(&root);
    opts.keep_backup = true;
    let orch = orchestrator(opts, registry, StaticProbe::new().with_tools(&["go"]));

    let specs = vec![ComponentSpec::new(ComponentType::GoBackend, "api")];
    let report = orch.generate(&specs, &out, &CancellationToken::new());

    assert!(report.success, "{:?}", report.errors);
    let backup = report.backup_path.expect("backup kept on request");
    assert!(backup.starts_with(root.join("backups")));
    assert_eq!(std::fs::read_to_string(backup.join("README.md")).unwrap(), "v1\n");
    assert!(out.join("backend/go.mod").exists());
    assert!(out.join("README.md").exists());
}

#[test]
fn backup_is_removed_after_success_by_default() {
    let temp = TempDir::new().unwrap();
    let root = utf8_root(&temp);
    let out = root.join("acme");
    std::fs::create_dir_all(&out).unwrap();
    std::fs::write(out.join("README.md"), "v1\n").unwrap();

    let mut registry = GeneratorRegistry::new();
    registry.register_bootstrap(Arc::new(ScriptedExecutor::new(ComponentType::GoBackend)));
    let orch = orchestrator(options(&root), registry, StaticProbe::new().with_tools(&["go"]));

    let specs = vec![ComponentSpec::new(ComponentType::GoBackend, "api")];
    let report = orch.generate(&specs, &out, &CancellationToken::new());

    assert!(report.success, "{:?}", report.errors);
    assert!(report.backup_path.is_none());
    let backups = root.join("backups");
    let leftover = std::fs::read_dir(&backups).map(|d| d.count()).unwrap_or(0);
    assert_eq!(leftover, 0);
}

#[test]
fn sequential_mode_stops_after_first_failure() {
    let temp = TempDir::new().unwrap();
    let root = utf8_root(&temp);
    let out = root.join("acme");

    let mut opts = options(&root);
    opts.offline = true;
    opts.parallel = false;
    let mut registry = failing_batch_registry();
    registry.register_fallback(Arc::new(TemplateFallback::new(ComponentType::Android)));
    let orch = orchestrator(opts, registry, StaticProbe::new());

    let specs = vec![
        ComponentSpec::new(ComponentType::GoBackend, "api"),
        ComponentSpec::new(ComponentType::Android, "droid"),
    ];
    let report = orch.generate(&specs, &out, &CancellationToken::new());

    assert!(!report.success);
    assert_eq!(report.components.len(), 1);
    assert!(report.warnings.iter().any(|w| w.contains("droid")));
    assert!(!out.exists());
}
