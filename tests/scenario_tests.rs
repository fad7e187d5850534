//! End-to-end behaviour of the tool cache and the generation pipeline.

mod common;

use chrono::{TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use stackforge::{
    CacheExporter, CancellationToken, ComponentSpec, ComponentType, ErrorCategory,
    GenerationError, GenerationMethod, GeneratorRegistry, TemplateFallback, ToolCache,
};
use stackforge_engine::test_support::ScriptedExecutor;
use stackforge_toolcache::test_support::{ManualClock, StaticProbe};

use common::{options, orchestrator, utf8_root};

#[test]
fn cache_entry_expires_after_ttl() {
    let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let clock = Arc::new(ManualClock::new(t0));
    let cache = ToolCache::in_memory(Duration::from_secs(5 * 60)).with_clock(clock.clone());

    cache.set("npx", true, "9.0.0");

    clock.advance(Duration::from_secs(4 * 60));
    let hit = cache.get("npx").expect("entry is fresh at four minutes");
    assert!(hit.available);
    assert_eq!(hit.version, "9.0.0");

    clock.advance(Duration::from_secs(2 * 60));
    assert!(cache.get("npx").is_none());
}

#[test]
fn exported_cache_imports_with_same_stats() {
    let temp = TempDir::new().unwrap();
    let file = utf8_root(&temp).join("tools.json");

    let source = ToolCache::in_memory(Duration::from_secs(300));
    source.set("npx", true, "10.2.0");
    source.set("go", true, "go1.22.1");

    let exporter = CacheExporter::new();
    exporter.export(&source, &file).unwrap();

    let fresh = ToolCache::in_memory(Duration::from_secs(300));
    assert_eq!(exporter.import(&fresh, &file).unwrap(), 2);

    let stats = fresh.stats();
    assert_eq!(stats.total_entries, 2);
    assert_eq!(stats.available_tools, 2);
}

#[test]
fn android_without_tools_uses_templates() {
    let temp = TempDir::new().unwrap();
    let root = utf8_root(&temp);
    let out = root.join("out");

    let mut registry = GeneratorRegistry::new();
    registry.register_fallback(Arc::new(TemplateFallback::new(ComponentType::Android)));
    let orch = orchestrator(options(&root), registry, StaticProbe::new());

    let specs = vec![ComponentSpec::new(ComponentType::Android, "mobile")];
    let report = orch.generate(&specs, &out, &CancellationToken::new());

    assert!(report.success, "{:?}", report.errors);
    let result = &report.components[0];
    assert!(result.success);
    assert_eq!(result.method, Some(GenerationMethod::Fallback));
    assert_eq!(result.method_str(), "fallback");
    assert!(!result.manual_steps.is_empty());
    assert!(out.join("mobile/android/settings.gradle.kts").exists());
}

#[test]
fn two_execution_failures_without_fallback_report_second_error() {
    let temp = TempDir::new().unwrap();
    let root = utf8_root(&temp);
    let out = root.join("out");

    let second = GenerationError::tool_execution("go mod init exited with 2");
    let executor = Arc::new(
        ScriptedExecutor::new(ComponentType::GoBackend)
            .then_fail(GenerationError::tool_execution("go mod init exited with 1"))
            .then_fail(second.clone()),
    );
    let mut registry = GeneratorRegistry::new();
    registry.register_bootstrap(executor.clone());
    let orch = orchestrator(options(&root), registry, StaticProbe::new().with_tools(&["go"]));

    let specs = vec![ComponentSpec::new(ComponentType::GoBackend, "api")];
    let report = orch.generate(&specs, &out, &CancellationToken::new());

    assert!(!report.success);
    assert_eq!(executor.calls(), 2);
    let result = &report.components[0];
    assert!(!result.success);
    assert_eq!(result.method_str(), "bootstrap");
    assert_eq!(result.error, Some(second.clone()));
    assert_eq!(result.error.as_ref().map(|e| e.category), Some(ErrorCategory::ToolExecution));
    assert_eq!(report.errors, vec![second]);
    assert!(!out.exists(), "fresh output dir is removed on rollback");
}

#[test]
fn batch_results_keep_input_order() {
    let temp = TempDir::new().unwrap();
    let root = utf8_root(&temp);
    let out = root.join("out");

    // the first component finishes last
    let nextjs = Arc::new(
        ScriptedExecutor::new(ComponentType::Nextjs).with_delay(Duration::from_millis(50)),
    );
    let go = Arc::new(ScriptedExecutor::new(ComponentType::GoBackend));
    let mut registry = GeneratorRegistry::new();
    registry.register_bootstrap(nextjs.clone());
    registry.register_bootstrap(go.clone());
    let mut opts = options(&root);
    opts.parallel = true;
    opts.max_workers = 2;
    let orch = orchestrator(opts, registry, StaticProbe::new().with_tools(&["npx", "go"]));

    let specs = vec![
        ComponentSpec::new(ComponentType::Nextjs, "web"),
        ComponentSpec::new(ComponentType::GoBackend, "api"),
    ];
    let report = orch.generate(&specs, &out, &CancellationToken::new());

    assert!(report.success, "{:?}", report.errors);
    assert_eq!(report.components.len(), 2);
    assert_eq!(report.components[0].component_type, ComponentType::Nextjs);
    assert_eq!(report.components[0].name, "web");
    assert_eq!(report.components[1].component_type, ComponentType::GoBackend);
    assert_eq!(report.components[1].name, "api");
    assert!(report.components.iter().all(|c| c.method == Some(GenerationMethod::Bootstrap)));
    assert_eq!((nextjs.calls(), go.calls()), (1, 1));
}

#[test]
fn full_batch_generates_canonical_layout() {
    let temp = TempDir::new().unwrap();
    let root = utf8_root(&temp);
    let out = root.join("acme");

    let mut registry = GeneratorRegistry::new();
    for ty in ComponentType::ALL {
        registry.register_fallback(Arc::new(TemplateFallback::new(ty)));
    }
    let mut opts = options(&root);
    opts.prefer_external_tools = false;
    let orch = orchestrator(opts, registry, StaticProbe::new());

    let specs = vec![
        ComponentSpec::new(ComponentType::Nextjs, "web"),
        ComponentSpec::new(ComponentType::GoBackend, "api"),
        ComponentSpec::new(ComponentType::Android, "droid"),
        ComponentSpec::new(ComponentType::Ios, "App"),
    ];
    let report = orch.generate(&specs, &out, &CancellationToken::new());

    assert!(report.success, "{:?}", report.errors);
    assert_eq!(report.succeeded_count(), 4);
    assert!(out.join("frontend/package.json").exists());
    assert!(out.join("backend/go.mod").exists());
    assert!(out.join("mobile/android/app/build.gradle.kts").exists());
    assert!(out.join("mobile/ios/Package.swift").exists());
    assert!(!out.join(stackforge_engine::STAGING_DIR).exists());
    assert!(report.backup_path.is_none());
}

#[test]
fn two_backends_get_name_suffixed_directories() {
    let temp = TempDir::new().unwrap();
    let root = utf8_root(&temp);
    let out = root.join("acme");

    let mut registry = GeneratorRegistry::new();
    registry.register_fallback(Arc::new(TemplateFallback::new(ComponentType::GoBackend)));
    let mut opts = options(&root);
    opts.offline = true;
    let orch = orchestrator(opts, registry, StaticProbe::new());

    let specs = vec![
        ComponentSpec::new(ComponentType::GoBackend, "api"),
        ComponentSpec::new(ComponentType::GoBackend, "worker"),
    ];
    let report = orch.generate(&specs, &out, &CancellationToken::new());

    assert!(report.success, "{:?}", report.errors);
    assert!(out.join("backend/api/go.mod").exists());
    assert!(out.join("backend/worker/go.mod").exists());
}
