//! Shared helpers for integration tests.

#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use proptest::test_runner::Config as ProptestConfig;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use stackforge::{GeneratorRegistry, Orchestrator, OrchestratorOptions, ToolCache};
use stackforge_toolcache::test_support::StaticProbe;

/// Default number of test cases per property when `PROPTEST_CASES` is unset.
const DEFAULT_PROPTEST_CASES: u32 = 64;

/// Proptest config honouring `PROPTEST_CASES`, capped at `max_cases` when given.
pub fn proptest_config(max_cases: Option<u32>) -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_PROPTEST_CASES);
    ProptestConfig {
        cases: max_cases.map_or(cases, |max| cases.min(max)),
        ..ProptestConfig::default()
    }
}

pub fn utf8_root(temp: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("temp dir is UTF-8")
}

/// Options that keep backups inside the test's temp dir.
pub fn options(root: &Utf8Path) -> OrchestratorOptions {
    OrchestratorOptions {
        backup_root: root.join("backups"),
        ..OrchestratorOptions::default()
    }
}

pub fn orchestrator(
    options: OrchestratorOptions,
    registry: GeneratorRegistry,
    probe: StaticProbe,
) -> Orchestrator {
    Orchestrator::new(
        options,
        registry,
        Arc::new(ToolCache::in_memory(Duration::from_secs(300))),
        Arc::new(probe),
    )
}
