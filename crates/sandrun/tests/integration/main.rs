//! Integration tests for sandrun
//!
//! These tests require `python3` and `node` on PATH.
//! Run with: cargo test -p sandrun --features integration-tests

#![cfg(feature = "integration-tests")]

use std::fs;
use std::path::Path;

use sandrun::{Config, Runner};

mod execution;
mod resource_limits;

const FIXTURES_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

/// Helper to get fixture file content
pub(crate) fn fixture_source(name: &str) -> String {
    let path = format!("{FIXTURES_PATH}/sources/{name}");
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read fixture {path}: {e}"))
}

/// Create a runner with the default config whose workspaces live under `root`
pub(crate) fn test_runner(root: &Path) -> Runner {
    let mut config = Config::default();
    config.workspace.root = Some(root.to_path_buf());
    Runner::new(config)
}

/// Assert that every workspace under `root` has been removed
pub(crate) fn assert_no_workspaces(root: &Path) {
    let leftovers: Vec<_> = fs::read_dir(root)
        .expect("Failed to read workspace root")
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert!(leftovers.is_empty(), "leftover workspaces: {leftovers:?}");
}
