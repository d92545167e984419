// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn paths_in(dir: &std::path::Path) -> Paths {
    Paths {
        config_path: dir.join("config.toml"),
        log_path: dir.join("daemon.log"),
        lock_path: dir.join("fleetd.lock"),
        pid_path: dir.join("fleetd.pid"),
    }
}

#[test]
fn missing_config_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config(&paths_in(dir.path())).unwrap();
    assert_eq!(config.interval_ms, 30_000);
    assert!(config.projects.is_empty());
}

#[test]
fn config_file_is_parsed() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths_in(dir.path());
    std::fs::write(&paths.config_path, "interval_ms = 5000\n").unwrap();
    let config = load_config(&paths).unwrap();
    assert_eq!(config.interval_ms, 5_000);
}

#[test]
fn malformed_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths_in(dir.path());
    std::fs::write(&paths.config_path, "interval_ms = \"not a number\"\n").unwrap();
    assert!(matches!(
        load_config(&paths),
        Err(LifecycleError::Config(_))
    ));
}

#[test]
fn lock_is_exclusive_and_records_pid() {
    let dir = tempfile::tempdir().unwrap();
    let paths = paths_in(dir.path());

    let _held = acquire_lock(&paths).unwrap();
    let pid: u32 = std::fs::read_to_string(&paths.pid_path)
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    assert_eq!(pid, std::process::id());

    assert!(matches!(
        acquire_lock(&paths),
        Err(LifecycleError::LockFailed(_))
    ));
}

#[test]
fn registry_registers_builtin_notifiers() {
    let config = fleet_core::OrchestratorConfig::default();
    let registry = build_registry(&config);
    assert!(registry.notifier("desktop").is_some());
    assert!(registry.notifier("noop").is_some());
    assert!(registry.notifier("pager").is_none());
}
