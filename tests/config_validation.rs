// tests/config_validation.rs

mod common;
use crate::common::init_tracing;

use watchrun::config::{RawConfigFile, load_and_validate};
use watchrun::config::model::ConfigFile;
use watchrun::errors::WatchrunError;
use watchrun::types::ExecutionStrategy;

#[test]
fn defaults_validate_cleanly() {
    init_tracing();

    let cfg = ConfigFile::try_from(RawConfigFile::default()).expect("defaults are valid");
    assert_eq!(cfg.config().strategy, ExecutionStrategy::Debounced);
    assert_eq!(cfg.config().debounce_ms, 300);
    assert_eq!(cfg.config().max_queue_size, 50);
    assert_eq!(cfg.batch().window_ms, 1_000);
    assert!(cfg.batch().dependency_resolution);
    assert!(cfg.watch().skip_unchanged);
}

#[test]
fn full_toml_round_trips_through_the_loader() {
    init_tracing();

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("Watchrun.toml");
    std::fs::write(
        &path,
        r#"
[config]
strategy = "batched"
debounce_ms = 250
max_queue_size = 5
execution_timeout_ms = 10000

[batch]
window_ms = 400
dependency_resolution = false

[watch]
include = ["src/**/*.py"]
exclude = ["**/tmp/**"]
skip_unchanged = false
source_extensions = ["py"]
"#,
    )
    .expect("write config");

    let cfg = load_and_validate(&path).expect("valid config");
    assert_eq!(cfg.config().strategy, ExecutionStrategy::Batched);
    assert_eq!(cfg.config().debounce_ms, 250);
    assert_eq!(cfg.config().max_queue_size, 5);
    assert_eq!(cfg.config().execution_timeout_ms, 10_000);
    assert_eq!(cfg.batch().window_ms, 400);
    assert!(!cfg.batch().dependency_resolution);
    assert_eq!(cfg.watch().include, vec!["src/**/*.py"]);
    assert!(!cfg.watch().skip_unchanged);
    assert_eq!(cfg.watch().source_extensions, vec!["py"]);
}

#[test]
fn zero_queue_capacity_is_rejected() {
    let mut raw = RawConfigFile::default();
    raw.config.max_queue_size = 0;

    let err = ConfigFile::try_from(raw).expect_err("must reject");
    assert!(matches!(err, WatchrunError::ConfigError(_)));
}

#[test]
fn zero_windows_are_rejected() {
    let mut raw = RawConfigFile::default();
    raw.config.debounce_ms = 0;
    assert!(ConfigFile::try_from(raw).is_err());

    let mut raw = RawConfigFile::default();
    raw.batch.window_ms = 0;
    assert!(ConfigFile::try_from(raw).is_err());

    let mut raw = RawConfigFile::default();
    raw.config.execution_timeout_ms = 0;
    assert!(ConfigFile::try_from(raw).is_err());
}

#[test]
fn bad_globs_and_dotted_extensions_are_rejected() {
    let mut raw = RawConfigFile::default();
    raw.watch.include.push("src/[".to_string());
    assert!(ConfigFile::try_from(raw).is_err());

    let mut raw = RawConfigFile::default();
    raw.watch.source_extensions.push(".py".to_string());
    assert!(ConfigFile::try_from(raw).is_err());
}

#[test]
fn unknown_strategy_fails_deserialization() {
    let err = toml::from_str::<RawConfigFile>(
        r#"
[config]
strategy = "yolo"
"#,
    )
    .expect_err("must reject unknown strategy");
    assert!(err.to_string().contains("yolo"));
}
