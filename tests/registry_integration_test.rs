// Integration tests for channel lookup and provider selection

use chanlog::config::{EnvSettings, LoggingConfig};
use chanlog::logs::{attrs, Level, LoggerRegistry, ProviderMode};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn production(dir: &Path) -> LoggerRegistry {
    let env = EnvSettings {
        log_dir: Some(dir.to_path_buf()),
        ..EnvSettings::default()
    };
    LoggerRegistry::with_settings(&env, &LoggingConfig::default())
}

fn test_run(dir: &Path, verbosity: &str, consolidated: bool) -> LoggerRegistry {
    let env = EnvSettings::from_vars([
        ("CHANLOG_TEST_RUNNER", "yes".to_string()),
        ("CHANLOG_TEST_VERBOSITY", verbosity.to_string()),
        ("CHANLOG_TEST_CONSOLIDATED", consolidated.to_string()),
        ("CHANLOG_LOG_DIR", dir.display().to_string()),
    ]);
    LoggerRegistry::with_settings(&env, &LoggingConfig::default())
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_default()
}

#[test]
fn test_components_get_distinct_files() {
    let temp_dir = TempDir::new().unwrap();
    let registry = production(temp_dir.path());

    let scheduler = registry.get("scheduler");
    let email = registry.get("email");
    scheduler.info("tick");
    email.info("sent");

    assert_ne!(scheduler.file_path(), email.file_path());
    assert_eq!(scheduler.file_path(), Some(temp_dir.path().join("scheduler.log").as_path()));
    assert!(read(&temp_dir.path().join("scheduler.log")).contains(" - scheduler - INFO - tick"));
    assert!(!read(&temp_dir.path().join("scheduler.log")).contains("sent"));
    assert!(temp_dir.path().join("backups").is_dir());
    assert!(temp_dir.path().join("archive").is_dir());
}

#[test]
fn test_repeated_lookups_share_one_channel() {
    let temp_dir = TempDir::new().unwrap();
    let registry = production(temp_dir.path());

    let a = registry.get("file_operations");
    let b = registry.get("File-Ops");
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(registry.len(), 1);

    // Level changes are visible through every handle
    a.set_level(Level::Debug);
    assert_eq!(b.level(), Level::Debug);
}

#[test]
fn test_concurrent_lookups_build_once() {
    let temp_dir = TempDir::new().unwrap();
    let registry = Arc::new(production(temp_dir.path()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = registry.clone();
            std::thread::spawn(move || registry.get("telegram"))
        })
        .collect();
    let channels: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    for channel in &channels[1..] {
        assert!(Arc::ptr_eq(&channels[0], channel));
    }
}

#[test]
fn test_errors_are_duplicated_to_shared_file() {
    let temp_dir = TempDir::new().unwrap();
    let registry = production(temp_dir.path());

    registry.get("ai").error_with("model timeout", attrs([("attempt", 2)]));
    registry.get("backup").warning("disk nearly full");
    registry.get("network").critical("link down");
    registry.flush_all();

    let errors = read(&temp_dir.path().join("errors.log"));
    assert!(errors.contains(r#" - ai - ERROR - model timeout | {"attempt":2}"#));
    assert!(errors.contains(" - network - CRITICAL - link down"));
    assert!(!errors.contains("disk nearly full"));

    assert!(read(&temp_dir.path().join("ai.log")).contains("model timeout"));
    assert!(read(&temp_dir.path().join("backup.log")).contains("disk nearly full"));
}

#[test]
fn test_disabled_test_run_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let registry = test_run(temp_dir.path(), "0", false);
    assert_eq!(registry.mode(), ProviderMode::Disabled);

    let channel = registry.get("scheduler");
    channel.critical("nobody hears this");

    assert!(channel.is_noop());
    assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

#[test]
fn test_consolidated_test_run() {
    let temp_dir = TempDir::new().unwrap();
    let registry = test_run(temp_dir.path(), "1", true);
    assert_eq!(registry.mode(), ProviderMode::Consolidated);

    registry.get("ui").debug("hidden at info");
    registry.get("ui").info("window opened");
    registry.get("discord").error("gateway closed");

    let main = read(&temp_dir.path().join("test_run.log"));
    assert!(!main.contains("hidden at info"));
    assert!(main.contains(" - ui - INFO - window opened"));
    assert!(main.contains(" - discord - ERROR - gateway closed"));
    assert!(!temp_dir.path().join("errors.log").exists());
    assert!(!temp_dir.path().join("ui.log").exists());
}

#[test]
fn test_verbose_test_run_uses_component_files() {
    let temp_dir = TempDir::new().unwrap();
    let registry = test_run(temp_dir.path(), "2", false);
    assert_eq!(registry.mode(), ProviderMode::PerComponent);

    registry.get("ui").debug("render pass");
    assert!(read(&temp_dir.path().join("ui.log")).contains(" - ui - DEBUG - render pass"));
}

#[test]
fn test_main_channel_uses_main_file() {
    let temp_dir = TempDir::new().unwrap();
    let registry = production(temp_dir.path());

    registry.get("core").info("started");
    assert!(read(&temp_dir.path().join("app.log")).contains(" - main - INFO - started"));
}

#[test]
fn test_errors_component_does_not_share_error_file() {
    let temp_dir = TempDir::new().unwrap();
    let registry = production(temp_dir.path());

    let errors = registry.get("errors");
    let scheduler = registry.get("scheduler");
    assert_ne!(errors.file_path(), scheduler.error_path());

    errors.error("boom");
    registry.flush_all();

    let shared = read(&temp_dir.path().join("errors.log"));
    assert_eq!(shared.matches("boom").count(), 1);
    assert!(read(errors.file_path().unwrap()).contains(" - errors - ERROR - boom"));
}

#[test]
fn test_component_names_cannot_leave_log_dir() {
    let temp_dir = TempDir::new().unwrap();
    let log_dir = temp_dir.path().join("logs");
    let registry = production(&log_dir);

    let channel = registry.get("../escaped");
    channel.info("contained");

    assert_eq!(channel.file_path().unwrap().parent(), Some(log_dir.as_path()));
    assert!(!temp_dir.path().join("escaped.log").exists());
    assert!(read(&log_dir.join("___escaped.log")).contains("contained"));

    let nested = registry.get("team/worker");
    assert_eq!(nested.file_path().unwrap().parent(), Some(log_dir.as_path()));
}
