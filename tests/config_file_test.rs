// Integration test for configuration file support

use chanlog::config::{EnvSettings, LoggingConfig, PathProfile};
use chanlog::error::ChanlogError;
use chanlog::logs::{Level, LoggerRegistry, RotationUnit};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_load_toml_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("logging.toml");

    let toml_content = r#"
        log_dir = "/var/log/checkin"
        default_level = "warning"

        [components]
        email = "mail/outbound.log"

        [rotation]
        when = "days"
        interval = 2
        backup_count = 14

        [maintenance]
        archive_after_days = 3
        expire_after_days = 90
    "#;

    fs::write(&config_path, toml_content).unwrap();

    let config = LoggingConfig::from_file(&config_path).unwrap();
    assert_eq!(config.log_dir, PathBuf::from("/var/log/checkin"));
    assert_eq!(config.level().unwrap(), Level::Warning);
    assert_eq!(config.rotation.when, RotationUnit::Days);
    assert_eq!(config.rotation.interval, 2);
    assert_eq!(config.rotation.max_bytes, None);
    assert_eq!(config.rotation.backup_count, 14);
    assert_eq!(config.maintenance.max_total_size_mb, 100);
    assert_eq!(config.maintenance.archive_after_days, 3);
    assert_eq!(config.maintenance.expire_after_days, 90);

    let profile = PathProfile::resolve(&EnvSettings::default(), &config);
    assert_eq!(
        profile.file_for("email"),
        PathBuf::from("/var/log/checkin/mail/outbound.log")
    );
}

#[test]
fn test_load_json_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("logging.json");

    let json_content = r#"
        {
            "log_dir": "logs",
            "default_level": "debug",
            "rotation": { "when": "minutes", "interval": 30, "max_bytes": 65536 }
        }
    "#;

    fs::write(&config_path, json_content).unwrap();

    let config = LoggingConfig::from_file(&config_path).unwrap();
    assert_eq!(config.level().unwrap(), Level::Debug);
    assert_eq!(config.rotation.when, RotationUnit::Minutes);
    assert_eq!(config.rotation.max_bytes, Some(65536));
    assert_eq!(config.rotation.backup_count, 7);
}

#[test]
fn test_invalid_config_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("logging.toml");

    fs::write(&config_path, "[rotation]\nbackup_count = 0\n").unwrap();
    let result = LoggingConfig::from_file(&config_path);
    assert!(matches!(result, Err(ChanlogError::ConfigValidationError(_))));

    fs::write(&config_path, "[rotation]\nwhen = \"fortnightly\"\n").unwrap();
    let result = LoggingConfig::from_file(&config_path);
    assert!(matches!(result, Err(ChanlogError::InvalidConfig(_))));
}

#[test]
fn test_missing_file() {
    let result = LoggingConfig::from_file(&PathBuf::from("/nonexistent/logging.toml"));
    assert!(matches!(result, Err(ChanlogError::ConfigError(_))));
}

#[test]
fn test_configured_files_drive_channels() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("logging.toml");
    let log_dir = temp_dir.path().join("logs");

    let toml_content = format!(
        "log_dir = {:?}\ndefault_level = \"error\"\n\n[components]\nscheduler = \"jobs.log\"\n",
        log_dir.display().to_string()
    );
    fs::write(&config_path, toml_content).unwrap();

    let env = EnvSettings {
        config_path: Some(config_path),
        ..EnvSettings::default()
    };
    let config = LoggingConfig::load(&env);
    let registry = LoggerRegistry::with_settings(&env, &config);

    let scheduler = registry.get("scheduler");
    scheduler.warning("below threshold");
    scheduler.error("job failed");

    let content = fs::read_to_string(log_dir.join("jobs.log")).unwrap();
    assert!(!content.contains("below threshold"));
    assert!(content.contains(" - scheduler - ERROR - job failed"));
    assert!(log_dir.join("errors.log").exists());
}
