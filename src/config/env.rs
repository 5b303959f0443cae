// Environment flags that select test vs production behaviour

use crate::logs::Level;
use std::collections::HashMap;
use std::path::PathBuf;

pub const ENV_TESTING: &str = "CHANLOG_TESTING";
pub const ENV_TEST_RUNNER: &str = "CHANLOG_TEST_RUNNER";
pub const ENV_TEST_VERBOSITY: &str = "CHANLOG_TEST_VERBOSITY";
pub const ENV_TEST_CONSOLIDATED: &str = "CHANLOG_TEST_CONSOLIDATED";
pub const ENV_LOG_DIR: &str = "CHANLOG_LOG_DIR";
pub const ENV_CONSOLE_LEVEL: &str = "CHANLOG_CONSOLE_LEVEL";
pub const ENV_MAIN_FILE: &str = "CHANLOG_MAIN_FILE";
pub const ENV_DISABLE_ROTATION: &str = "CHANLOG_DISABLE_ROTATION";
pub const ENV_CONFIG: &str = "CHANLOG_CONFIG";

/// How much test runs log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestVerbosity {
    Disabled,
    Info,
    Debug,
}

impl TestVerbosity {
    /// File level for test channels, if test logging is on
    pub fn level(&self) -> Option<Level> {
        match self {
            TestVerbosity::Disabled => None,
            TestVerbosity::Info => Some(Level::Info),
            TestVerbosity::Debug => Some(Level::Debug),
        }
    }
}

/// Snapshot of the environment flags, read once
#[derive(Debug, Clone, PartialEq)]
pub struct EnvSettings {
    pub testing: bool,
    pub test_runner: bool,
    pub test_verbosity: TestVerbosity,
    pub consolidated: bool,
    pub log_dir: Option<PathBuf>,
    pub console_level: Level,
    pub main_file: Option<PathBuf>,
    pub disable_rotation: bool,
    pub config_path: Option<PathBuf>,
}

impl Default for EnvSettings {
    fn default() -> Self {
        Self {
            testing: false,
            test_runner: false,
            test_verbosity: TestVerbosity::Disabled,
            consolidated: false,
            log_dir: None,
            console_level: Level::Warning,
            main_file: None,
            disable_rotation: false,
            config_path: None,
        }
    }
}

impl EnvSettings {
    /// Read settings from the process environment
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Read settings from arbitrary key/value pairs
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());
        let flag = |key: &str| get(key).map(parse_flag).unwrap_or(false);
        let path = |key: &str| get(key).map(PathBuf::from);

        let test_verbosity = match get(ENV_TEST_VERBOSITY).and_then(|v| v.parse::<u8>().ok()) {
            Some(0) | None => TestVerbosity::Disabled,
            Some(1) => TestVerbosity::Info,
            Some(_) => TestVerbosity::Debug,
        };

        let console_level = get(ENV_CONSOLE_LEVEL)
            .and_then(|v| v.parse::<Level>().ok())
            .unwrap_or(Level::Warning);

        Self {
            testing: flag(ENV_TESTING),
            test_runner: flag(ENV_TEST_RUNNER),
            test_verbosity,
            consolidated: flag(ENV_TEST_CONSOLIDATED),
            log_dir: path(ENV_LOG_DIR),
            console_level,
            main_file: path(ENV_MAIN_FILE),
            disable_rotation: flag(ENV_DISABLE_ROTATION),
            config_path: path(ENV_CONFIG),
        }
    }

    /// Test mode is on when either the test flag or a test runner is present
    pub fn test_mode(&self) -> bool {
        self.testing || self.test_runner
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
