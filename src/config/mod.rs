// Configuration - logging layout, rotation and maintenance settings

mod env;
mod profile;

pub use env::{
    EnvSettings, TestVerbosity, ENV_CONFIG, ENV_CONSOLE_LEVEL, ENV_DISABLE_ROTATION, ENV_LOG_DIR,
    ENV_MAIN_FILE, ENV_TESTING, ENV_TEST_CONSOLIDATED, ENV_TEST_RUNNER, ENV_TEST_VERBOSITY,
};
pub use profile::{PathProfile, KNOWN_COMPONENTS};

use crate::error::{ChanlogError, Result};
use crate::logs::{Level, MaintenancePolicy, RotationPolicy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Central logging configuration for production runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base directory for all log files
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Minimum level written by component channels
    #[serde(default = "default_level")]
    pub default_level: String,

    /// Component name -> target file (relative paths are under `log_dir`)
    #[serde(default)]
    pub components: BTreeMap<String, PathBuf>,

    #[serde(default)]
    pub rotation: RotationPolicy,

    #[serde(default)]
    pub maintenance: MaintenancePolicy,
}

// Default value functions for serde
fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            default_level: default_level(),
            components: BTreeMap::new(),
            rotation: RotationPolicy::default(),
            maintenance: MaintenancePolicy::default(),
        }
    }
}

impl LoggingConfig {
    /// Load the configuration named by CHANLOG_CONFIG, or the defaults
    ///
    /// A broken file is reported and the defaults are used instead; logging
    /// setup never fails the caller.
    pub fn load(env: &EnvSettings) -> Self {
        let Some(path) = env.config_path.as_deref() else {
            return Self::default();
        };
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                crate::logs::guard::report_failure("load_config", path, &e);
                Self::default()
            }
        }
    }

    /// Load a configuration file (supports TOML and JSON)
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ChanlogError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");

        let mut config = match extension {
            "toml" => Self::parse_toml(&contents)?,
            "json" => Self::parse_json(&contents)?,
            _ => {
                return Err(ChanlogError::InvalidConfig(format!(
                    "Unsupported file format: {}. Use .toml or .json",
                    extension
                )))
            }
        };

        config.expand_env_vars();
        config.validate()?;
        Ok(config)
    }

    fn parse_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| ChanlogError::InvalidConfig(format!("Failed to parse TOML: {}", e)))
    }

    fn parse_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents)
            .map_err(|e| ChanlogError::InvalidConfig(format!("Failed to parse JSON: {}", e)))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.log_dir.as_os_str().is_empty() {
            return Err(ChanlogError::ConfigValidationError(
                "log_dir must not be empty".to_string(),
            ));
        }

        self.level()?;

        if self.rotation.interval == 0 {
            return Err(ChanlogError::ConfigValidationError(
                "rotation.interval must be at least 1".to_string(),
            ));
        }

        if self.rotation.backup_count == 0 {
            return Err(ChanlogError::ConfigValidationError(
                "rotation.backup_count must be at least 1".to_string(),
            ));
        }

        if let Some(name) = self.components.keys().find(|k| k.trim().is_empty()) {
            return Err(ChanlogError::ConfigValidationError(format!(
                "Invalid component name: '{}'",
                name
            )));
        }

        Ok(())
    }

    /// Parsed default channel level
    pub fn level(&self) -> Result<Level> {
        self.default_level.parse()
    }

    /// Expand environment variables in configured paths
    fn expand_env_vars(&mut self) {
        self.log_dir = expand_env_in_path(&self.log_dir);
        self.components = self
            .components
            .iter()
            .map(|(k, v)| (k.clone(), expand_env_in_path(v)))
            .collect();
    }
}

/// Expand `$VAR` and `${VAR}` in a string
///
/// A bare `$VAR` takes the longest run of name characters. Unset variables
/// and malformed references are left as written.
fn expand_env_in_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find('$') {
        result.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        let reference = &rest[pos..pos + 1 + consumed];
        match (!name.is_empty()).then(|| std::env::var(name).ok()).flatten() {
            Some(value) => result.push_str(&value),
            None => result.push_str(if consumed == 0 { "$" } else { reference }),
        }
        rest = &rest[pos + 1 + consumed..];
    }

    result.push_str(rest);
    result
}

fn expand_env_in_path(path: &Path) -> PathBuf {
    PathBuf::from(expand_env_in_string(&path.to_string_lossy()))
}
