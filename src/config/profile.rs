use super::{EnvSettings, LoggingConfig};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Components that get a dedicated file without any configuration
pub const KNOWN_COMPONENTS: &[&str] = &[
    "main",
    "scheduler",
    "network",
    "communication",
    "discord",
    "email",
    "telegram",
    "ai",
    "user_activity",
    "file_ops",
    "ui",
    "backup",
];

const TEST_LOG_DIR: &str = "tests/logs";
const TEST_MAIN_FILE: &str = "test_run.log";
const MAIN_FILE: &str = "app.log";
const ERROR_FILE: &str = "errors.log";
const BACKUP_DIR: &str = "backups";
const ARCHIVE_DIR: &str = "archive";

/// Resolved directory and file layout for one process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathProfile {
    pub base_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub archive_dir: PathBuf,
    pub main_file: PathBuf,
    pub error_file: PathBuf,
    pub components: BTreeMap<String, PathBuf>,
    pub test_mode: bool,
}

impl PathProfile {
    /// Derive the layout from environment flags and the central configuration
    ///
    /// Pure: nothing is created on disk.
    pub fn resolve(env: &EnvSettings, config: &LoggingConfig) -> Self {
        let test_mode = env.test_mode();

        let base_dir = match (&env.log_dir, test_mode) {
            (Some(dir), _) => dir.clone(),
            (None, true) => PathBuf::from(TEST_LOG_DIR),
            (None, false) => config.log_dir.clone(),
        };

        let default_main = if test_mode { TEST_MAIN_FILE } else { MAIN_FILE };
        // The main-file override only applies to test runs
        let main_file = env
            .main_file
            .clone()
            .filter(|_| test_mode)
            .unwrap_or_else(|| base_dir.join(default_main));

        let mut components: BTreeMap<String, PathBuf> = KNOWN_COMPONENTS
            .iter()
            .map(|name| (name.to_string(), base_dir.join(format!("{}.log", name))))
            .collect();

        if !test_mode {
            for (name, target) in &config.components {
                let target = if target.is_absolute() {
                    target.clone()
                } else {
                    base_dir.join(target)
                };
                components.insert(name.clone(), target);
            }
        }
        components.insert("main".to_string(), main_file.clone());

        Self {
            backup_dir: base_dir.join(BACKUP_DIR),
            archive_dir: base_dir.join(ARCHIVE_DIR),
            error_file: base_dir.join(ERROR_FILE),
            base_dir,
            main_file,
            components,
            test_mode,
        }
    }

    /// Layout rooted at `base_dir` with no overrides
    pub fn under(base_dir: impl Into<PathBuf>) -> Self {
        let env = EnvSettings {
            log_dir: Some(base_dir.into()),
            ..EnvSettings::default()
        };
        Self::resolve(&env, &LoggingConfig::default())
    }

    /// Target file for a canonical component name
    ///
    /// Unmapped names always land directly under `base_dir`, and never on the
    /// shared error file or (for anything but `main`) the main file.
    pub fn file_for(&self, component: &str) -> PathBuf {
        if let Some(mapped) = self.components.get(component) {
            return mapped.clone();
        }

        let stem = file_stem(component);
        let candidate = self.base_dir.join(format!("{}.log", stem));
        if candidate == self.error_file || candidate == self.main_file {
            return self.base_dir.join(format!("{}_component.log", stem));
        }
        candidate
    }

    /// Every file a sink may be actively writing
    pub fn active_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self.components.values().cloned().collect();
        files.push(self.main_file.clone());
        files.push(self.error_file.clone());
        files.sort();
        files.dedup();
        files
    }

    /// Whether `path` is the active target of some sink
    pub fn is_active(&self, path: &Path) -> bool {
        self.active_files().iter().any(|f| f == path)
    }
}

/// File-name-safe form of a component name: anything but letters, digits
/// and `_` becomes `_`
fn file_stem(component: &str) -> String {
    let stem: String = component
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "_".to_string()
    } else {
        stem
    }
}
