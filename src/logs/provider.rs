// Strategies for building component channels, chosen once per process

use super::channel::ComponentChannel;
use super::clock::{system_clock, Clock};
use super::event::Level;
use super::guard::ensure_dir;
use super::relocate::{native, Relocator};
use super::sink::{RotatingSink, RotationPolicy};
use super::suppression::{SuppressionFilter, DEFAULT_PATTERN, DEFAULT_SOURCE};
use crate::config::{EnvSettings, LoggingConfig, PathProfile};
use std::sync::Arc;

/// Which strategy a registry runs with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderMode {
    /// Test run with logging off: every channel discards
    Disabled,
    /// Test run, all components interleaved in one file
    Consolidated,
    /// One file per component plus the shared error file
    PerComponent,
}

/// Builds the channel for a canonical component name
pub trait LoggerProvider: Send + Sync {
    fn build(&self, component: &str) -> ComponentChannel;

    fn mode(&self) -> ProviderMode;

    /// Layout used by this provider, if it writes files
    fn profile(&self) -> Option<&PathProfile>;
}

/// Pick the provider for this process from its environment
pub fn select_provider(env: &EnvSettings, config: &LoggingConfig) -> Box<dyn LoggerProvider> {
    let profile = PathProfile::resolve(env, config);
    let mut policy = config.rotation.clone();
    if env.disable_rotation {
        policy.enabled = false;
    }

    if !env.test_mode() {
        let level = config.level().unwrap_or(Level::Info);
        return Box::new(PerComponentProvider::new(profile, policy, level));
    }

    match env.test_verbosity.level() {
        None => Box::new(NoopProvider),
        Some(level) if env.consolidated => {
            Box::new(ConsolidatedProvider::new(profile, policy, level))
        }
        Some(level) => Box::new(PerComponentProvider::new(profile, policy, level)),
    }
}

fn suppression_for(component: &str) -> Option<SuppressionFilter> {
    (component == DEFAULT_SOURCE).then(|| SuppressionFilter::new(DEFAULT_SOURCE, DEFAULT_PATTERN))
}

fn ensure_layout(profile: &PathProfile) {
    ensure_dir(&profile.base_dir);
    ensure_dir(&profile.backup_dir);
    ensure_dir(&profile.archive_dir);
}

/// Discards everything; keeps test output clean
#[derive(Debug, Default)]
pub struct NoopProvider;

impl LoggerProvider for NoopProvider {
    fn build(&self, component: &str) -> ComponentChannel {
        ComponentChannel::noop(component)
    }

    fn mode(&self) -> ProviderMode {
        ProviderMode::Disabled
    }

    fn profile(&self) -> Option<&PathProfile> {
        None
    }
}

/// Every component writes into one shared file, no error file
pub struct ConsolidatedProvider {
    profile: PathProfile,
    sink: Arc<RotatingSink>,
    level: Level,
    clock: Arc<dyn Clock>,
}

impl ConsolidatedProvider {
    pub fn new(profile: PathProfile, policy: RotationPolicy, level: Level) -> Self {
        let sink = Arc::new(
            RotatingSink::new(profile.main_file.clone(), profile.backup_dir.clone(), policy)
                .with_archive_dir(profile.archive_dir.clone()),
        );
        Self {
            profile,
            sink,
            level,
            clock: system_clock(),
        }
    }
}

impl LoggerProvider for ConsolidatedProvider {
    fn build(&self, component: &str) -> ComponentChannel {
        ensure_layout(&self.profile);
        let channel = ComponentChannel::new(component, self.sink.clone(), None, self.level)
            .with_clock(self.clock.clone());
        match suppression_for(component) {
            Some(filter) => channel.with_suppression(filter),
            None => channel,
        }
    }

    fn mode(&self) -> ProviderMode {
        ProviderMode::Consolidated
    }

    fn profile(&self) -> Option<&PathProfile> {
        Some(&self.profile)
    }
}

/// One rotating file per component plus a shared error file
pub struct PerComponentProvider {
    profile: PathProfile,
    policy: RotationPolicy,
    level: Level,
    errors: Arc<RotatingSink>,
    relocator: Arc<dyn Relocator>,
    clock: Arc<dyn Clock>,
}

impl PerComponentProvider {
    pub fn new(profile: PathProfile, policy: RotationPolicy, level: Level) -> Self {
        Self::with_io(profile, policy, level, native(), system_clock())
    }

    /// Provider with an explicit relocator and clock
    pub fn with_io(
        profile: PathProfile,
        policy: RotationPolicy,
        level: Level,
        relocator: Arc<dyn Relocator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let errors = Arc::new(
            RotatingSink::new(
                profile.error_file.clone(),
                profile.backup_dir.clone(),
                policy.clone(),
            )
            .with_level(Level::Error)
            .with_archive_dir(profile.archive_dir.clone())
            .with_relocator(relocator.clone())
            .with_clock(clock.clone()),
        );
        Self {
            profile,
            policy,
            level,
            errors,
            relocator,
            clock,
        }
    }
}

impl LoggerProvider for PerComponentProvider {
    fn build(&self, component: &str) -> ComponentChannel {
        ensure_layout(&self.profile);

        let file = self.profile.file_for(component);
        if let Some(parent) = file.parent() {
            ensure_dir(parent);
        }

        let primary = Arc::new(
            RotatingSink::new(file, self.profile.backup_dir.clone(), self.policy.clone())
                .with_archive_dir(self.profile.archive_dir.clone())
                .with_relocator(self.relocator.clone())
                .with_clock(self.clock.clone()),
        );
        let channel = ComponentChannel::new(component, primary, Some(self.errors.clone()), self.level)
            .with_clock(self.clock.clone());
        match suppression_for(component) {
            Some(filter) => channel.with_suppression(filter),
            None => channel,
        }
    }

    fn mode(&self) -> ProviderMode {
        ProviderMode::PerComponent
    }

    fn profile(&self) -> Option<&PathProfile> {
        Some(&self.profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn test_env(dir: &std::path::Path, verbosity: &str, consolidated: bool) -> EnvSettings {
        EnvSettings::from_vars([
            ("CHANLOG_TESTING", "1".to_string()),
            ("CHANLOG_TEST_VERBOSITY", verbosity.to_string()),
            ("CHANLOG_TEST_CONSOLIDATED", consolidated.to_string()),
            ("CHANLOG_LOG_DIR", dir.display().to_string()),
        ])
    }

    #[test]
    fn test_select_production() {
        let temp_dir = TempDir::new().unwrap();
        let env = EnvSettings {
            log_dir: Some(temp_dir.path().to_path_buf()),
            ..EnvSettings::default()
        };
        let provider = select_provider(&env, &LoggingConfig::default());
        assert_eq!(provider.mode(), ProviderMode::PerComponent);
    }

    #[test]
    fn test_select_test_modes() {
        let temp_dir = TempDir::new().unwrap();
        let config = LoggingConfig::default();

        let disabled = select_provider(&test_env(temp_dir.path(), "0", false), &config);
        assert_eq!(disabled.mode(), ProviderMode::Disabled);
        assert!(disabled.profile().is_none());

        let consolidated = select_provider(&test_env(temp_dir.path(), "1", true), &config);
        assert_eq!(consolidated.mode(), ProviderMode::Consolidated);

        let per_component = select_provider(&test_env(temp_dir.path(), "2", false), &config);
        assert_eq!(per_component.mode(), ProviderMode::PerComponent);
        assert_eq!(
            per_component.profile().unwrap().base_dir,
            PathBuf::from(temp_dir.path())
        );
    }

    #[test]
    fn test_per_component_build_creates_layout() {
        let temp_dir = TempDir::new().unwrap();
        let profile = PathProfile::under(temp_dir.path().join("logs"));
        let provider = PerComponentProvider::new(profile.clone(), RotationPolicy::default(), Level::Info);

        let channel = provider.build("scheduler");

        assert!(profile.backup_dir.is_dir());
        assert!(profile.archive_dir.is_dir());
        assert_eq!(channel.file_path(), Some(profile.file_for("scheduler").as_path()));
        assert_eq!(channel.error_path(), Some(profile.error_file.as_path()));
    }

    #[test]
    fn test_consolidated_shares_one_file() {
        let temp_dir = TempDir::new().unwrap();
        let profile = PathProfile::under(temp_dir.path());
        let provider = ConsolidatedProvider::new(profile.clone(), RotationPolicy::default(), Level::Info);

        let a = provider.build("scheduler");
        let b = provider.build("network");
        a.info("from scheduler");
        b.error("from network");

        assert!(a.error_path().is_none());
        let content = std::fs::read_to_string(&profile.main_file).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(" - scheduler - INFO - from scheduler"));
        assert!(lines[1].contains(" - network - ERROR - from network"));
        assert!(!profile.error_file.exists());
    }

    #[test]
    fn test_disabled_rotation_flag() {
        let temp_dir = TempDir::new().unwrap();
        let env = EnvSettings {
            log_dir: Some(temp_dir.path().to_path_buf()),
            disable_rotation: true,
            ..EnvSettings::default()
        };
        let provider = select_provider(&env, &LoggingConfig::default());
        let channel = provider.build("ui");
        assert!(!channel.primary_sink().unwrap().policy().enabled);
    }
}
