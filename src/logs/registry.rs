use super::channel::ComponentChannel;
use super::provider::{select_provider, LoggerProvider, ProviderMode};
use crate::config::{EnvSettings, LoggingConfig, PathProfile};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

/// Legacy component names and what they are called now
const ALIASES: &[(&str, &str)] = &[
    ("channel_management", "communication"),
    ("channels", "communication"),
    ("bot", "discord"),
    ("discord_bot", "discord"),
    ("gui", "ui"),
    ("core", "main"),
    ("app", "main"),
    ("mail", "email"),
    ("file_operations", "file_ops"),
];

/// Canonical form of a component name
///
/// Trims, lowercases, folds everything but letters, digits and underscores
/// (spaces, dashes, dots, path separators) to `_` and applies the legacy
/// aliases. An empty name means `main`.
pub fn normalize_component(name: &str) -> String {
    let normalized: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if normalized.is_empty() {
        return "main".to_string();
    }

    ALIASES
        .iter()
        .find(|(legacy, _)| *legacy == normalized)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(normalized)
}

/// Map from component name to its channel, populated on demand
pub struct LoggerRegistry {
    provider: Box<dyn LoggerProvider>,
    channels: Mutex<HashMap<String, Arc<ComponentChannel>>>,
}

static REGISTRY: OnceLock<LoggerRegistry> = OnceLock::new();

/// The process-wide registry, built from the environment on first use
pub fn registry() -> &'static LoggerRegistry {
    REGISTRY.get_or_init(LoggerRegistry::from_env)
}

/// Channel for `component` from the process-wide registry
pub fn get_logger(component: &str) -> Arc<ComponentChannel> {
    registry().get(component)
}

impl LoggerRegistry {
    /// Registry configured from environment flags and CHANLOG_CONFIG
    pub fn from_env() -> Self {
        let env = EnvSettings::from_env();
        let config = LoggingConfig::load(&env);
        Self::with_settings(&env, &config)
    }

    pub fn with_settings(env: &EnvSettings, config: &LoggingConfig) -> Self {
        Self::with_provider(select_provider(env, config))
    }

    pub fn with_provider(provider: Box<dyn LoggerProvider>) -> Self {
        Self {
            provider,
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Get (or build) the channel for a component name
    ///
    /// The same normalized name always yields the same instance.
    pub fn get(&self, component: &str) -> Arc<ComponentChannel> {
        let name = normalize_component(component);
        let mut channels = self.lock();
        channels
            .entry(name)
            .or_insert_with_key(|name| Arc::new(self.provider.build(name)))
            .clone()
    }

    pub fn mode(&self) -> ProviderMode {
        self.provider.mode()
    }

    pub fn profile(&self) -> Option<&PathProfile> {
        self.provider.profile()
    }

    pub fn contains(&self, component: &str) -> bool {
        self.lock().contains_key(&normalize_component(component))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flush every channel built so far
    pub fn flush_all(&self) {
        for channel in self.lock().values() {
            channel.flush();
        }
    }

    /// Forget all channels so the next `get` rebuilds them
    pub fn reset_for_restart(&self) {
        let mut channels = self.lock();
        for channel in channels.values() {
            channel.flush();
        }
        channels.clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<ComponentChannel>>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
