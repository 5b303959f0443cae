// Process-wide console verbosity switch

use super::event::{Level, LogEvent};
use crate::config::EnvSettings;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::OnceLock;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, Registry};

/// Target used when mirroring channel events to the console
pub const CONSOLE_TARGET: &str = "chanlog";

/// Controls only the console mirror; file sinks are never affected
pub struct VerbosityController {
    verbose: AtomicBool,
    base_level: AtomicU8,
    console: OnceLock<reload::Handle<LevelFilter, Registry>>,
}

static CONTROLLER: OnceLock<VerbosityController> = OnceLock::new();

/// The process-wide controller, configured from the environment on first use
pub fn verbosity() -> &'static VerbosityController {
    CONTROLLER.get_or_init(|| VerbosityController::new(EnvSettings::from_env().console_level))
}

impl VerbosityController {
    /// Create a controller whose non-verbose console level is `base_level`
    pub fn new(base_level: Level) -> Self {
        Self {
            verbose: AtomicBool::new(false),
            base_level: AtomicU8::new(base_level.as_u8()),
            console: OnceLock::new(),
        }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose.load(Ordering::SeqCst)
    }

    /// Flip verbose mode, returning the new state
    pub fn toggle(&self) -> bool {
        let enabled = !self.verbose.fetch_xor(true, Ordering::SeqCst);
        self.apply();
        enabled
    }

    pub fn set(&self, enabled: bool) {
        self.verbose.store(enabled, Ordering::SeqCst);
        self.apply();
    }

    /// Change the level used when verbose mode is off
    pub fn set_base_level(&self, level: Level) {
        self.base_level.store(level.as_u8(), Ordering::SeqCst);
        self.apply();
    }

    /// Minimum level currently mirrored to the console
    pub fn console_threshold(&self) -> Level {
        if self.is_verbose() {
            Level::Debug
        } else {
            Level::from_u8(self.base_level.load(Ordering::SeqCst))
        }
    }

    /// Install a stderr console subscriber driven by this controller
    ///
    /// Returns false if a global subscriber was already installed.
    pub fn install_console(&self) -> bool {
        let (filter, handle) = reload::Layer::new(level_filter(self.console_threshold()));
        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init()
            .is_ok();

        if installed {
            let _ = self.console.set(handle);
        }
        installed
    }

    fn apply(&self) {
        if let Some(handle) = self.console.get() {
            if let Err(e) = handle.reload(level_filter(self.console_threshold())) {
                eprintln!("chanlog: failed to update console level: {}", e);
            }
        }
    }
}

fn level_filter(level: Level) -> LevelFilter {
    LevelFilter::from_level(level.into())
}

/// Mirror a channel event to the console subscriber
pub(crate) fn mirror_to_console(event: &LogEvent) {
    let message = event.full_message();
    let component = event.component.as_str();
    match event.level {
        Level::Debug => tracing::debug!(target: CONSOLE_TARGET, component, "{}", message),
        Level::Info => tracing::info!(target: CONSOLE_TARGET, component, "{}", message),
        Level::Warning => tracing::warn!(target: CONSOLE_TARGET, component, "{}", message),
        Level::Error => tracing::error!(target: CONSOLE_TARGET, component, "{}", message),
        Level::Critical => {
            tracing::error!(target: CONSOLE_TARGET, component, critical = true, "{}", message)
        }
    }
}
