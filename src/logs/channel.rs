use super::clock::{system_clock, Clock};
use super::event::{Attributes, Level, LogEvent};
use super::sink::RotatingSink;
use super::suppression::SuppressionFilter;
use super::verbosity::{mirror_to_console, verbosity};
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Default minimum level for a component channel
pub const DEFAULT_CHANNEL_LEVEL: Level = Level::Info;

/// Logging destination for one named component
///
/// Error and critical events go to the component's own file and to the
/// shared error file. A channel without a primary sink discards everything.
pub struct ComponentChannel {
    name: String,
    level: AtomicU8,
    primary: Option<Arc<RotatingSink>>,
    errors: Option<Arc<RotatingSink>>,
    suppression: Option<SuppressionFilter>,
    clock: Arc<dyn Clock>,
}

impl ComponentChannel {
    /// Channel writing to `primary`, plus `errors` for error-level events
    pub fn new(
        name: impl Into<String>,
        primary: Arc<RotatingSink>,
        errors: Option<Arc<RotatingSink>>,
        level: Level,
    ) -> Self {
        Self {
            name: name.into(),
            level: AtomicU8::new(level.as_u8()),
            primary: Some(primary),
            errors,
            suppression: None,
            clock: system_clock(),
        }
    }

    /// Channel that discards everything
    pub fn noop(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: AtomicU8::new(Level::Critical.as_u8()),
            primary: None,
            errors: None,
            suppression: None,
            clock: system_clock(),
        }
    }

    pub fn with_suppression(mut self, filter: SuppressionFilter) -> Self {
        self.suppression = Some(filter);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Primary file, `None` for a no-op channel
    pub fn file_path(&self) -> Option<&Path> {
        self.primary.as_deref().map(RotatingSink::path)
    }

    /// Shared error file, if this channel has one
    pub fn error_path(&self) -> Option<&Path> {
        self.errors.as_deref().map(RotatingSink::path)
    }

    pub fn is_noop(&self) -> bool {
        self.primary.is_none()
    }

    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, level: Level) {
        self.level.store(level.as_u8(), Ordering::Relaxed);
    }

    pub fn primary_sink(&self) -> Option<&Arc<RotatingSink>> {
        self.primary.as_ref()
    }

    /// Emit an event at `level` with optional attributes
    pub fn log(&self, level: Level, message: impl Into<String>, attributes: Option<Attributes>) {
        let Some(primary) = &self.primary else {
            return;
        };

        let now = self.clock.now();
        let event = LogEvent::new(now, self.name.as_str(), level, message).with_attributes(attributes);
        // Suppression counts matches even when the level would drop them
        let event = match &self.suppression {
            Some(filter) => match filter.filter(event, now) {
                Some(event) => event,
                None => return,
            },
            None => event,
        };
        if event.level < self.level() {
            return;
        }

        primary.write(&event);
        if let Some(errors) = &self.errors {
            errors.write(&event);
        }

        if event.level >= verbosity().console_threshold() {
            mirror_to_console(&event);
        }
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(Level::Debug, message, None);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(Level::Info, message, None);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(Level::Warning, message, None);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(Level::Error, message, None);
    }

    pub fn critical(&self, message: impl Into<String>) {
        self.log(Level::Critical, message, None);
    }

    pub fn debug_with(&self, message: impl Into<String>, attributes: Attributes) {
        self.log(Level::Debug, message, Some(attributes));
    }

    pub fn info_with(&self, message: impl Into<String>, attributes: Attributes) {
        self.log(Level::Info, message, Some(attributes));
    }

    pub fn warning_with(&self, message: impl Into<String>, attributes: Attributes) {
        self.log(Level::Warning, message, Some(attributes));
    }

    pub fn error_with(&self, message: impl Into<String>, attributes: Attributes) {
        self.log(Level::Error, message, Some(attributes));
    }

    pub fn critical_with(&self, message: impl Into<String>, attributes: Attributes) {
        self.log(Level::Critical, message, Some(attributes));
    }

    /// Flush the channel's sinks
    pub fn flush(&self) {
        if let Some(primary) = &self.primary {
            primary.flush();
        }
        if let Some(errors) = &self.errors {
            errors.flush();
        }
    }
}

impl std::fmt::Debug for ComponentChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentChannel")
            .field("name", &self.name)
            .field("level", &self.level())
            .field("file", &self.file_path())
            .field("errors", &self.error_path())
            .finish()
    }
}
