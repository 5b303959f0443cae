use crate::error::ChanlogError;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Extra key/value data attached to a log event
pub type Attributes = BTreeMap<String, serde_json::Value>;

/// Separator placed between a message and its serialized attributes
pub const ATTRIBUTE_SEPARATOR: &str = " | ";

/// Severity of a log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug = 10,
    Info = 20,
    Warning = 30,
    Error = 40,
    Critical = 50,
}

impl Level {
    /// Get the display name for this level
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }

    pub(crate) fn as_u8(self) -> u8 {
        self as u8
    }

    pub(crate) fn from_u8(value: u8) -> Level {
        match value {
            0..=10 => Level::Debug,
            11..=20 => Level::Info,
            21..=30 => Level::Warning,
            31..=40 => Level::Error,
            _ => Level::Critical,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = ChanlogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warning" | "warn" => Ok(Level::Warning),
            "error" => Ok(Level::Error),
            "critical" | "fatal" => Ok(Level::Critical),
            other => Err(ChanlogError::UnknownLevel(other.to_string())),
        }
    }
}

impl From<Level> for tracing::Level {
    fn from(level: Level) -> Self {
        match level {
            Level::Debug => tracing::Level::DEBUG,
            Level::Info => tracing::Level::INFO,
            Level::Warning => tracing::Level::WARN,
            Level::Error | Level::Critical => tracing::Level::ERROR,
        }
    }
}

/// A single log record, immutable once emitted
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub timestamp: DateTime<Local>,
    pub component: String,
    pub level: Level,
    pub message: String,
    pub attributes: Option<Attributes>,
}

impl LogEvent {
    /// Create a new event stamped with the given time
    pub fn new(
        timestamp: DateTime<Local>,
        component: impl Into<String>,
        level: Level,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            component: component.into(),
            level,
            message: message.into(),
            attributes: None,
        }
    }

    /// Attach attributes; an empty map is treated as none
    pub fn with_attributes(mut self, attributes: Option<Attributes>) -> Self {
        self.attributes = attributes.filter(|a| !a.is_empty());
        self
    }

    /// Copy of this event carrying a different message
    pub fn rewritten(&self, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..self.clone()
        }
    }

    /// Message text followed by the serialized attributes, if any
    pub fn full_message(&self) -> String {
        match &self.attributes {
            Some(attrs) => {
                let rendered = serde_json::to_string(attrs).unwrap_or_else(|_| "{}".to_string());
                format!("{}{}{}", self.message, ATTRIBUTE_SEPARATOR, rendered)
            }
            None => self.message.clone(),
        }
    }

    /// Format the event as one line of a log file (without trailing newline)
    ///
    /// Format: `YYYY-MM-DD HH:MM:SS,mmm - component - LEVEL - message[ | {attrs}]`
    pub fn format_line(&self) -> String {
        format!(
            "{} - {} - {} - {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S,%3f"),
            self.component,
            self.level,
            self.full_message()
        )
    }
}

/// Build an attribute map from key/value pairs
pub fn attrs<I, K, V>(pairs: I) -> Attributes
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<serde_json::Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
