use thiserror::Error;

/// Main error type for chanlog
///
/// Only setup-time APIs (configuration loading, the CLI) surface these.
/// The emit path absorbs every failure.
#[derive(Debug, Error)]
pub enum ChanlogError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration file: {0}")]
    InvalidConfig(String),

    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // Input errors
    #[error("Unknown log level: {0}")]
    UnknownLevel(String),
}

/// Result type alias for chanlog operations
pub type Result<T> = std::result::Result<T, ChanlogError>;
