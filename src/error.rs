//! Error types for nodeline.

use thiserror::Error;

/// Main error type for all nodeline operations.
#[derive(Debug, Error)]
pub enum NodelineError {
    /// I/O error during socket/serial operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error (status file writing only; decode failures
    /// are non-fatal and never surface here).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Serial port open/configuration error.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Invalid device path glob pattern.
    #[error("invalid device pattern: {0}")]
    Pattern(#[from] globset::Error),

    /// Config file parse error.
    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Config validation error (bad value, missing section, etc.).
    #[error("config error: {0}")]
    Config(String),

    /// `wait` deadline exceeded before the queue reached the requested size.
    ///
    /// Not fatal. Callers decide whether to retry or give up.
    #[error("timed out waiting for queued messages")]
    WaitTimeout,

    /// The producer task did not terminate within the shutdown grace period,
    /// even after forced cancellation.
    #[error("producer task failed to stop during close")]
    ShutdownStalled,
}

/// Result type alias using NodelineError.
pub type Result<T> = std::result::Result<T, NodelineError>;
