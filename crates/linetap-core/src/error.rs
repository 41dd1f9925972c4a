//! Error types shared across the workspace.

use thiserror::Error;

use crate::StreamTag;

/// The launcher handed over a process without usable output readers.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("No {0} reader was attached to the process")]
    MissingStream(StreamTag),
}

/// A sink failed to accept a delivery.
///
/// Sink failures are not recovered by the multiplexer; they end the run and
/// reach its caller.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Sink is closed")]
    Closed,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Sink error: {0}")]
    Other(String),
}

/// Invalid configuration value.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}
