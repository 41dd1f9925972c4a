//! Multiplexer errors.

use std::time::Duration;

use linetap_core::{SetupError, SinkError};
use linetap_launcher::LaunchError;
use thiserror::Error;

/// A run ended without a fully observed exit and drain.
///
/// Whenever a run fails after the child was started, the child's process
/// group has already been killed and reaped.
#[derive(Debug, Error)]
pub enum MuxError {
    #[error("Setup error: {0}")]
    Setup(#[from] SetupError),
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
    #[error("Failed to wait for process: {0}")]
    Wait(#[source] std::io::Error),
    #[error("Reader task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("Run interrupted")]
    Interrupted,
    #[error("Run timed out after {0:?}")]
    TimedOut(Duration),
}

/// Error from launching and draining a command in one call.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error(transparent)]
    Launch(#[from] LaunchError),
    #[error(transparent)]
    Mux(#[from] MuxError),
}
