//! Launch errors.

use std::path::PathBuf;

use thiserror::Error;

/// The command could not be started. No exit code exists for it.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Command is empty")]
    EmptyCommand,
    #[error("Command line cannot be parsed: {0}")]
    InvalidCommandLine(String),
    #[error("Failed to quote command: {0}")]
    Quote(#[from] shlex::QuoteError),
    #[error("Executable not found: {0}")]
    NotFound(String),
    #[error("Working directory is not a directory: {}", .0.display())]
    InvalidWorkingDir(PathBuf),
    #[error("Spawn failed: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("Spawned process has no id")]
    MissingPid,
}
