//! Outcome of a completed run.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Strategy, StreamTag};

/// Number of lines delivered per stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCounts {
    pub stdout: usize,
    pub stderr: usize,
}

impl LineCounts {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.stdout + self.stderr
    }
}

/// Returned once the child has exited and both streams are drained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    /// Process exit code.
    pub exit_code: i32,
    /// Lines delivered to the sink.
    pub lines: LineCounts,
    /// Streams whose reads failed before EOF.
    pub read_errors: Vec<StreamTag>,
    /// Strategy that drained the streams.
    pub strategy: Strategy,
    /// Wall time from the start of draining to completion.
    pub duration: Duration,
}

impl RunResult {
    /// Whether the process exited with code 0.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }
}
