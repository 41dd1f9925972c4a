//! Typed messages produced while a child process runs.

use serde::{Deserialize, Serialize};

use crate::StreamTag;

/// A single event observed from a child process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum LogMsg {
    /// A completed stdout line.
    Stdout(String),
    /// A completed stderr line.
    Stderr(String),
    /// Reading a stream failed; that stream contributes no further lines.
    StreamError { stream: StreamTag, detail: String },
    /// The process exited with this code.
    Exited(i32),
    /// No further messages follow.
    Finished,
}

impl LogMsg {
    /// Build a line message for the given stream.
    #[must_use]
    pub fn line(stream: StreamTag, text: impl Into<String>) -> Self {
        match stream {
            StreamTag::Stdout => Self::Stdout(text.into()),
            StreamTag::Stderr => Self::Stderr(text.into()),
        }
    }

    /// The stream this message belongs to, if any.
    #[must_use]
    pub const fn stream(&self) -> Option<StreamTag> {
        match self {
            Self::Stdout(_) => Some(StreamTag::Stdout),
            Self::Stderr(_) => Some(StreamTag::Stderr),
            Self::StreamError { stream, .. } => Some(*stream),
            Self::Exited(_) | Self::Finished => None,
        }
    }

    /// Line text for `Stdout`/`Stderr` messages.
    #[must_use]
    pub fn as_line(&self) -> Option<&str> {
        match self {
            Self::Stdout(s) | Self::Stderr(s) => Some(s),
            _ => None,
        }
    }

    /// Rough heap footprint, used to bound history.
    #[must_use]
    pub fn approx_bytes(&self) -> usize {
        const OVERHEAD: usize = 8;
        match self {
            Self::Stdout(s) | Self::Stderr(s) => s.len() + OVERHEAD,
            Self::StreamError { detail, .. } => detail.len() + OVERHEAD,
            Self::Exited(_) | Self::Finished => OVERHEAD,
        }
    }
}
