//! Line delivery contract.

use crate::{SinkError, StreamTag};

/// Receives completed lines from a running child.
///
/// The reader-task strategy calls a sink from two tasks at once and does not
/// serialize those calls, so implementations must tolerate concurrent
/// delivery (`MsgStore` locks internally, `TracingSink` relies on the
/// subscriber). Calls are expected to return promptly.
pub trait LineSink: Send + Sync {
    /// Deliver one completed line, trailing line terminator already removed.
    ///
    /// # Errors
    /// Any error ends the run and is returned to its caller.
    fn deliver(&self, stream: StreamTag, line: &str) -> Result<(), SinkError>;

    /// Report that reading `stream` failed. Called at most once per stream.
    ///
    /// # Errors
    /// Any error ends the run and is returned to its caller.
    fn deliver_error(&self, stream: StreamTag, detail: &str) -> Result<(), SinkError> {
        tracing::warn!(%stream, detail, "Stream read failed");
        Ok(())
    }

    /// Called once when the run is over; no deliveries follow.
    ///
    /// `exit_code` is the reaped child's code, or `None` if the child could
    /// not be reaped after a failed run.
    ///
    /// # Errors
    /// Fails an otherwise successful run.
    fn finish(&self, _exit_code: Option<i32>) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Sink that logs every line through `tracing`.
///
/// Stdout lines are logged at `INFO`, stderr lines at `ERROR`.
#[derive(Debug, Clone, Default)]
pub struct TracingSink {
    label: Option<String>,
}

impl TracingSink {
    /// Create a sink without a label.
    #[must_use]
    pub const fn new() -> Self {
        Self { label: None }
    }

    /// Create a sink that tags every event with `label`.
    #[must_use]
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
        }
    }

    fn label(&self) -> &str {
        self.label.as_deref().unwrap_or("")
    }
}

impl LineSink for TracingSink {
    fn deliver(&self, stream: StreamTag, line: &str) -> Result<(), SinkError> {
        match stream {
            StreamTag::Stdout => tracing::info!(label = self.label(), "{line}"),
            StreamTag::Stderr => tracing::error!(label = self.label(), "{line}"),
        }
        Ok(())
    }

    fn deliver_error(&self, stream: StreamTag, detail: &str) -> Result<(), SinkError> {
        tracing::warn!(label = self.label(), %stream, detail, "Stream read failed");
        Ok(())
    }

    fn finish(&self, exit_code: Option<i32>) -> Result<(), SinkError> {
        tracing::debug!(label = self.label(), ?exit_code, "Output finished");
        Ok(())
    }
}

/// Adapts a closure into a sink. Read errors go to the default handler.
pub struct FnSink<F>(F);

impl<F> FnSink<F>
where
    F: Fn(StreamTag, &str) -> Result<(), SinkError> + Send + Sync,
{
    #[must_use]
    pub const fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> LineSink for FnSink<F>
where
    F: Fn(StreamTag, &str) -> Result<(), SinkError> + Send + Sync,
{
    fn deliver(&self, stream: StreamTag, line: &str) -> Result<(), SinkError> {
        (self.0)(stream, line)
    }
}
