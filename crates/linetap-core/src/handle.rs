//! Running child process handle.

use std::{fmt, io, process::ExitStatus};

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::{SetupError, StreamTag};

/// An owned, type-erased output reader.
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Control over a spawned child, independent of how it was launched.
#[async_trait]
pub trait ChildControl: Send {
    /// Non-blocking exit check.
    ///
    /// # Errors
    /// Returns error if the OS status query fails.
    fn try_wait(&mut self) -> io::Result<Option<i32>>;

    /// Wait for the child to exit.
    ///
    /// # Errors
    /// Returns error if waiting fails.
    async fn wait(&mut self) -> io::Result<i32>;

    /// Start killing the child (and anything it spawned) without waiting.
    ///
    /// # Errors
    /// Returns error if the kill signal cannot be sent.
    fn start_kill(&mut self) -> io::Result<()>;
}

/// A started child process with its two output readers.
///
/// The readers are taken exactly once by whoever drains them. The exit code
/// is recorded the first time exit is observed and never changes.
pub struct ProcessHandle {
    pid: u32,
    stdout: Option<BoxedReader>,
    stderr: Option<BoxedReader>,
    child: Box<dyn ChildControl>,
    exit_code: Option<i32>,
}

impl ProcessHandle {
    /// Assemble a handle from its parts.
    #[must_use]
    pub fn new(
        pid: u32,
        child: Box<dyn ChildControl>,
        stdout: Option<BoxedReader>,
        stderr: Option<BoxedReader>,
    ) -> Self {
        Self {
            pid,
            stdout,
            stderr,
            child,
            exit_code: None,
        }
    }

    /// OS process identifier.
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// Exit code, once observed.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Take both readers.
    ///
    /// # Errors
    /// Returns `SetupError::MissingStream` if either reader is absent; in
    /// that case neither reader is taken.
    pub fn take_streams(&mut self) -> Result<(BoxedReader, BoxedReader), SetupError> {
        if self.stdout.is_none() {
            return Err(SetupError::MissingStream(StreamTag::Stdout));
        }
        if self.stderr.is_none() {
            return Err(SetupError::MissingStream(StreamTag::Stderr));
        }
        match (self.stdout.take(), self.stderr.take()) {
            (Some(out), Some(err)) => Ok((out, err)),
            _ => Err(SetupError::MissingStream(StreamTag::Stdout)),
        }
    }

    /// Non-blocking, idempotent exit check.
    ///
    /// # Errors
    /// Returns error if the OS status query fails.
    pub fn poll(&mut self) -> io::Result<Option<i32>> {
        if let Some(code) = self.exit_code {
            return Ok(Some(code));
        }
        let code = self.child.try_wait()?;
        if code.is_some() {
            self.exit_code = code;
        }
        Ok(code)
    }

    /// Wait for exit. Returns the recorded code if exit was already observed.
    ///
    /// # Errors
    /// Returns error if waiting fails.
    pub async fn wait(&mut self) -> io::Result<i32> {
        if let Some(code) = self.exit_code {
            return Ok(code);
        }
        let code = self.child.wait().await?;
        self.exit_code = Some(code);
        Ok(code)
    }

    /// Kill the child if it is still running, then reap it.
    ///
    /// # Errors
    /// Returns error if the kill or the wait fails.
    pub async fn terminate(&mut self) -> io::Result<i32> {
        if self.poll()?.is_none() {
            tracing::debug!(pid = self.pid, "Terminating child process");
            if let Err(e) = self.child.start_kill() {
                // The child may have exited between the poll and the kill.
                if self.poll()?.is_none() {
                    return Err(e);
                }
            }
        }
        self.wait().await
    }
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.pid)
            .field("stdout", &self.stdout.is_some())
            .field("stderr", &self.stderr.is_some())
            .field("exit_code", &self.exit_code)
            .finish_non_exhaustive()
    }
}

/// Integer exit code for a finished process.
///
/// A unix child killed by a signal reports `128 + signal`, the shell
/// convention, so a code always exists once the child is reaped.
#[must_use]
pub fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}
