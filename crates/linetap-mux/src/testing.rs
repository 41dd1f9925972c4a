//! In-memory process doubles for deterministic strategy tests.

use std::{
    io,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    task::{Context, Poll},
    time::Duration,
};

use async_trait::async_trait;
use linetap_core::{BoxedReader, ChildControl, ProcessHandle};
use tokio::io::{AsyncRead, ReadBuf};

/// A child whose exit is scripted in terms of `try_wait` calls.
pub(crate) struct ScriptedChild {
    polls_left: Option<usize>,
    code: i32,
    killed: Arc<AtomicBool>,
}

impl ScriptedChild {
    /// Reports running for `polls` checks, then exited with `code`.
    pub(crate) fn exits_after(polls: usize, code: i32) -> (Self, Arc<AtomicBool>) {
        Self::build(Some(polls), code)
    }

    /// Runs until killed.
    pub(crate) fn never_exits() -> (Self, Arc<AtomicBool>) {
        Self::build(None, 0)
    }

    fn build(polls_left: Option<usize>, code: i32) -> (Self, Arc<AtomicBool>) {
        let killed = Arc::new(AtomicBool::new(false));
        let child = Self {
            polls_left,
            code,
            killed: Arc::clone(&killed),
        };
        (child, killed)
    }
}

#[async_trait]
impl ChildControl for ScriptedChild {
    fn try_wait(&mut self) -> io::Result<Option<i32>> {
        if self.killed.load(Ordering::SeqCst) {
            return Ok(Some(137));
        }
        match self.polls_left.as_mut() {
            Some(0) => Ok(Some(self.code)),
            Some(left) => {
                *left -= 1;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn wait(&mut self) -> io::Result<i32> {
        loop {
            if let Some(code) = self.try_wait()? {
                return Ok(code);
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    fn start_kill(&mut self) -> io::Result<()> {
        self.killed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub(crate) fn handle_with<O, E>(child: ScriptedChild, stdout: O, stderr: E) -> ProcessHandle
where
    O: AsyncRead + Send + Unpin + 'static,
    E: AsyncRead + Send + Unpin + 'static,
{
    let stdout: BoxedReader = Box::new(stdout);
    let stderr: BoxedReader = Box::new(stderr);
    ProcessHandle::new(4242, Box::new(child), Some(stdout), Some(stderr))
}

/// Yields its data, then fails every read.
pub(crate) struct FailingReader {
    data: &'static [u8],
}

impl FailingReader {
    pub(crate) const fn new(data: &'static [u8]) -> Self {
        Self { data }
    }
}

impl AsyncRead for FailingReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.data.is_empty() {
            return Poll::Ready(Err(io::Error::other("simulated read failure")));
        }
        let n = buf.remaining().min(self.data.len());
        buf.put_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Poll::Ready(Ok(()))
    }
}
