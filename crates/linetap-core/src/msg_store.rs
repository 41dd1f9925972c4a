//! Broadcast + history message store.

use std::{
    collections::VecDeque,
    sync::{PoisonError, RwLock},
};

use futures::{StreamExt, future};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::{LineSink, LogMsg, SinkError, StreamTag};

/// Default history size limit (100 MB).
const HISTORY_BYTES: usize = 100_000 * 1024;

#[derive(Clone)]
struct StoredMsg {
    msg: LogMsg,
    bytes: usize,
}

struct Inner {
    history: VecDeque<StoredMsg>,
    total_bytes: usize,
}

/// Append-only message store with broadcast and history support.
///
/// Safe for concurrent delivery: every push appends to history and
/// broadcasts under one write lock, so history and live order agree.
/// Late subscribers receive history first, then live updates.
pub struct MsgStore {
    inner: RwLock<Inner>,
    sender: broadcast::Sender<LogMsg>,
    history_limit: usize,
}

impl Default for MsgStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MsgStore {
    /// Create a new message store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_history_limit(HISTORY_BYTES)
    }

    /// Create a store that keeps at most `bytes` of history.
    #[must_use]
    pub fn with_history_limit(bytes: usize) -> Self {
        let (sender, _) = broadcast::channel(10000);
        Self {
            inner: RwLock::new(Inner {
                history: VecDeque::with_capacity(32),
                total_bytes: 0,
            }),
            sender,
            history_limit: bytes,
        }
    }

    /// Push a message to both live listeners and history.
    pub fn push(&self, msg: LogMsg) {
        let bytes = msg.approx_bytes();

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        while inner.total_bytes.saturating_add(bytes) > self.history_limit {
            if let Some(front) = inner.history.pop_front() {
                inner.total_bytes = inner.total_bytes.saturating_sub(front.bytes);
            } else {
                break;
            }
        }
        let _ = self.sender.send(msg.clone()); // live listeners
        inner.history.push_back(StoredMsg { msg, bytes });
        inner.total_bytes = inner.total_bytes.saturating_add(bytes);
    }

    /// Push stdout message.
    pub fn push_stdout<S: Into<String>>(&self, s: S) {
        self.push(LogMsg::Stdout(s.into()));
    }

    /// Push stderr message.
    pub fn push_stderr<S: Into<String>>(&self, s: S) {
        self.push(LogMsg::Stderr(s.into()));
    }

    /// Push exit notification.
    pub fn push_exited(&self, code: i32) {
        self.push(LogMsg::Exited(code));
    }

    /// Push finished notification.
    pub fn push_finished(&self) {
        self.push(LogMsg::Finished);
    }

    /// Get a snapshot of the history.
    #[must_use]
    pub fn get_history(&self) -> Vec<LogMsg> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .history
            .iter()
            .map(|s| s.msg.clone())
            .collect()
    }

    /// Lines recorded so far for one stream, in delivery order.
    #[must_use]
    pub fn lines(&self, stream: StreamTag) -> Vec<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .history
            .iter()
            .filter(|s| s.msg.stream() == Some(stream))
            .filter_map(|s| s.msg.as_line().map(ToString::to_string))
            .collect()
    }

    /// Stream errors recorded so far.
    #[must_use]
    pub fn stream_errors(&self) -> Vec<(StreamTag, String)> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .history
            .iter()
            .filter_map(|s| match &s.msg {
                LogMsg::StreamError { stream, detail } => Some((*stream, detail.clone())),
                _ => None,
            })
            .collect()
    }

    /// Stream that yields history first, then live updates.
    #[must_use]
    pub fn history_plus_stream(
        &self,
    ) -> futures::stream::BoxStream<'static, Result<LogMsg, std::io::Error>> {
        // Subscribe while holding the read lock so nothing slips between the
        // history snapshot and the live receiver.
        let (history, rx) = {
            let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            let history: Vec<LogMsg> = inner.history.iter().map(|s| s.msg.clone()).collect();
            (history, self.sender.subscribe())
        };

        let hist = futures::stream::iter(history.into_iter().map(Ok::<_, std::io::Error>));
        let live = BroadcastStream::new(rx)
            .filter_map(|res: Result<LogMsg, _>| async move { res.ok().map(Ok::<_, std::io::Error>) });

        Box::pin(hist.chain(live))
    }

    /// Stream of one output stream's lines (until Finished).
    #[must_use]
    pub fn line_stream(
        &self,
        stream: StreamTag,
    ) -> futures::stream::BoxStream<'static, Result<String, std::io::Error>> {
        self.history_plus_stream()
            .take_while(|res| future::ready(!matches!(res, Ok(LogMsg::Finished))))
            .filter_map(move |res| async move {
                match res {
                    Ok(msg) if msg.stream() == Some(stream) => msg.as_line().map(|s| Ok(s.to_string())),
                    _ => None,
                }
            })
            .boxed()
    }
}

impl LineSink for MsgStore {
    fn deliver(&self, stream: StreamTag, line: &str) -> Result<(), SinkError> {
        self.push(LogMsg::line(stream, line));
        Ok(())
    }

    fn deliver_error(&self, stream: StreamTag, detail: &str) -> Result<(), SinkError> {
        self.push(LogMsg::StreamError {
            stream,
            detail: detail.to_string(),
        });
        Ok(())
    }

    fn finish(&self, exit_code: Option<i32>) -> Result<(), SinkError> {
        if let Some(code) = exit_code {
            self.push_exited(code);
        }
        self.push_finished();
        Ok(())
    }
}
