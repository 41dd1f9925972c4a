//! Reader-task strategy.
//!
//! Each stream gets its own task that reads until EOF. The control flow only
//! waits for the process and then joins the readers; EOF, not the exit
//! notification, is what ends a stream, so nothing written before exit can
//! be missed.

use std::sync::Arc;

use linetap_core::{LineSink, ProcessHandle, SinkError, StreamTag};
use tokio::task::{JoinError, JoinHandle};

use crate::{
    MuxError,
    control::RunControl,
    multiplexer::Drained,
    stream_state::{StreamState, StreamSummary},
};

type ReaderTask = JoinHandle<Result<StreamSummary, SinkError>>;

/// Aborts the reader task if the run ends before it is joined.
struct Reader {
    task: Option<ReaderTask>,
}

impl Reader {
    fn spawn(tag: StreamTag, stream: StreamState, sink: &Arc<dyn LineSink>) -> Self {
        let sink = Arc::clone(sink);
        let task = tokio::spawn(async move {
            let summary = stream.pump(sink.as_ref()).await?;
            tracing::trace!(stream = %tag, lines = summary.lines, "Reader task finished");
            Ok(summary)
        });
        Self { task: Some(task) }
    }

    const fn is_running(&self) -> bool {
        self.task.is_some()
    }

    async fn join(&mut self) -> Result<Result<StreamSummary, SinkError>, JoinError> {
        match self.task.as_mut() {
            Some(task) => task.await,
            None => futures::future::pending().await,
        }
    }

    fn finish(
        &mut self,
        joined: Result<Result<StreamSummary, SinkError>, JoinError>,
    ) -> Result<StreamSummary, MuxError> {
        self.task = None;
        Ok(joined??)
    }
}

impl Drop for Reader {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

pub(crate) async fn drain(
    handle: &mut ProcessHandle,
    sink: &Arc<dyn LineSink>,
    control: RunControl,
) -> Result<Drained, MuxError> {
    let (stdout, stderr) = handle.take_streams()?;
    let mut out = Reader::spawn(StreamTag::Stdout, StreamState::new(StreamTag::Stdout, stdout), sink);
    let mut err = Reader::spawn(StreamTag::Stderr, StreamState::new(StreamTag::Stderr, stderr), sink);

    let stopped = control.stopped();
    tokio::pin!(stopped);

    let (mut exit_code, mut stdout, mut stderr) = (None, None, None);
    loop {
        if let (Some(exit_code), Some(stdout), Some(stderr)) = (exit_code, stdout, stderr) {
            return Ok(Drained {
                exit_code,
                stdout,
                stderr,
            });
        }
        tokio::select! {
            reason = &mut stopped => return Err(reason.into()),
            code = handle.wait(), if exit_code.is_none() => {
                let code = code.map_err(MuxError::Wait)?;
                tracing::debug!(code, "Process exited, joining readers");
                exit_code = Some(code);
            }
            joined = out.join(), if out.is_running() => stdout = Some(out.finish(joined)?),
            joined = err.join(), if err.is_running() => stderr = Some(err.finish(joined)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::atomic::Ordering, time::Duration};

    use linetap_core::{FnSink, MsgStore};
    use tokio::io::AsyncWriteExt;

    use super::*;
    use crate::testing::{FailingReader, ScriptedChild, handle_with};

    fn control() -> RunControl {
        RunControl::new(None, None)
    }

    #[tokio::test]
    async fn test_output_after_exit_notification_is_kept() {
        let (child, _) = ScriptedChild::exits_after(0, 0);
        let (mut out_tx, out_rx) = tokio::io::duplex(1024);
        let (err_tx, err_rx) = tokio::io::duplex(1024);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            out_tx.write_all(b"one\ntwo\nthree").await.unwrap();
            drop(out_tx);
            drop(err_tx);
        });

        let mut handle = handle_with(child, out_rx, err_rx);
        let store = Arc::new(MsgStore::new());
        let sink: Arc<dyn LineSink> = store.clone();
        let drained = drain(&mut handle, &sink, control()).await.unwrap();

        assert_eq!(drained.exit_code, 0);
        assert_eq!(store.lines(StreamTag::Stdout), vec!["one", "two", "three"]);
        assert_eq!(drained.stdout.lines, 3);
        assert_eq!(drained.stderr.lines, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_readers_keep_stream_order() {
        let (child, _) = ScriptedChild::exits_after(0, 0);
        let out: Vec<u8> = (0..1000).flat_map(|i| format!("o{i}\n").into_bytes()).collect();
        let errs: Vec<u8> = (0..1000).flat_map(|i| format!("e{i}\n").into_bytes()).collect();

        let mut handle = handle_with(
            child,
            std::io::Cursor::new(out),
            std::io::Cursor::new(errs),
        );
        let store = Arc::new(MsgStore::new());
        let sink: Arc<dyn LineSink> = store.clone();
        let drained = drain(&mut handle, &sink, control()).await.unwrap();

        let expected_out: Vec<String> = (0..1000).map(|i| format!("o{i}")).collect();
        let expected_err: Vec<String> = (0..1000).map(|i| format!("e{i}")).collect();
        assert_eq!(store.lines(StreamTag::Stdout), expected_out);
        assert_eq!(store.lines(StreamTag::Stderr), expected_err);
        assert_eq!(drained.stdout.lines + drained.stderr.lines, 2000);
    }

    #[tokio::test]
    async fn test_read_error_reported_once() {
        let (child, _) = ScriptedChild::exits_after(1, 3);
        let mut handle = handle_with(child, &b"a\n"[..], FailingReader::new(b"partial"));
        let store = Arc::new(MsgStore::new());
        let sink: Arc<dyn LineSink> = store.clone();
        let drained = drain(&mut handle, &sink, control()).await.unwrap();

        assert_eq!(drained.exit_code, 3);
        assert_eq!(store.lines(StreamTag::Stdout), vec!["a"]);
        assert!(store.lines(StreamTag::Stderr).is_empty());
        assert_eq!(store.stream_errors().len(), 1);
        assert!(drained.stderr.read_error);
    }

    #[tokio::test]
    async fn test_sink_error_surfaces_before_exit() {
        let (child, killed) = ScriptedChild::never_exits();
        let mut handle = handle_with(child, &b"x\n"[..], &b""[..]);
        let sink: Arc<dyn LineSink> =
            Arc::new(FnSink::new(|_, _: &str| Err(SinkError::Closed)));

        let err = drain(&mut handle, &sink, control()).await.unwrap_err();
        assert!(matches!(err, MuxError::Sink(SinkError::Closed)));
        // Teardown is the multiplexer's job, not the strategy's.
        assert!(!killed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_timeout_stops_the_run() {
        let (child, _) = ScriptedChild::never_exits();
        let (_out_tx, out_rx) = tokio::io::duplex(64);
        let (_err_tx, err_rx) = tokio::io::duplex(64);

        let mut handle = handle_with(child, out_rx, err_rx);
        let sink: Arc<dyn LineSink> = Arc::new(MsgStore::new());
        let control = RunControl::new(None, Some(Duration::from_millis(30)));

        let err = drain(&mut handle, &sink, control).await.unwrap_err();
        assert!(matches!(err, MuxError::TimedOut(d) if d == Duration::from_millis(30)));
    }
}
