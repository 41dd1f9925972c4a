//! Per-stream bookkeeping shared by both strategies.

use std::io;

use futures::FutureExt;
use linetap_core::{BoxedReader, LineSink, SinkError, StreamTag};

use crate::line_reader::LineReader;

/// One output stream being drained.
pub(crate) struct StreamState {
    tag: StreamTag,
    reader: Option<LineReader<BoxedReader>>,
    lines: usize,
    read_error: bool,
}

/// What a stream contributed once it is closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct StreamSummary {
    pub lines: usize,
    pub read_error: bool,
}

impl StreamState {
    pub(crate) fn new(tag: StreamTag, reader: BoxedReader) -> Self {
        Self {
            tag,
            reader: Some(LineReader::new(reader)),
            lines: 0,
            read_error: false,
        }
    }

    pub(crate) const fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    /// Read the next line. Never resolves once the stream is closed.
    pub(crate) async fn next_line(&mut self) -> io::Result<Option<String>> {
        match self.reader.as_mut() {
            Some(reader) => reader.next_line().await,
            None => futures::future::pending().await,
        }
    }

    /// Apply one read result. Returns `true` if a line was delivered.
    ///
    /// EOF and read errors close the stream, dropping its reader.
    pub(crate) fn on_read(
        &mut self,
        read: io::Result<Option<String>>,
        sink: &dyn LineSink,
    ) -> Result<bool, SinkError> {
        match read {
            Ok(Some(line)) => {
                sink.deliver(self.tag, &line)?;
                self.lines += 1;
                Ok(true)
            }
            Ok(None) => {
                tracing::trace!(stream = %self.tag, lines = self.lines, "Stream reached EOF");
                self.reader = None;
                Ok(false)
            }
            Err(e) => {
                tracing::warn!(stream = %self.tag, error = %e, "Stream read failed, closing it");
                self.reader = None;
                self.read_error = true;
                sink.deliver_error(self.tag, &e.to_string())?;
                Ok(false)
            }
        }
    }

    /// Deliver every line that can be read without waiting.
    ///
    /// Returns the number of lines delivered.
    pub(crate) fn drain_ready(&mut self, sink: &dyn LineSink) -> Result<usize, SinkError> {
        let mut delivered = 0;
        while let Some(reader) = self.reader.as_mut() {
            let Some(read) = reader.next_line().now_or_never() else {
                break;
            };
            if self.on_read(read, sink)? {
                delivered += 1;
            }
        }
        Ok(delivered)
    }

    /// Read until EOF or a read error, delivering every line.
    pub(crate) async fn pump(mut self, sink: &dyn LineSink) -> Result<StreamSummary, SinkError> {
        while self.is_open() {
            let read = self.next_line().await;
            self.on_read(read, sink)?;
        }
        Ok(self.close())
    }

    /// Drop the reader and report what the stream contributed.
    pub(crate) fn close(mut self) -> StreamSummary {
        self.reader = None;
        StreamSummary {
            lines: self.lines,
            read_error: self.read_error,
        }
    }
}
