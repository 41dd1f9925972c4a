//! Cancel-safe line splitting over an async byte reader.

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Reads newline-terminated lines, decoding them as UTF-8 with lossy
/// replacement.
///
/// Partial input is kept in the reader between calls, so a `next_line`
/// future may be dropped at any point (in `select!`, or after a single
/// poll) without losing bytes.
pub struct LineReader<R> {
    inner: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            inner: BufReader::new(reader),
            buf: Vec::new(),
        }
    }

    /// Next complete line with its terminator stripped.
    ///
    /// An unterminated fragment is returned as a line once EOF is reached;
    /// after that `Ok(None)` is returned.
    ///
    /// # Errors
    /// Returns the underlying read error. Bytes read before the error stay
    /// buffered.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        let n = self.inner.read_until(b'\n', &mut self.buf).await?;
        if n == 0 && self.buf.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.take_buffered()))
    }

    fn take_buffered(&mut self) -> String {
        let line = decode_line(&self.buf);
        self.buf.clear();
        line
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .rposition(|b| !matches!(b, b'\n' | b'\r'))
        .map_or(0, |i| i + 1);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
