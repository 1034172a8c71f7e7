//! Line framing over a byte stream with deadline-bounded reads

use bytes::BytesMut;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{timeout_at, Instant};
use tracing::warn;

/// Longest line kept before the buffer is discarded as noise
pub const MAX_LINE_LEN: usize = 1024;

/// Buffered `\n`-delimited line reader
///
/// Both NMEA sentences and modem diagnostics are CRLF-terminated text; bytes
/// that are not valid UTF-8 are replaced rather than rejected.
#[derive(Debug)]
pub struct LineReader<R> {
    inner: R,
    buf: BytesMut,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(MAX_LINE_LEN),
        }
    }

    /// Read the next line, giving up at `deadline`
    ///
    /// # Returns
    ///
    /// * `Ok(Some(line))` - A complete line with surrounding whitespace and
    ///   the terminator removed (may be empty)
    /// * `Ok(None)` - The deadline passed first; partial data stays buffered
    ///
    /// # Errors
    ///
    /// Returns error if the underlying read fails or the stream reaches EOF
    /// (a serial device that disappeared).
    ///
    /// Cancel safe: dropping the future loses no buffered bytes.
    pub async fn read_line_until(&mut self, deadline: Instant) -> io::Result<Option<String>> {
        loop {
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }

            if self.buf.len() > MAX_LINE_LEN {
                warn!("Discarding {} bytes without line terminator", self.buf.len());
                self.buf.clear();
            }

            match timeout_at(deadline, self.inner.read_buf(&mut self.buf)).await {
                Err(_) => return Ok(None),
                Ok(Ok(0)) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "serial stream closed",
                    ))
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) if e.kind() == io::ErrorKind::TimedOut => {
                    if Instant::now() >= deadline {
                        return Ok(None);
                    }
                }
                Ok(Err(e)) => return Err(e),
            }
        }
    }

    fn take_line(&mut self) -> Option<String> {
        let end = self.buf.iter().position(|&b| b == b'\n')?;
        let line = self.buf.split_to(end + 1);
        Some(String::from_utf8_lossy(&line).trim().to_string())
    }
}
