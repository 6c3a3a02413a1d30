//! Stream size adapter
//!
//! Upload helpers discover a payload's length by seeking to the end of the
//! stream and back. A network download cannot seek, so [`SizedStream`]
//! answers that probe from a size declared up front and otherwise just
//! forwards reads.
//!
//! Only the probe pattern is honored:
//! - `SeekFrom::End(0)` reports the declared size
//! - `SeekFrom::Start(0)` before any byte was read reports `0`
//! - anything else reports the current position and moves nothing
//!
//! Uploads read strictly forward, so the unsupported seeks never change
//! which bytes are sent.

use std::io::{self, SeekFrom};
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use tokio::io::{AsyncRead, AsyncSeek, ReadBuf};

/// Forward-only reader that reports a precomputed length when probed
#[derive(Debug)]
pub struct SizedStream<R> {
    inner: R,
    size: u64,
    position: u64,
    pending_seek: Option<u64>,
}

impl<R> SizedStream<R> {
    /// Wraps `inner`, declaring its total length as `size` bytes
    pub fn new(inner: R, size: u64) -> Self {
        Self {
            inner,
            size,
            position: 0,
            pending_seek: None,
        }
    }

    /// Declared total length in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Bytes read so far
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Always true; callers must not fall back to buffering the whole body
    pub fn is_seekable(&self) -> bool {
        true
    }

    /// Answers a seek request without touching the underlying reader
    pub fn reported_seek(&self, target: SeekFrom) -> u64 {
        match target {
            SeekFrom::End(0) => self.size,
            SeekFrom::Start(0) if self.position == 0 => 0,
            _ => self.position,
        }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for SizedStream<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;
        this.position += (buf.filled().len() - before) as u64;
        Poll::Ready(Ok(()))
    }
}

impl<R: Unpin> AsyncSeek for SizedStream<R> {
    fn start_seek(self: Pin<&mut Self>, target: SeekFrom) -> io::Result<()> {
        let this = self.get_mut();
        this.pending_seek = Some(this.reported_seek(target));
        Ok(())
    }

    fn poll_complete(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        let this = self.get_mut();
        let reported = this.pending_seek.take().unwrap_or(this.position);
        Poll::Ready(Ok(reported))
    }
}
