use std::io::{ErrorKind, Read};

use fifomsg_transport::is_transient;
use tracing::{debug, trace, warn};

use crate::codec::{scan_frame, DecodedMessage, FrameConfig, Scan};
use crate::error::{FrameError, Result};

/// Outcome of a single read from the underlying stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// This many bytes were appended to the receive buffer.
    Data(usize),
    /// Nothing available right now; try again later.
    Pending,
}

/// Reassembles frames from any `Read` stream.
///
/// Bytes are appended at the fill cursor and consumed only from the front,
/// after a frame is decoded or unusable bytes are skipped. When a read fills
/// the buffer without completing a frame, the buffer grows by
/// [`FrameConfig::buffer_increment`], so memory is bounded by the largest
/// frame in flight.
pub struct FrameReader<T> {
    inner: T,
    buf: Vec<u8>,
    filled: usize,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: vec![0; config.initial_buffer_capacity.max(1)],
            filled: 0,
            config,
        }
    }

    /// Read once from the stream into the free tail of the buffer.
    ///
    /// Interrupted reads are retried. "No data yet" and "no writer yet"
    /// conditions are reported as [`Fill::Pending`]. End-of-file is
    /// [`FrameError::ConnectionClosed`].
    pub fn fill(&mut self) -> Result<Fill> {
        if self.filled == self.buf.len() {
            self.grow(self.config.buffer_increment);
        }

        let read = loop {
            match self.inner.read(&mut self.buf[self.filled..]) {
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                other => break other,
            }
        };

        match read {
            Ok(0) => Err(FrameError::ConnectionClosed),
            Ok(n) => {
                self.filled += n;
                trace!(read = n, buffered = self.filled, "filled receive buffer");
                Ok(Fill::Data(n))
            }
            Err(err) if is_transient(&err) => Ok(Fill::Pending),
            Err(err) => Err(FrameError::Io(err)),
        }
    }

    /// Read the next complete frame (blocking on the stream's own terms).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached and an
    /// `Io` error of kind `WouldBlock` when a non-blocking stream runs dry or
    /// has no writer yet.
    pub fn read_frame(&mut self) -> Result<DecodedMessage> {
        loop {
            if let Some(msg) = self.next_frame() {
                return Ok(msg);
            }

            if self.fill()? == Fill::Pending {
                return Err(FrameError::Io(std::io::Error::from(ErrorKind::WouldBlock)));
            }
        }
    }
}

impl<T> FrameReader<T> {
    /// Extract the next complete frame already in the buffer.
    ///
    /// Does not touch the stream. Unusable bytes in front of the next frame
    /// are discarded along the way.
    pub fn next_frame(&mut self) -> Option<DecodedMessage> {
        loop {
            match scan_frame(&self.buf[..self.filled], self.config.max_frame_size) {
                Scan::Complete(msg) => {
                    self.consume(msg.consumed);
                    trace!(
                        identifier = %msg.identifier,
                        size = msg.content.len(),
                        consumed = msg.consumed,
                        "decoded frame"
                    );
                    return Some(msg);
                }
                Scan::Skip { len, reason } => {
                    warn!(discarded = len, ?reason, "skipping unusable bytes in pipe stream");
                    self.consume(len);
                }
                Scan::Incomplete => return None,
            }
        }
    }

    /// Append bytes that arrived by other means (tests, async readers).
    pub fn feed(&mut self, bytes: &[u8]) {
        let free = self.buf.len() - self.filled;
        if bytes.len() > free {
            let step = self.config.buffer_increment.max(1);
            let missing = bytes.len() - free;
            self.grow(missing.div_ceil(step) * step);
        }
        self.buf[self.filled..self.filled + bytes.len()].copy_from_slice(bytes);
        self.filled += bytes.len();
    }

    /// Unconsumed bytes currently held.
    pub fn buffered(&self) -> &[u8] {
        &self.buf[..self.filled]
    }

    /// Current receive buffer capacity.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update maximum frame size for subsequent decoding.
    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.config.max_frame_size = max_frame_size;
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    fn consume(&mut self, len: usize) {
        self.buf.copy_within(len..self.filled, 0);
        self.filled -= len;
    }

    fn grow(&mut self, by: usize) {
        let capacity = self.buf.len() + by.max(1);
        self.buf.resize(capacity, 0);
        debug!(capacity, buffered = self.filled, "grew receive buffer");
    }
}

#[cfg(unix)]
impl FrameReader<fifomsg_transport::FifoStream> {
    /// Wait up to `timeout` for the FIFO to become readable, then read once.
    pub fn fill_timeout(&mut self, timeout: std::time::Duration) -> Result<Fill> {
        let readable = self
            .inner
            .wait_readable(Some(timeout))
            .map_err(crate::error::transport_to_frame_error)?;
        if !readable {
            return Ok(Fill::Pending);
        }
        self.fill()
    }
}
