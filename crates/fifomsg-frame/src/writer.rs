use std::io::{ErrorKind, Write};
#[cfg(unix)]
use std::time::Duration;

use bytes::BytesMut;
use tracing::trace;

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete frames to any `Write` stream.
///
/// Each frame is encoded into a scratch buffer and written out in full
/// before `send` returns, so frames from one writer never interleave.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Write a complete frame (blocking).
    ///
    /// Returns the number of bytes put on the wire.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<usize> {
        self.send(&frame.identifier, frame.payload.as_ref())
    }

    /// Encode and send a payload under an identifier.
    ///
    /// Returns the number of bytes put on the wire. A full non-blocking
    /// stream is retried after yielding the thread; `FifoStream` writers
    /// should prefer [`FrameWriter::send_waiting`].
    pub fn send(&mut self, identifier: &str, payload: &[u8]) -> Result<usize> {
        self.send_with(identifier, payload, |_| {
            std::thread::yield_now();
            Ok(())
        })
    }

    fn send_with<F>(&mut self, identifier: &str, payload: &[u8], mut on_full: F) -> Result<usize>
    where
        F: FnMut(&T) -> Result<()>,
    {
        self.buf.clear();
        let size = encode_frame(identifier, payload, &mut self.buf);
        if size > self.config.max_frame_size {
            self.buf.clear();
            return Err(FrameError::PayloadTooLarge {
                size,
                max: self.config.max_frame_size,
            });
        }

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => on_full(&self.inner)?,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        trace!(identifier, size, "wrote frame");
        self.flush()?;
        Ok(size)
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update maximum encoded frame size for subsequent sends.
    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.config.max_frame_size = max_frame_size;
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(unix)]
impl FrameWriter<fifomsg_transport::FifoStream> {
    /// Encode and send a payload, sleeping in `poll(2)` while the FIFO is full.
    ///
    /// Each wait lasts at most `poll_interval` before the write is retried.
    pub fn send_waiting(
        &mut self,
        identifier: &str,
        payload: &[u8],
        poll_interval: Duration,
    ) -> Result<usize> {
        self.send_with(identifier, payload, |stream| {
            stream
                .wait_writable(Some(poll_interval))
                .map(|_| ())
                .map_err(crate::error::transport_to_frame_error)
        })
    }
}
