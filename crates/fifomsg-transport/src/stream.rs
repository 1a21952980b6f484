use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::time::Duration;

use crate::error::Result;

/// An open named pipe descriptor. Implements Read + Write.
///
/// The descriptor is always non-blocking. Callers that want to wait for data
/// use [`FifoStream::wait_readable`] / [`FifoStream::wait_writable`] instead
/// of blocking inside `read`/`write`.
pub struct FifoStream {
    file: File,
}

impl Read for FifoStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for FifoStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

impl FifoStream {
    pub(crate) fn from_file(file: File) -> Self {
        Self { file }
    }

    /// Wait until the FIFO has bytes to read.
    ///
    /// Returns `Ok(false)` when the timeout elapsed (or the wait was
    /// interrupted by a signal) without the descriptor becoming readable.
    /// `None` waits indefinitely.
    pub fn wait_readable(&self, timeout: Option<Duration>) -> Result<bool> {
        poll_fd(self.file.as_raw_fd(), libc::POLLIN, timeout)
    }

    /// Wait until the FIFO can accept more bytes.
    pub fn wait_writable(&self, timeout: Option<Duration>) -> Result<bool> {
        poll_fd(self.file.as_raw_fd(), libc::POLLOUT, timeout)
    }

    /// Try to clone this stream (duplicates the file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        let cloned = self.file.try_clone()?;
        Ok(Self::from_file(cloned))
    }
}

impl AsRawFd for FifoStream {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl std::fmt::Debug for FifoStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FifoStream")
            .field("fd", &self.file.as_raw_fd())
            .finish()
    }
}

fn poll_fd(fd: RawFd, events: libc::c_short, timeout: Option<Duration>) -> Result<bool> {
    let timeout_ms = match timeout {
        Some(timeout) => timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int,
        None => -1,
    };
    let mut pfd = libc::pollfd {
        fd,
        events,
        revents: 0,
    };

    // SAFETY: `pfd` is a valid, writable pollfd and the count passed is 1.
    let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
    if rc < 0 {
        let err = std::io::Error::last_os_error();
        if err.kind() == ErrorKind::Interrupted {
            return Ok(false);
        }
        return Err(err.into());
    }

    Ok(rc > 0 && (pfd.revents & (events | libc::POLLHUP | libc::POLLERR)) != 0)
}
