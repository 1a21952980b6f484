//! Named FIFO transport.
//!
//! Creates and opens POSIX named pipes and exposes them as a non-blocking
//! byte stream:
//! - [`NamedFifo`] handles node creation and open modes
//! - [`FifoStream`] implements `Read` + `Write` with readiness polling
//!
//! This is the lowest layer of fifomsg. Framing lives in `fifomsg-frame`.

pub mod error;

#[cfg(unix)]
pub mod fifo;
#[cfg(unix)]
pub mod stream;

pub use error::{is_transient, Result, TransportError};

#[cfg(unix)]
pub use fifo::NamedFifo;
#[cfg(unix)]
pub use stream::FifoStream;
