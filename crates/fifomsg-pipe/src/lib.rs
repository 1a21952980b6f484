//! Named pipe endpoints for fifomsg.
//!
//! This is the "just works" layer. Open a FIFO for writing and `send`
//! identifier-tagged messages, or open it for reading, register one handler
//! per identifier and let a background listener dispatch every frame that
//! arrives.

pub mod config;
pub mod error;
#[cfg(unix)]
pub mod pipe;
pub mod registry;

pub use config::{PipeAccess, PipeConfig, DEFAULT_FIFO_MODE, DEFAULT_POLL_INTERVAL};
pub use error::{PipeError, Result};
#[cfg(unix)]
pub use pipe::NamedPipe;
pub use registry::{Handler, HandlerRegistry};
