//! Identifier-tagged messaging over POSIX named pipes.
//!
//! fifomsg sends discrete `(identifier, payload)` messages through a FIFO
//! node shared by unrelated processes. Each message is wrapped in a
//! self-delimiting text-marker frame, so a reader can recover message
//! boundaries from the raw byte stream and route each payload to the
//! handler registered for its identifier.
//!
//! # Crate Structure
//!
//! - [`transport`]: FIFO node creation and non-blocking descriptors
//! - [`frame`]: escaping, the wire codec and stream reassembly
//! - [`pipe`]: read/write pipe endpoints with a background listener
//!
//! ```no_run
//! use fifomsg::pipe::{NamedPipe, PipeAccess};
//!
//! let mut reader = NamedPipe::open("/tmp/demo.fifo", PipeAccess::Read)?;
//! reader.register_handler("NAMEDPIPE", |content: &[u8]| {
//!     println!("{}", String::from_utf8_lossy(content));
//! })?;
//! reader.start_listening()?;
//!
//! let mut writer = NamedPipe::open("/tmp/demo.fifo", PipeAccess::Write)?;
//! writer.send("NAMEDPIPE", b"Some special message 0")?;
//! # Ok::<(), fifomsg::pipe::PipeError>(())
//! ```

/// Re-export transport types.
pub mod transport {
    pub use fifomsg_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use fifomsg_frame::*;
}

/// Re-export pipe types.
pub mod pipe {
    pub use fifomsg_pipe::*;
}
