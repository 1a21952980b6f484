//! Text-marker message framing for named pipes.
//!
//! This is the core of fifomsg. Every message is framed as:
//!
//! ```text
//! NAMEDPIPE:START:<idLen>:<msgLen>:<escapedId>:<escapedPayload>:END:
//! ```
//!
//! Reserved tokens inside the identifier and payload are backslash-escaped,
//! and both lengths count escaped bytes, so arbitrary binary payloads pass
//! through unchanged. [`FrameReader`] reassembles frames from a stream that
//! delivers bytes in arbitrary chunks.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod error;
pub mod escape;
pub mod reader;
pub mod token;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::FifoCodec;
pub use codec::{
    encode_frame, encoded_len, scan_frame, DecodedMessage, Frame, FrameConfig, Scan, SkipReason,
    DEFAULT_BUFFER_INCREMENT, DEFAULT_MAX_FRAME_SIZE,
};
pub use error::{FrameError, Result};
pub use escape::{escape, escape_all, unescape, unescape_all};
pub use reader::{Fill, FrameReader};
pub use token::{DEFAULT_IDENTIFIER, END, FRAME_MARKER, FRAME_TRAILER, PREFIX, RESERVED_TOKENS, START};
pub use writer::FrameWriter;
