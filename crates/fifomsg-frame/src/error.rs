/// Errors that can occur while reading or writing frames.
///
/// Malformed frame data is not an error: the reader skips it and keeps
/// scanning (see [`crate::SkipReason`]).
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The encoded frame exceeds the configured maximum size.
    #[error("frame too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream reached end-of-file or stopped accepting bytes.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;

#[cfg(unix)]
pub(crate) fn transport_to_frame_error(err: fifomsg_transport::TransportError) -> FrameError {
    match err {
        fifomsg_transport::TransportError::Io(io) => FrameError::Io(io),
        fifomsg_transport::TransportError::Create { source, .. }
        | fifomsg_transport::TransportError::Open { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
