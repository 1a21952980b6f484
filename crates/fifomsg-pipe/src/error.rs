use crate::PipeAccess;

/// Errors that can occur in named pipe operations.
#[derive(Debug, thiserror::Error)]
pub enum PipeError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] fifomsg_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] fifomsg_frame::FrameError),

    /// The operation needs the other access mode.
    #[error("{operation} requires a {required} pipe, this one was opened for {actual}")]
    WrongAccess {
        operation: &'static str,
        required: PipeAccess,
        actual: PipeAccess,
    },

    /// A handler is already registered for this identifier.
    #[error("handler already registered for identifier {0:?}")]
    DuplicateHandler(String),

    /// Handlers can no longer be registered.
    #[error("listener already started")]
    AlreadyListening,

    /// The listener thread panicked (usually inside a handler).
    #[error("listener thread panicked")]
    WorkerPanicked,
}

pub type Result<T> = std::result::Result<T, PipeError>;
