use std::path::PathBuf;

/// Errors that can occur in FIFO transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to create the FIFO node.
    #[error("failed to create fifo at {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to open an existing FIFO.
    #[error("failed to open fifo at {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The path exists but is not a named pipe.
    #[error("{path} exists and is not a named pipe")]
    NotAFifo { path: PathBuf },

    /// An I/O error occurred on the open descriptor.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// Whether an I/O error only means "nothing to do right now".
///
/// Covers an empty non-blocking FIFO, a FIFO with no peer attached yet
/// (`ENXIO`) and signal interruption. Everything else is a hard failure.
pub fn is_transient(err: &std::io::Error) -> bool {
    if matches!(
        err.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::Interrupted
    ) {
        return true;
    }

    #[cfg(unix)]
    {
        err.raw_os_error() == Some(libc::ENXIO)
    }

    #[cfg(not(unix))]
    {
        false
    }
}
