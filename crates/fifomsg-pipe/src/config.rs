use std::time::Duration;

use fifomsg_frame::FrameConfig;

/// How long the listener waits for data before re-checking its stop flag.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Permission bits for FIFO nodes this crate creates.
pub const DEFAULT_FIFO_MODE: u32 = 0o666;

/// Direction a [`crate::NamedPipe`] was opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipeAccess {
    Read,
    Write,
}

impl std::fmt::Display for PipeAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipeAccess::Read => f.write_str("read"),
            PipeAccess::Write => f.write_str("write"),
        }
    }
}

/// Behavior knobs for a [`crate::NamedPipe`].
#[derive(Debug, Clone)]
pub struct PipeConfig {
    /// Buffering and size limits for frames in both directions.
    pub frame: FrameConfig,
    /// Upper bound on how long `stop` waits for the listener to notice.
    pub poll_interval: Duration,
    /// Permission bits for a FIFO node created by `open`.
    pub fifo_mode: u32,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            fifo_mode: DEFAULT_FIFO_MODE,
        }
    }
}
