use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;

use fifomsg_frame::{Fill, FrameReader, FrameWriter};
use fifomsg_transport::{FifoStream, NamedFifo};
use tracing::{debug, error, trace};

use crate::config::{PipeAccess, PipeConfig};
use crate::error::{PipeError, Result};
use crate::registry::HandlerRegistry;

/// One end of a named pipe.
///
/// A write pipe sends frames synchronously on the caller's thread. A read
/// pipe collects handlers, then hands its descriptor and handlers to a
/// background listener thread on [`NamedPipe::start_listening`]. The
/// listener is stopped and joined by [`NamedPipe::stop`] or on drop, before
/// the descriptor is released.
///
/// The FIFO node itself is left on disk.
pub struct NamedPipe {
    path: PathBuf,
    config: PipeConfig,
    side: Side,
}

enum Side {
    Write(FrameWriter<FifoStream>),
    Idle {
        reader: FrameReader<FifoStream>,
        registry: HandlerRegistry,
    },
    Listening(Listener),
    Stopped,
}

struct Listener {
    stop: Arc<AtomicBool>,
    alive: Arc<AtomicBool>,
    handle: JoinHandle<Result<()>>,
}

impl NamedPipe {
    /// Open (creating if needed) the FIFO at `path` with default settings.
    pub fn open(path: impl AsRef<Path>, access: PipeAccess) -> Result<Self> {
        Self::open_with_config(path, access, PipeConfig::default())
    }

    /// Open (creating if needed) the FIFO at `path`.
    pub fn open_with_config(
        path: impl AsRef<Path>,
        access: PipeAccess,
        config: PipeConfig,
    ) -> Result<Self> {
        let fifo = NamedFifo::new(path).with_mode(config.fifo_mode);
        let stream = fifo.open_stream()?;

        let side = match access {
            PipeAccess::Write => Side::Write(FrameWriter::with_config(stream, config.frame.clone())),
            PipeAccess::Read => Side::Idle {
                reader: FrameReader::with_config(stream, config.frame.clone()),
                registry: HandlerRegistry::new(),
            },
        };
        debug!(path = ?fifo.path(), %access, "opened named pipe");

        Ok(Self {
            path: fifo.path().to_path_buf(),
            config,
            side,
        })
    }

    /// Register the handler for messages tagged `identifier`.
    ///
    /// Read pipes only, and only before [`NamedPipe::start_listening`].
    pub fn register_handler<F>(&mut self, identifier: impl Into<String>, handler: F) -> Result<()>
    where
        F: FnMut(&[u8]) + Send + 'static,
    {
        match &mut self.side {
            Side::Idle { registry, .. } => registry.register(identifier, handler),
            Side::Write(_) => Err(self.wrong_access("register_handler", PipeAccess::Read)),
            Side::Listening(_) | Side::Stopped => Err(PipeError::AlreadyListening),
        }
    }

    /// Start the background listener. Calling it again is a no-op.
    ///
    /// If the thread cannot be spawned, the pipe stays idle with its
    /// handlers and the call may be retried.
    pub fn start_listening(&mut self) -> Result<()> {
        let identifiers: Vec<String> = match &self.side {
            Side::Idle { registry, .. } => registry
                .identifiers()
                .into_iter()
                .map(String::from)
                .collect(),
            Side::Listening(_) => return Ok(()),
            Side::Write(_) => return Err(self.wrong_access("start_listening", PipeAccess::Read)),
            Side::Stopped => return Err(PipeError::AlreadyListening),
        };

        let stop = Arc::new(AtomicBool::new(false));
        let alive = Arc::new(AtomicBool::new(true));
        let poll_interval = self.config.poll_interval;
        let (handoff, inbox) = mpsc::sync_channel::<(FrameReader<FifoStream>, HandlerRegistry)>(1);

        let handle = {
            let stop = Arc::clone(&stop);
            let guard = AliveGuard(Arc::clone(&alive));
            let path = self.path.clone();
            std::thread::Builder::new()
                .name("fifomsg-listener".to_string())
                .spawn(move || {
                    let _guard = guard;
                    let Ok((reader, registry)) = inbox.recv() else {
                        return Ok(());
                    };
                    let result = listen(reader, registry, &stop, poll_interval);
                    if let Err(err) = &result {
                        error!(path = ?path, error = %err, "listener stopped on error");
                    }
                    result
                })
                .map_err(|e| PipeError::Transport(e.into()))?
        };

        let Side::Idle { reader, registry } = std::mem::replace(&mut self.side, Side::Stopped)
        else {
            return Ok(());
        };
        if let Err(mpsc::SendError((reader, registry))) = handoff.send((reader, registry)) {
            self.side = Side::Idle { reader, registry };
            let _ = handle.join();
            return Err(PipeError::WorkerPanicked);
        }

        debug!(path = ?self.path, ?identifiers, "listener started");
        self.side = Side::Listening(Listener {
            stop,
            alive,
            handle,
        });
        Ok(())
    }

    /// Encode and write one message. Blocks until every byte is written,
    /// sleeping up to the poll interval at a time while the FIFO is full.
    ///
    /// Returns the number of bytes put on the wire.
    pub fn send(&mut self, identifier: &str, payload: &[u8]) -> Result<usize> {
        match &mut self.side {
            Side::Write(writer) => {
                Ok(writer.send_waiting(identifier, payload, self.config.poll_interval)?)
            }
            _ => Err(self.wrong_access("send", PipeAccess::Write)),
        }
    }

    /// Stop the listener (if any), wait for it and report how it ended.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown()
    }

    /// Whether the background listener is running.
    pub fn is_listening(&self) -> bool {
        match &self.side {
            Side::Listening(listener) => listener.alive.load(Ordering::Acquire),
            _ => false,
        }
    }

    /// Path of the FIFO node.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Direction this pipe was opened for.
    pub fn access(&self) -> PipeAccess {
        match self.side {
            Side::Write(_) => PipeAccess::Write,
            _ => PipeAccess::Read,
        }
    }

    /// Pipe configuration.
    pub fn config(&self) -> &PipeConfig {
        &self.config
    }

    fn wrong_access(&self, operation: &'static str, required: PipeAccess) -> PipeError {
        PipeError::WrongAccess {
            operation,
            required,
            actual: self.access(),
        }
    }

    fn shutdown(&mut self) -> Result<()> {
        let Side::Listening(listener) = std::mem::replace(&mut self.side, Side::Stopped) else {
            return Ok(());
        };

        listener.stop.store(true, Ordering::Release);
        let outcome = listener
            .handle
            .join()
            .map_err(|_| PipeError::WorkerPanicked)?;
        debug!(path = ?self.path, "listener stopped");
        outcome
    }
}

impl Drop for NamedPipe {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

impl std::fmt::Debug for NamedPipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedPipe")
            .field("path", &self.path)
            .field("access", &self.access())
            .field("listening", &self.is_listening())
            .finish()
    }
}

/// Clears the liveness flag however the listener thread exits.
struct AliveGuard(Arc<AtomicBool>);

impl Drop for AliveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn listen(
    mut reader: FrameReader<FifoStream>,
    mut registry: HandlerRegistry,
    stop: &AtomicBool,
    poll_interval: Duration,
) -> Result<()> {
    while !stop.load(Ordering::Acquire) {
        if reader.fill_timeout(poll_interval)? == Fill::Pending {
            continue;
        }

        while let Some(msg) = reader.next_frame() {
            let handled = registry.dispatch(&msg.identifier, &msg.content);
            trace!(identifier = %msg.identifier, handled, "dispatched message");
        }
    }
    Ok(())
}
