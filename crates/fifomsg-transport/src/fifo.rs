use std::ffi::CString;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::FifoStream;

/// A named pipe (FIFO) node on the filesystem.
///
/// The node is shared by independent processes, so it is never removed
/// implicitly. Opening always uses `O_RDWR | O_NONBLOCK`: the open does not
/// block while the other side is absent, and holding both ends keeps writes
/// from raising `SIGPIPE` when the reader goes away.
#[derive(Debug, Clone)]
pub struct NamedFifo {
    path: PathBuf,
    mode: u32,
}

impl NamedFifo {
    /// Default permission mode for created FIFO nodes.
    pub const DEFAULT_MODE: u32 = 0o666;

    /// Describe a FIFO at `path` with the default creation mode.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            mode: Self::DEFAULT_MODE,
        }
    }

    /// Override the permission mode used if the node has to be created.
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    /// Create (if needed) and open the FIFO at `path` with default settings.
    pub fn open(path: impl AsRef<Path>) -> Result<FifoStream> {
        Self::new(path).open_stream()
    }

    /// Make sure a FIFO exists at the configured path.
    ///
    /// An existing FIFO is reused as-is. Any other kind of file is rejected
    /// with [`TransportError::NotAFifo`].
    pub fn ensure(&self) -> Result<()> {
        match std::fs::metadata(&self.path) {
            Ok(metadata) if metadata.file_type().is_fifo() => {
                debug!(path = ?self.path, "reusing existing fifo");
                Ok(())
            }
            Ok(_) => Err(TransportError::NotAFifo {
                path: self.path.clone(),
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => self.create(),
            Err(err) => Err(TransportError::Open {
                path: self.path.clone(),
                source: err,
            }),
        }
    }

    /// Create (if needed) and open the FIFO.
    pub fn open_stream(&self) -> Result<FifoStream> {
        self.ensure()?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&self.path)
            .map_err(|e| TransportError::Open {
                path: self.path.clone(),
                source: e,
            })?;

        debug!(path = ?self.path, "opened fifo");
        Ok(FifoStream::from_file(file))
    }

    /// Remove the FIFO node if one exists at the path.
    ///
    /// Returns `Ok(false)` when nothing was there. Non-FIFO files are left
    /// untouched and reported as [`TransportError::NotAFifo`].
    pub fn remove(&self) -> Result<bool> {
        match std::fs::symlink_metadata(&self.path) {
            Ok(metadata) if metadata.file_type().is_fifo() => {
                std::fs::remove_file(&self.path)?;
                debug!(path = ?self.path, "removed fifo");
                Ok(true)
            }
            Ok(_) => Err(TransportError::NotAFifo {
                path: self.path.clone(),
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// The filesystem path of this FIFO.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "named-fifo"
    }

    fn create(&self) -> Result<()> {
        let c_path =
            CString::new(self.path.as_os_str().as_bytes()).map_err(|e| TransportError::Create {
                path: self.path.clone(),
                source: std::io::Error::new(ErrorKind::InvalidInput, e),
            })?;

        // SAFETY: `c_path` is a valid NUL-terminated string that outlives the call.
        let rc = unsafe { libc::mkfifo(c_path.as_ptr(), self.mode as libc::mode_t) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            // Another process created it between our stat and mkfifo.
            if err.kind() == ErrorKind::AlreadyExists {
                return self.ensure();
            }
            return Err(TransportError::Create {
                path: self.path.clone(),
                source: err,
            });
        }

        // mkfifo honours the umask; apply the requested mode explicitly.
        std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(self.mode)).map_err(
            |e| TransportError::Create {
                path: self.path.clone(),
                source: e,
            },
        )?;

        info!(path = ?self.path, mode = %format!("{:o}", self.mode), "created fifo");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fifomsg-test-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_creates_missing_fifo() {
        let dir = temp_dir("create");
        let path = dir.join("new.fifo");

        let _stream = NamedFifo::open(&path).unwrap();
        let metadata = std::fs::metadata(&path).unwrap();
        assert!(metadata.file_type().is_fifo());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_reuses_existing_fifo() {
        let dir = temp_dir("reuse");
        let path = dir.join("shared.fifo");

        let mut writer = NamedFifo::open(&path).unwrap();
        let mut reader = NamedFifo::open(&path).unwrap();

        writer.write_all(b"hello").unwrap();
        let mut buf = [0u8; 5];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_applies_requested_mode() {
        let dir = temp_dir("mode");
        let path = dir.join("private.fifo");

        NamedFifo::new(&path).with_mode(0o600).ensure().unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_rejects_existing_regular_file() {
        let dir = temp_dir("regular");
        let path = dir.join("not-a-fifo");
        std::fs::write(&path, b"regular-file").unwrap();

        let result = NamedFifo::open(&path);
        assert!(matches!(result, Err(TransportError::NotAFifo { .. })));

        let remove = NamedFifo::new(&path).remove();
        assert!(matches!(remove, Err(TransportError::NotAFifo { .. })));
        assert!(path.exists(), "regular files must never be removed");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_parent_directory_fails_create() {
        let path = std::env::temp_dir()
            .join(format!("fifomsg-missing-{}", std::process::id()))
            .join("nested")
            .join("x.fifo");
        let result = NamedFifo::open(&path);
        assert!(matches!(result, Err(TransportError::Create { .. })));
    }

    #[test]
    fn test_remove_only_when_present() {
        let dir = temp_dir("remove");
        let fifo = NamedFifo::new(dir.join("gone.fifo"));

        assert!(!fifo.remove().unwrap());
        fifo.ensure().unwrap();
        assert!(fifo.remove().unwrap());
        assert!(!fifo.path().exists());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
