use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::{NcpStream, Transport};

/// Unix domain socket transport.
///
/// Connects to a filesystem-path UDS, typically exposed by a serial bridge
/// (`socat PTY,link=... UNIX-LISTEN:...`) or an NCP simulator.
#[derive(Debug, Clone)]
pub struct UnixTransport {
    path: PathBuf,
}

impl UnixTransport {
    /// Maximum socket path length.
    /// Unix `sockaddr_un.sun_path` is typically 108 bytes on Linux, 104 on macOS.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Create a transport for the socket at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The socket path this transport connects to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Connect to a listening Unix domain socket (blocking).
    pub fn connect(&self) -> Result<NcpStream> {
        let path_bytes = self.path.as_os_str().len();
        if path_bytes >= Self::MAX_PATH_LEN {
            return Err(TransportError::PathTooLong {
                path: self.path.clone(),
                len: path_bytes,
                max: Self::MAX_PATH_LEN,
            });
        }

        let stream = std::os::unix::net::UnixStream::connect(&self.path).map_err(|e| {
            TransportError::Connect {
                addr: self.describe(),
                source: e,
            }
        })?;
        debug!(path = ?self.path, "connected to unix domain socket");
        Ok(NcpStream::from_unix(stream))
    }
}

impl Transport for UnixTransport {
    fn open(&self) -> Result<NcpStream> {
        self.connect()
    }

    fn describe(&self) -> String {
        format!("unix:{}", self.path.display())
    }
}
