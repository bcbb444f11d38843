use std::io::{Read, Write};
use std::net::Shutdown;
use std::time::Duration;

use crate::error::{Result, TransportError};
use crate::tcp::TcpTransport;

/// Something that can produce a connected byte stream to an NCP.
///
/// Implementations only know how to reach the device; framing and
/// transaction handling live in the layers above.
pub trait Transport: Send + Sync {
    /// Open a fresh connection to the co-processor.
    fn open(&self) -> Result<NcpStream>;

    /// Human-readable address, used in logs and error messages.
    fn describe(&self) -> String;
}

/// A connected NCP byte stream. Implements `Read` and `Write`.
///
/// This is the fundamental I/O type returned by [`Transport::open`].
/// It is cloned into a read half and a write half so that the receive
/// loop and transmitting callers never contend on the same handle.
pub struct NcpStream {
    inner: NcpStreamInner,
}

enum NcpStreamInner {
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
    Tcp(std::net::TcpStream),
}

impl Read for NcpStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            NcpStreamInner::Unix(stream) => stream.read(buf),
            NcpStreamInner::Tcp(stream) => stream.read(buf),
        }
    }
}

impl Write for NcpStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            NcpStreamInner::Unix(stream) => stream.write(buf),
            NcpStreamInner::Tcp(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            NcpStreamInner::Unix(stream) => stream.flush(),
            NcpStreamInner::Tcp(stream) => stream.flush(),
        }
    }
}

impl NcpStream {
    /// Create an NcpStream from a Unix domain socket stream.
    #[cfg(unix)]
    pub fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: NcpStreamInner::Unix(stream),
        }
    }

    /// Create an NcpStream from a TCP stream.
    pub fn from_tcp(stream: std::net::TcpStream) -> Self {
        Self {
            inner: NcpStreamInner::Tcp(stream),
        }
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            NcpStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            NcpStreamInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            NcpStreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            NcpStreamInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            #[cfg(unix)]
            NcpStreamInner::Unix(stream) => Ok(Self::from_unix(stream.try_clone()?)),
            NcpStreamInner::Tcp(stream) => Ok(Self::from_tcp(stream.try_clone()?)),
        }
    }

    /// Shut down both directions, waking any blocked reader.
    pub fn shutdown(&self) -> Result<()> {
        let res = match &self.inner {
            #[cfg(unix)]
            NcpStreamInner::Unix(stream) => stream.shutdown(Shutdown::Both),
            NcpStreamInner::Tcp(stream) => stream.shutdown(Shutdown::Both),
        };
        match res {
            Ok(()) => Ok(()),
            // Already closed by the peer.
            Err(err) if err.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            #[cfg(unix)]
            NcpStreamInner::Unix(_) => "unix-domain-socket",
            NcpStreamInner::Tcp(_) => "tcp",
        }
    }
}

impl std::fmt::Debug for NcpStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NcpStream")
            .field("type", &self.transport_name())
            .finish()
    }
}

/// Build a transport from a device address.
///
/// Accepted forms: `unix:<path>`, `tcp:<host:port>`, or a bare path
/// (treated as a Unix domain socket).
pub fn from_uri(uri: &str) -> Result<Box<dyn Transport>> {
    let uri = uri.trim();
    if uri.is_empty() {
        return Err(TransportError::InvalidAddress(uri.to_string()));
    }

    if let Some(addr) = uri.strip_prefix("tcp:") {
        if addr.is_empty() || !addr.contains(':') {
            return Err(TransportError::InvalidAddress(uri.to_string()));
        }
        return Ok(Box::new(TcpTransport::new(addr)));
    }

    #[cfg(unix)]
    {
        let path = uri.strip_prefix("unix:").unwrap_or(uri);
        if path.is_empty() {
            return Err(TransportError::InvalidAddress(uri.to_string()));
        }
        Ok(Box::new(crate::uds::UnixTransport::new(path)))
    }

    #[cfg(not(unix))]
    {
        Err(TransportError::InvalidAddress(uri.to_string()))
    }
}
