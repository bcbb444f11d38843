use std::net::TcpStream;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::{NcpStream, Transport};

/// TCP transport for networked serial servers and simulators.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    addr: String,
}

impl TcpTransport {
    /// Create a transport for `host:port`.
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    /// The `host:port` this transport connects to.
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

impl Transport for TcpTransport {
    fn open(&self) -> Result<NcpStream> {
        let stream = TcpStream::connect(&self.addr).map_err(|e| TransportError::Connect {
            addr: self.describe(),
            source: e,
        })?;
        // Spinel frames are small; do not let Nagle hold them back.
        stream.set_nodelay(true)?;
        debug!(addr = %self.addr, "connected to tcp endpoint");
        Ok(NcpStream::from_tcp(stream))
    }

    fn describe(&self) -> String {
        format!("tcp:{}", self.addr)
    }
}
