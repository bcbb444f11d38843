//! Byte-stream transport boundary for a Spinel NCP.
//!
//! The protocol engine never opens or names a physical device. It consumes a
//! connected [`NcpStream`] handed out by a [`Transport`]:
//! - Unix domain sockets (a serial bridge such as `socat`, or a simulator)
//! - TCP (networked serial servers, simulators)
//!
//! This is the lowest layer of the workspace. Everything else builds on top
//! of the [`NcpStream`] type provided here.

pub mod error;
pub mod tcp;
pub mod traits;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use tcp::TcpTransport;
pub use traits::{from_uri, NcpStream, Transport};

#[cfg(unix)]
pub use uds::UnixTransport;
