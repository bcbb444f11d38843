//! Host-side driver for a Spinel network co-processor.
//!
//! [`Ncp`] runs the transaction protocol over any `Write` half: one
//! synchronous exchange at a time, everything else delivered to
//! subscribers. [`open`] wires it to a transport and a receive thread.
//!
//! ```no_run
//! use spinel_ncp::{open, UnixTransport};
//!
//! let ncp = open(&UnixTransport::new("/tmp/ncp.sock"))?;
//! println!("{}", ncp.ncp_version()?);
//! ncp.close()?;
//! # Ok::<(), spinel_ncp::NcpError>(())
//! ```

pub mod config;
pub mod connector;
pub mod dispatcher;
pub mod error;
pub mod properties;

pub use config::{NcpConfig, DEFAULT_RESPONSE_TIMEOUT};
pub use connector::{open, open_with_config, Connection};
pub use dispatcher::{DecodedPacket, Ncp};
pub use error::{NcpError, Result};
pub use properties::{
    is_accepted, EnergyScanResult, Ipv6AddressEntry, McuPowerState, NetRole, ScanBeacon,
    ScanState,
};
pub use spinel_transport::{from_uri, TcpTransport, Transport};
#[cfg(unix)]
pub use spinel_transport::UnixTransport;
