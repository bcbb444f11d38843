//! Host driver for Spinel network co-processors.
//!
//! spinel talks to an NCP over a byte stream: HDLC-lite framing, the
//! descriptor-driven value codec, and a transaction dispatcher that keeps
//! one synchronous exchange in flight while forwarding everything else to
//! subscribers.
//!
//! # Crate Structure
//!
//! - [`transport`]: Unix socket and TCP streams to the NCP
//! - [`frame`]: byte-stuffed framing with a CRC-16 frame check sequence
//! - [`codec`]: descriptors, values, packet headers and the property table
//! - [`ncp`]: the dispatcher and typed property accessors

/// Re-export transport types.
pub mod transport {
    pub use spinel_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use spinel_frame::*;
}

/// Re-export codec types.
pub mod codec {
    pub use spinel_codec::*;
}

/// Re-export dispatcher types.
pub mod ncp {
    pub use spinel_ncp::*;
}

pub use spinel_codec::{Descriptor, Value};
pub use spinel_ncp::{open, open_with_config, Connection, Ncp, NcpConfig, NcpError};
