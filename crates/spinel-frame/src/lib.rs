//! HDLC-lite framing for Spinel serial links.
//!
//! Every packet is framed with:
//! - A `0x7E` flag octet before and after the frame
//! - Byte stuffing of reserved octets (`0x7E`, `0x7D`, `0x11`, `0x13`, `0xF8`)
//! - A 16-bit frame check sequence (CRC-16/X.25), little-endian
//!
//! Decoding is restartable: feed whatever bytes are available and pull
//! complete frames out. A corrupt frame is reported once and the stream
//! resynchronises at the next flag.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod tokio_codec;

pub use codec::{
    decode_frame, encode_frame, fcs, Deframer, FrameConfig, DEFAULT_MAX_FRAME_SIZE, ESCAPE, FLAG,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use tokio_codec::HdlcCodec;
