use bytes::{Buf, BufMut, Bytes, BytesMut};
use crc::{Crc, CRC_16_IBM_SDLC};

use crate::error::{FrameError, Result};

/// Frame delimiter.
pub const FLAG: u8 = 0x7E;

/// Escape octet; the following octet is XORed with [`ESCAPE_XOR`].
pub const ESCAPE: u8 = 0x7D;

/// Software flow control: resume.
pub const XON: u8 = 0x11;

/// Software flow control: pause.
pub const XOFF: u8 = 0x13;

/// Vendor-reserved special octet.
pub const VENDOR: u8 = 0xF8;

/// Bit transformation applied to escaped octets.
pub const ESCAPE_XOR: u8 = 0x20;

/// Frame check sequence size in bytes.
pub const FCS_SIZE: usize = 2;

/// Default maximum frame size: 2 KiB of wire bytes between two flags.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 2 * 1024;

const FCS: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_SDLC);

/// Compute the CRC-16/X.25 frame check sequence over `data`.
pub fn fcs(data: &[u8]) -> u16 {
    FCS.checksum(data)
}

fn needs_escape(byte: u8) -> bool {
    matches!(byte, FLAG | ESCAPE | XON | XOFF | VENDOR)
}

fn put_stuffed(dst: &mut BytesMut, byte: u8) {
    if needs_escape(byte) {
        dst.put_u8(ESCAPE);
        dst.put_u8(byte ^ ESCAPE_XOR);
    } else {
        dst.put_u8(byte);
    }
}

/// Encode a packet into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────┬──────────────────────────┬──────────────┬──────┐
/// │ 0x7E │ packet (byte-stuffed)    │ FCS (2B LE,  │ 0x7E │
/// │      │                          │ byte-stuffed)│      │
/// └──────┴──────────────────────────┴──────────────┴──────┘
/// ```
pub fn encode_frame(packet: &[u8], dst: &mut BytesMut) {
    let fcs = fcs(packet);
    // Worst case every octet is escaped.
    dst.reserve(2 + 2 * (packet.len() + FCS_SIZE));
    dst.put_u8(FLAG);
    for &byte in packet {
        put_stuffed(dst, byte);
    }
    for byte in fcs.to_le_bytes() {
        put_stuffed(dst, byte);
    }
    dst.put_u8(FLAG);
}

/// Decode one frame from a buffer of raw wire bytes.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet,
/// `Ok(Some(packet))` for a verified frame, and `Err` for a corrupt frame.
/// In the last two cases the frame bytes and its closing flag have been
/// consumed, so the next call starts at the following frame.
pub fn decode_frame(src: &mut BytesMut, max_frame_size: usize) -> Result<Option<Bytes>> {
    loop {
        let Some(end) = src.iter().position(|&byte| byte == FLAG) else {
            if src.len() > max_frame_size {
                let size = src.len();
                src.clear();
                return Err(FrameError::FrameTooLarge {
                    size,
                    max: max_frame_size,
                });
            }
            return Ok(None); // Need more data
        };

        let raw = src.split_to(end);
        src.advance(1);

        // Back-to-back flags delimit nothing.
        if raw.is_empty() {
            continue;
        }

        if raw.len() > max_frame_size {
            return Err(FrameError::FrameTooLarge {
                size: raw.len(),
                max: max_frame_size,
            });
        }

        return unstuff_and_verify(&raw).map(Some);
    }
}

fn unstuff_and_verify(raw: &[u8]) -> Result<Bytes> {
    let mut body = BytesMut::with_capacity(raw.len());
    let mut bytes = raw.iter();
    while let Some(&byte) = bytes.next() {
        if byte == ESCAPE {
            match bytes.next() {
                Some(&escaped) => body.put_u8(escaped ^ ESCAPE_XOR),
                None => return Err(FrameError::InvalidEscape),
            }
        } else {
            body.put_u8(byte);
        }
    }

    // A packet carries at least its header octet.
    if body.len() < FCS_SIZE + 1 {
        return Err(FrameError::TooShort(body.len()));
    }

    let split = body.len() - FCS_SIZE;
    let received = u16::from_le_bytes([body[split], body[split + 1]]);
    body.truncate(split);
    let computed = fcs(&body);
    if computed != received {
        return Err(FrameError::BadChecksum { computed, received });
    }

    Ok(body.freeze())
}

/// Restartable stream deframer.
///
/// Accumulates raw bytes as they arrive and yields complete packets.
/// Never blocks; partial frames stay buffered across calls.
#[derive(Debug)]
pub struct Deframer {
    buf: BytesMut,
    max_frame_size: usize,
}

impl Deframer {
    /// Create a deframer bounded by `max_frame_size` wire bytes per frame.
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(max_frame_size.min(DEFAULT_MAX_FRAME_SIZE)),
            max_frame_size,
        }
    }

    /// Append raw bytes received from the transport.
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Pull the next complete frame, if any.
    pub fn next_frame(&mut self) -> Result<Option<Bytes>> {
        decode_frame(&mut self.buf, self.max_frame_size)
    }

    /// Number of raw bytes waiting for a closing flag.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

impl Default for Deframer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum frame size in bytes. Default: 2 KiB.
    pub max_frame_size: usize,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            write_timeout: None,
        }
    }
}
