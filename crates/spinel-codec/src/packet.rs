use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::{get_packed, put_packed};
use crate::error::{CodecError, Result};
use crate::protocol::{
    is_property_command, HEADER_FLAG, HEADER_IID_MASK, HEADER_IID_SHIFT, HEADER_TID_MASK,
};

/// Correlation key of a synchronous exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Uid {
    pub property: u32,
    pub tid: u8,
}

impl Uid {
    pub fn new(property: u32, tid: u8) -> Self {
        Self {
            property,
            tid: tid & HEADER_TID_MASK,
        }
    }
}

impl std::fmt::Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}/tid{}", self.property, self.tid)
    }
}

/// A Spinel packet: header, command, optional property, payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub header: u8,
    pub command: u32,
    /// Present only for property commands.
    pub property: Option<u32>,
    /// Value bytes following the property id (or the command for
    /// non-property commands).
    pub payload: Bytes,
}

impl Packet {
    pub fn tid(&self) -> u8 {
        self.header & HEADER_TID_MASK
    }

    pub fn iid(&self) -> u8 {
        (self.header & HEADER_IID_MASK) >> HEADER_IID_SHIFT
    }

    /// Transaction key, if this is a property packet.
    pub fn uid(&self) -> Option<Uid> {
        self.property.map(|property| Uid::new(property, self.tid()))
    }
}

/// Build a packet: header `0x80 | tid`, packed command, then `payload`.
///
/// Property commands put the packed property id at the front of `payload`;
/// see [`build_property_packet`].
pub fn build_packet(command: u32, tid: u8, payload: &[u8]) -> Bytes {
    let mut dst = BytesMut::with_capacity(1 + 5 + payload.len());
    dst.put_u8(HEADER_FLAG | (tid & HEADER_TID_MASK));
    put_packed(&mut dst, command);
    dst.put_slice(payload);
    dst.freeze()
}

/// Build a property packet with an already encoded value.
pub fn build_property_packet(command: u32, tid: u8, property: u32, value: &[u8]) -> Bytes {
    let mut body = BytesMut::with_capacity(5 + value.len());
    put_packed(&mut body, property);
    body.put_slice(value);
    build_packet(command, tid, &body)
}

/// Parse a deframed packet.
pub fn parse_packet(frame: Bytes) -> Result<Packet> {
    let Some(&header) = frame.first() else {
        return Err(CodecError::Underrun {
            needed: 1,
            remaining: 0,
        });
    };
    if header & HEADER_FLAG == 0 {
        return Err(CodecError::InvalidHeader(header));
    }

    let mut rest = &frame[1..];
    let command = get_packed(&mut rest)?;
    let property = if is_property_command(command) {
        if rest.is_empty() {
            return Err(CodecError::MissingProperty { command });
        }
        Some(get_packed(&mut rest)?)
    } else {
        None
    };

    let payload = frame.slice(frame.len() - rest.len()..);
    Ok(Packet {
        header,
        command,
        property,
        payload,
    })
}
