//! `tokio-util` codec adapter for async transports.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame, encode_frame, DEFAULT_MAX_FRAME_SIZE};
use crate::error::FrameError;

/// HDLC-lite codec for use with `tokio_util::codec::Framed`.
///
/// Decoding yields verified packets; a corrupt frame surfaces as an error
/// item and the stream continues at the next flag.
#[derive(Debug, Clone)]
pub struct HdlcCodec {
    max_frame_size: usize,
}

impl HdlcCodec {
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for HdlcCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for HdlcCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_frame(src, self.max_frame_size)
    }
}

impl Encoder<Bytes> for HdlcCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.len() > self.max_frame_size {
            return Err(FrameError::FrameTooLarge {
                size: item.len(),
                max: self.max_frame_size,
            });
        }
        encode_frame(&item, dst);
        Ok(())
    }
}
