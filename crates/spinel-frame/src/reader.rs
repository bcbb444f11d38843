use std::io::{ErrorKind, Read};

use bytes::Bytes;

use crate::codec::{Deframer, FrameConfig};
use crate::error::{FrameError, Result};

const READ_CHUNK_SIZE: usize = 1024;

/// Blocking reader that turns a byte-stuffed serial stream back into
/// checksum-verified packets.
///
/// A corrupt frame is reported once by [`read_frame`](Self::read_frame);
/// the reader stays usable and continues with the following frame.
pub struct FrameReader<T> {
    inner: T,
    deframer: Deframer,
    dropped: u64,
}

impl<T: Read> FrameReader<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            deframer: Deframer::new(config.max_frame_size),
            dropped: 0,
        }
    }

    /// Next packet, or the error describing one corrupt frame.
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` at end of stream, including
    /// when the stream ends inside a frame.
    pub fn read_frame(&mut self) -> Result<Bytes> {
        loop {
            if let Some(packet) = self.deframer.next_frame()? {
                return Ok(packet);
            }
            self.fill()?;
        }
    }

    /// Next packet, silently counting and skipping corrupt frames.
    pub fn read_packet(&mut self) -> Result<Bytes> {
        loop {
            match self.read_frame() {
                Err(err) if err.is_corrupt_frame() => {
                    self.dropped += 1;
                    tracing::debug!(error = %err, dropped = self.dropped, "skipping corrupt frame");
                }
                other => return other,
            }
        }
    }

    /// Corrupt frames skipped by [`read_packet`](Self::read_packet) so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    fn fill(&mut self) -> Result<()> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => {
                    self.deframer.push(&chunk[..n]);
                    return Ok(());
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Err(err.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BytesMut;

    use super::*;
    use crate::codec::{encode_frame, FLAG};

    fn wire(packets: &[&[u8]]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for packet in packets {
            encode_frame(packet, &mut buf);
        }
        buf.to_vec()
    }

    #[test]
    fn reads_packets_in_order() {
        let mut reader = FrameReader::new(Cursor::new(wire(&[
            b"\x81\x06\x44hello\x00",
            b"\x82\x02\x21",
            b"\x83\x02\x00",
        ])));

        assert_eq!(reader.read_frame().unwrap().as_ref(), b"\x81\x06\x44hello\x00");
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"\x82\x02\x21");
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"\x83\x02\x00");
        assert!(matches!(reader.read_frame(), Err(FrameError::ConnectionClosed)));
    }

    #[test]
    fn one_byte_reads_still_yield_whole_packets() {
        let mut reader = FrameReader::new(Trickle {
            bytes: wire(&[b"\x81slow"]),
            pos: 0,
            interrupted: false,
        });
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"\x81slow");
    }

    #[test]
    fn stream_ending_inside_a_frame_is_closed() {
        let mut partial = wire(&[b"\x81only-part"]);
        partial.pop();

        let mut reader = FrameReader::new(Cursor::new(partial));
        assert!(matches!(reader.read_frame(), Err(FrameError::ConnectionClosed)));
    }

    #[test]
    fn corrupt_frame_is_reported_then_skipped() {
        let mut bytes = wire(&[b"\x81bad"]);
        bytes[2] ^= 0x01;
        bytes.extend_from_slice(&wire(&[b"\x82good"]));

        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert!(reader.read_frame().unwrap_err().is_corrupt_frame());
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"\x82good");
    }

    #[test]
    fn read_packet_counts_dropped_frames() {
        let mut bytes = Vec::new();
        for packet in [&b"\x81bad"[..], b"\x82worse"] {
            let mut frame = wire(&[packet]);
            frame[2] ^= 0x01;
            bytes.extend_from_slice(&frame);
        }
        bytes.extend_from_slice(&wire(&[b"\x83good"]));

        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert_eq!(reader.read_packet().unwrap().as_ref(), b"\x83good");
        assert_eq!(reader.dropped(), 2);
    }

    #[test]
    fn oversized_frame_is_corrupt() {
        let mut bytes = vec![FLAG];
        bytes.extend_from_slice(&[0x55; 128]);

        let cfg = FrameConfig {
            max_frame_size: 16,
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config(Cursor::new(bytes), cfg);
        assert!(matches!(
            reader.read_frame(),
            Err(FrameError::FrameTooLarge { .. })
        ));
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_socket_pair() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        writer.send(b"\x81\x02\x44").unwrap();
        writer.send(b"\x82\x02\x21").unwrap();

        assert_eq!(reader.read_frame().unwrap().as_ref(), b"\x81\x02\x44");
        assert_eq!(reader.read_frame().unwrap().as_ref(), b"\x82\x02\x21");
    }

    /// Hands out one byte per read after a single `Interrupted`.
    struct Trickle {
        bytes: Vec<u8>,
        pos: usize,
        interrupted: bool,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(ErrorKind::Interrupted.into());
            }
            let Some(&byte) = self.bytes.get(self.pos) else {
                return Ok(0);
            };
            buf[0] = byte;
            self.pos += 1;
            Ok(1)
        }
    }
}
