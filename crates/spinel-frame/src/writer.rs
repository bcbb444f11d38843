use std::io::{self, ErrorKind, Write};

use bytes::BytesMut;
use spinel_transport::NcpStream;

use crate::codec::{encode_frame, FrameConfig};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Frames packets onto any `Write` stream.
///
/// Each [`send`](Self::send) writes one complete frame and flushes, so a
/// packet never sits half-written between calls.
pub struct FrameWriter<T> {
    inner: T,
    wire: BytesMut,
    max_frame_size: usize,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            wire: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            max_frame_size: config.max_frame_size,
        }
    }

    /// Stuff, checksum and transmit one packet (blocking).
    pub fn send(&mut self, packet: &[u8]) -> Result<()> {
        if packet.len() > self.max_frame_size {
            return Err(FrameError::FrameTooLarge {
                size: packet.len(),
                max: self.max_frame_size,
            });
        }

        self.wire.clear();
        encode_frame(packet, &mut self.wire);
        tracing::trace!(packet_len = packet.len(), wire_len = self.wire.len(), "sending frame");

        let mut pending = &self.wire[..];
        while !pending.is_empty() {
            match self.inner.write(pending) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => pending = &pending[n..],
                Err(err) if retryable(&err) => {}
                Err(err) => return Err(err.into()),
            }
        }

        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if retryable(&err) => {}
                Err(err) => return Err(err.into()),
            }
        }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl FrameWriter<NcpStream> {
    /// Writer over an NCP stream with the configured write timeout applied.
    pub fn for_stream(inner: NcpStream, config: FrameConfig) -> Result<Self> {
        inner.set_write_timeout(config.write_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}

fn retryable(err: &io::Error) -> bool {
    matches!(err.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::codec::{decode_frame, FLAG};

    fn decode_all(wire: &[u8]) -> Vec<Vec<u8>> {
        let mut buf = BytesMut::from(wire);
        let mut frames = Vec::new();
        while let Some(frame) = decode_frame(&mut buf, usize::MAX).unwrap() {
            frames.push(frame.to_vec());
        }
        frames
    }

    #[test]
    fn each_send_is_one_delimited_frame() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));

        writer.send(b"\x81\x02\x02").unwrap();
        writer.send(b"\x82\x03\x00\x01").unwrap();

        let wire = writer.into_inner().into_inner();
        assert_eq!(wire.first(), Some(&FLAG));
        assert_eq!(wire.last(), Some(&FLAG));
        assert_eq!(
            decode_all(&wire),
            vec![b"\x81\x02\x02".to_vec(), b"\x82\x03\x00\x01".to_vec()]
        );
    }

    #[test]
    fn reserved_octets_are_stuffed_on_the_wire() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));

        writer.send(&[0x81, 0x7E, 0x7D, 0x11, 0x13, 0xF8]).unwrap();

        let wire = writer.into_inner().into_inner();
        let inner = &wire[1..wire.len() - 1];
        assert!(!inner.contains(&FLAG));
        assert_eq!(&inner[..11], &[0x81, 0x7D, 0x5E, 0x7D, 0x5D, 0x7D, 0x31, 0x7D, 0x33, 0x7D, 0xD8]);
    }

    #[test]
    fn oversized_packet_is_not_transmitted() {
        let cfg = FrameConfig {
            max_frame_size: 4,
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config(Cursor::new(Vec::<u8>::new()), cfg);

        let err = writer.send(b"oversized").unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { size: 9, max: 4 }));
        assert!(writer.get_ref().get_ref().is_empty());
    }

    #[test]
    fn transient_errors_are_retried_until_flushed() {
        for kind in [ErrorKind::Interrupted, ErrorKind::WouldBlock] {
            let mut writer = FrameWriter::new(Flaky::failing_once(kind));
            writer.send(b"\x85retry").unwrap();

            let sink = writer.into_inner();
            assert!(sink.flushed, "{kind:?}");
            assert_eq!(decode_all(&sink.data), vec![b"\x85retry".to_vec()], "{kind:?}");
        }
    }

    #[test]
    fn hard_write_error_is_io() {
        let mut writer = FrameWriter::new(Flaky::failing_once(ErrorKind::BrokenPipe));
        assert!(matches!(writer.send(b"\x81"), Err(FrameError::Io(_))));
    }

    #[test]
    fn zero_length_write_is_connection_closed() {
        let mut writer = FrameWriter::new(Flaky {
            zero: true,
            ..Flaky::failing_once(ErrorKind::Interrupted)
        });
        assert!(matches!(writer.send(b"\x81"), Err(FrameError::ConnectionClosed)));
    }

    #[test]
    #[cfg(unix)]
    fn stream_writer_applies_write_timeout() {
        let (left, _right) = std::os::unix::net::UnixStream::pair().unwrap();
        let stream = NcpStream::from_unix(left);

        let cfg = FrameConfig {
            write_timeout: Some(std::time::Duration::from_millis(10)),
            ..FrameConfig::default()
        };

        assert!(FrameWriter::for_stream(stream, cfg).is_ok());
    }

    /// Sink whose first write and first flush fail with `fail`.
    struct Flaky {
        fail: Option<ErrorKind>,
        flush_fail: Option<ErrorKind>,
        zero: bool,
        flushed: bool,
        data: Vec<u8>,
    }

    impl Flaky {
        fn failing_once(kind: ErrorKind) -> Self {
            Self {
                fail: Some(kind),
                flush_fail: Some(kind),
                zero: false,
                flushed: false,
                data: Vec::new(),
            }
        }
    }

    impl Write for Flaky {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.zero {
                return Ok(0);
            }
            if let Some(kind) = self.fail.take() {
                return Err(kind.into());
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if let Some(kind) = self.flush_fail.take() {
                return Err(kind.into());
            }
            self.flushed = true;
            Ok(())
        }
    }
}
