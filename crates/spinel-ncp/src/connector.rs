use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use spinel_codec::PropertyTable;
use spinel_frame::{FrameConfig, FrameWriter};
use spinel_transport::{NcpStream, Transport, TransportError};

use crate::config::NcpConfig;
use crate::dispatcher::Ncp;
use crate::error::Result;

const READ_CHUNK_SIZE: usize = 1024;

/// Open a connection to an NCP with default configuration.
pub fn open(transport: &dyn Transport) -> Result<Connection> {
    open_with_config(transport, NcpConfig::default())
}

/// Open a connection with explicit configuration.
pub fn open_with_config(transport: &dyn Transport, config: NcpConfig) -> Result<Connection> {
    let stream = transport.open()?;
    tracing::debug!(transport = %transport.describe(), "NCP transport open");
    Connection::from_stream(stream, config)
}

/// A live NCP connection: the dispatcher plus the thread feeding it.
///
/// Dereferences to [`Ncp`], so property accessors are called directly on
/// the connection. Dropping the connection shuts the stream down.
pub struct Connection {
    ncp: Arc<Ncp<NcpStream>>,
    stream: NcpStream,
    stop: Arc<AtomicBool>,
    receiver: Option<JoinHandle<()>>,
}

impl Connection {
    /// Wrap an already open stream.
    pub fn from_stream(stream: NcpStream, config: NcpConfig) -> Result<Self> {
        let reader = stream.try_clone()?;
        let control = stream.try_clone()?;

        let frame_config = FrameConfig {
            max_frame_size: config.max_frame_size,
            write_timeout: Some(config.response_timeout),
            ..FrameConfig::default()
        };
        let writer = FrameWriter::for_stream(stream, frame_config)?;
        let ncp = Arc::new(Ncp::from_writer(writer, config, PropertyTable::new()));

        let stop = Arc::new(AtomicBool::new(false));
        let receiver = std::thread::Builder::new()
            .name("spinel-rx".into())
            .spawn({
                let ncp = Arc::clone(&ncp);
                let stop = Arc::clone(&stop);
                move || receive_loop(reader, &ncp, &stop)
            })
            .map_err(TransportError::from)?;

        Ok(Self {
            ncp,
            stream: control,
            stop,
            receiver: Some(receiver),
        })
    }

    /// Shared handle to the dispatcher.
    pub fn ncp(&self) -> &Arc<Ncp<NcpStream>> {
        &self.ncp
    }

    /// True while the receive thread is running.
    pub fn is_receiving(&self) -> bool {
        self.receiver
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Shut the stream down and wait for the receive thread to exit.
    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        self.stop.store(true, Ordering::SeqCst);
        let result = self.stream.shutdown();
        if let Some(handle) = self.receiver.take() {
            if handle.join().is_err() {
                tracing::warn!("receive thread panicked");
            }
        }
        result.map_err(Into::into)
    }
}

impl std::ops::Deref for Connection {
    type Target = Ncp<NcpStream>;

    fn deref(&self) -> &Self::Target {
        &self.ncp
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.receiver.is_some() {
            if let Err(err) = self.shutdown() {
                tracing::debug!(%err, "shutdown on drop failed");
            }
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("stream", &self.stream)
            .field("receiving", &self.is_receiving())
            .finish()
    }
}

/// Feed the dispatcher until the stream ends, then disconnect it so no
/// caller waits out its timeout on a dead link.
fn receive_loop(mut reader: NcpStream, ncp: &Ncp<NcpStream>, stop: &AtomicBool) {
    let reason = read_until_closed(&mut reader, ncp, stop);
    ncp.disconnect(reason);
}

fn read_until_closed(reader: &mut NcpStream, ncp: &Ncp<NcpStream>, stop: &AtomicBool) -> String {
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    loop {
        if stop.load(Ordering::SeqCst) {
            return "connection closed".into();
        }
        match reader.read(&mut chunk) {
            Ok(0) => {
                tracing::debug!("NCP stream closed");
                return "stream closed by peer".into();
            }
            Ok(n) => {
                tracing::trace!(len = n, "bytes received");
                ncp.receive(&chunk[..n]);
            }
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut
                ) =>
            {
                continue
            }
            Err(err) => {
                if stop.load(Ordering::SeqCst) {
                    return "connection closed".into();
                }
                tracing::warn!(%err, "NCP read failed");
                return format!("read failed: {err}");
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::net::UnixStream;
    use std::time::Duration;

    use bytes::BytesMut;
    use spinel_codec::protocol::{CMD_PROP_VALUE_IS, PROP_PHY_CHAN};
    use spinel_codec::{build_property_packet, parse_packet};
    use spinel_frame::{encode_frame, FrameReader};

    use super::*;

    #[test]
    fn get_over_socket_pair() {
        let (host, device) = UnixStream::pair().unwrap();
        let connection =
            Connection::from_stream(NcpStream::from_unix(host), NcpConfig::default()).unwrap();

        let device_thread = std::thread::spawn(move || {
            let mut writer = device.try_clone().unwrap();
            let mut reader = FrameReader::new(device);
            let request = parse_packet(reader.read_packet().unwrap()).unwrap();
            let mut wire = BytesMut::new();
            encode_frame(
                &build_property_packet(CMD_PROP_VALUE_IS, request.tid(), PROP_PHY_CHAN, &[15]),
                &mut wire,
            );
            std::io::Write::write_all(&mut writer, &wire).unwrap();
        });

        assert_eq!(connection.channel().unwrap(), 15);
        device_thread.join().unwrap();
        connection.close().unwrap();
    }

    #[test]
    fn receive_thread_stops_when_peer_hangs_up() {
        let (host, device) = UnixStream::pair().unwrap();
        let connection =
            Connection::from_stream(NcpStream::from_unix(host), NcpConfig::default()).unwrap();
        drop(device);

        for _ in 0..100 {
            if !connection.is_receiving() {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(!connection.is_receiving());
        assert!(connection.is_disconnected());
    }

    #[test]
    fn hang_up_during_exchange_is_disconnected() {
        let (host, device) = UnixStream::pair().unwrap();
        let config = NcpConfig {
            response_timeout: Duration::from_secs(30),
            ..NcpConfig::default()
        };
        let connection = Connection::from_stream(NcpStream::from_unix(host), config).unwrap();

        let device_thread = std::thread::spawn(move || {
            let mut reader = FrameReader::new(device);
            reader.read_packet().unwrap();
            // Dropping the reader hangs up without answering.
        });

        let started = std::time::Instant::now();
        let err = connection.channel().unwrap_err();
        assert!(
            matches!(err, crate::NcpError::Disconnected(ref reason) if reason == "stream closed by peer"),
            "{err:?}"
        );
        assert!(started.elapsed() < Duration::from_secs(10));
        device_thread.join().unwrap();

        assert!(matches!(
            connection.channel(),
            Err(crate::NcpError::Disconnected(_))
        ));
    }
}
