/// Errors that can occur during frame encoding/decoding.
///
/// Every decode variant except `Io` and `ConnectionClosed` describes a
/// single corrupt frame; the decoder has already skipped past it.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame check sequence did not match the frame contents.
    #[error("bad frame check sequence (computed {computed:#06x}, received {received:#06x})")]
    BadChecksum { computed: u16, received: u16 },

    /// An escape octet was the last octet before the closing flag.
    #[error("dangling escape octet at end of frame")]
    InvalidEscape,

    /// The frame is too short to hold a packet header and FCS.
    #[error("frame too short ({0} bytes after unstuffing)")]
    TooShort(usize),

    /// The frame exceeds the configured maximum size.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl FrameError {
    /// True if this error describes one dropped frame and the stream is
    /// still usable.
    pub fn is_corrupt_frame(&self) -> bool {
        matches!(
            self,
            FrameError::BadChecksum { .. }
                | FrameError::InvalidEscape
                | FrameError::TooShort(_)
                | FrameError::FrameTooLarge { .. }
        )
    }
}

impl From<spinel_transport::TransportError> for FrameError {
    fn from(err: spinel_transport::TransportError) -> Self {
        match err {
            spinel_transport::TransportError::Io(io) => FrameError::Io(io),
            spinel_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
            other => FrameError::Io(std::io::Error::other(other.to_string())),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
