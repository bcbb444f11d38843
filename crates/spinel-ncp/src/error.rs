use std::time::Duration;

use spinel_codec::CodecError;

/// Errors that can occur in NCP operations.
#[derive(Debug, thiserror::Error)]
pub enum NcpError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] spinel_transport::TransportError),

    /// Frame-level error while sending.
    #[error("frame error: {0}")]
    Frame(#[from] spinel_frame::FrameError),

    /// A value did not match its property's descriptor.
    #[error("format violation on property {property:#x}: {source}")]
    FormatViolation {
        property: u32,
        #[source]
        source: CodecError,
    },

    /// No matching response within the configured bound.
    #[error("no response to command {command} on property {property:#x} within {after:?}")]
    Timeout {
        command: u32,
        property: u32,
        after: Duration,
    },

    /// Responses arrived but none matched the outstanding request.
    #[error("no matching response to command {command} on property {property:#x}")]
    MissingResponse { command: u32, property: u32 },

    /// The NCP answered with a `LAST_STATUS` instead of the property.
    #[error("NCP rejected property {property:#x} with status {status}")]
    Status { property: u32, status: u32 },

    /// The property has no known descriptor.
    #[error("property {0:#x} not implemented")]
    NotImplemented(u32),

    /// A caller-supplied argument was rejected before transmit.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The receive side of the connection has ended.
    #[error("NCP disconnected: {0}")]
    Disconnected(String),
}

impl NcpError {
    pub(crate) fn format(property: u32) -> impl FnOnce(CodecError) -> NcpError {
        move |source| NcpError::FormatViolation { property, source }
    }
}

pub type Result<T> = std::result::Result<T, NcpError>;
