use std::time::Duration;

use spinel_frame::DEFAULT_MAX_FRAME_SIZE;

/// Default bound on a synchronous exchange.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-connection dispatcher configuration.
#[derive(Debug, Clone)]
pub struct NcpConfig {
    /// How long a synchronous exchange waits for its response.
    pub response_timeout: Duration,
    /// Largest frame accepted or sent, in bytes.
    pub max_frame_size: usize,
    /// Fail with `MissingResponse` as soon as a wake-up brings only
    /// unrelated packets. When false, keep waiting until the timeout.
    pub strict_matching: bool,
}

impl Default for NcpConfig {
    fn default() -> Self {
        Self {
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            strict_matching: true,
        }
    }
}
