/// Errors produced while encoding or decoding Spinel values and packets.
///
/// Decode errors are plain data so a failed decode can be stored alongside
/// the packet it came from and handed to whoever waits for it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Fewer bytes remain than the descriptor requires.
    #[error("buffer underrun (needed {needed} bytes, {remaining} remaining)")]
    Underrun { needed: usize, remaining: usize },

    /// A packed integer's continuation bit never cleared.
    #[error("unterminated packed integer")]
    UnterminatedPacked,

    /// A packed integer does not fit in 32 bits.
    #[error("packed integer exceeds 32 bits")]
    PackedOverflow,

    /// A length prefix claims more bytes than remain.
    #[error("length prefix {claimed} exceeds {remaining} remaining bytes")]
    LengthOverrun { claimed: usize, remaining: usize },

    /// A NUL-terminated string has no terminator.
    #[error("missing NUL terminator")]
    MissingTerminator,

    /// Text is not valid UTF-8.
    #[error("invalid UTF-8 text")]
    InvalidUtf8,

    /// Text to encode contains a NUL octet.
    #[error("text contains an interior NUL")]
    InteriorNul,

    /// The value's shape does not match the descriptor.
    #[error("type mismatch (expected {expected}, found {found})")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// A tuple value has a different number of fields than its descriptor.
    #[error("tuple has {found} fields, descriptor needs {expected}")]
    ArityMismatch { expected: usize, found: usize },

    /// An integer does not fit in the descriptor's slot.
    #[error("value {value} out of range for '{symbol}'")]
    OutOfRange { value: i128, symbol: char },

    /// The descriptor string is malformed.
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// The header octet does not have bit 7 set.
    #[error("invalid packet header {0:#04x}")]
    InvalidHeader(u8),

    /// A property command carries no property id.
    #[error("property command {command} without property id")]
    MissingProperty { command: u32 },
}

pub type Result<T> = std::result::Result<T, CodecError>;
