//! Error types for the NearKV wire protocol.

use thiserror::Error;

/// Result type for wire encode/decode operations.
pub type WireResult<T> = std::result::Result<T, WireError>;

/// Errors raised while framing or parsing protocol messages.
#[derive(Debug, Error)]
pub enum WireError {
    /// Network or IO failure while reading a frame.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame body ended before the message was complete.
    #[error("truncated frame")]
    Truncated,

    /// Frame body continued past the end of the message.
    #[error("trailing bytes after message")]
    TrailingBytes,

    /// Frame length prefix exceeds the allowed maximum.
    #[error("frame of {0} bytes exceeds maximum")]
    FrameTooLarge(usize),

    /// Request opcode is not part of the protocol.
    #[error("unknown opcode: {0:#04x}")]
    UnknownOpcode(u8),

    /// Response tag is not part of the protocol.
    #[error("unknown response tag: {0:#04x}")]
    UnknownTag(u8),

    /// A key or info field was not valid UTF-8.
    #[error("invalid utf-8 in message field")]
    InvalidUtf8,
}
