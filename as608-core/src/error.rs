//! Error types for as608-core

/// Result type alias for as608 protocol operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
///
/// Every variant is cheap to clone: one decoded exchange is fanned out to
/// every waiter registered on the transport, errors included.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Frame does not start with the `EF 01` magic pair
    #[error("Invalid frame: expected magic 0xEF01, found 0x{found:04X}")]
    InvalidFrame {
        found: u16,
    },

    /// Buffer is too short to hold the header or the declared length
    #[error("Frame too short: expected at least {expected} bytes, got {actual} bytes")]
    FrameTooShort {
        expected: usize,
        actual: usize,
    },

    /// Declared length cannot even hold the trailing checksum
    #[error("Short payload: length field {length} cannot hold a checksum")]
    ShortPayload {
        length: usize,
    },

    /// Checksum verification failed
    #[error("Checksum mismatch: expected 0x{expected:04X}, received 0x{received:04X}")]
    ChecksumMismatch {
        expected: u16,
        received: u16,
    },

    /// Payload does not fit in the 16-bit length field
    #[error("Payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge {
        size: usize,
        max: usize,
    },

    /// Chunk size outside 0/64/128/256
    #[error("Unsupported chunk size {0}: expected 0, 64, 128 or 256")]
    UnsupportedChunkSize(usize),

    /// Frame carried a type tag outside the protocol
    #[error("Unknown frame type: 0x{0:02X}")]
    UnknownFrameType(u8),

    /// Module reported a status code missing from the firmware table
    #[error("Unknown status code: 0x{0:02X}")]
    UnknownStatus(u8),

    /// Session already closed
    #[error("Session closed")]
    SessionClosed,
}

impl Error {
    /// Check if error came from a corrupted or truncated frame on the wire
    pub fn is_wire_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidFrame { .. }
                | Self::FrameTooShort { .. }
                | Self::ShortPayload { .. }
                | Self::ChecksumMismatch { .. }
                | Self::UnknownFrameType(_)
        )
    }

    /// Check if error requires opening a new session
    pub fn requires_reopen(&self) -> bool {
        matches!(self, Self::SessionClosed)
    }
}
