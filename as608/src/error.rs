//! High-level error types

use as608_core::Status;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] as608_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] as608_transport::Error),

    #[error("Type error: {0}")]
    Types(#[from] as608_types::Error),

    #[error("Device reported: {0}")]
    DeviceStatus(Status),

    #[error("Unknown status code 0x{0:02X}")]
    UnknownStatus(u8),

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Enrollment timed out on the device")]
    EnrollTimeout,

    #[error("Template library is full")]
    DatabaseFull,
}

impl Error {
    /// Map a non-zero confirmation code to an error
    pub fn from_status(code: u8) -> Self {
        match Status::try_from(code) {
            Ok(status) => Self::DeviceStatus(status),
            Err(_) => Self::UnknownStatus(code),
        }
    }

    /// Confirmation code reported by the module, if any
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::DeviceStatus(status) => Some(*status),
            Self::EnrollTimeout => Some(Status::Timeout),
            _ => None,
        }
    }

    /// Check if the handle (or its transport) is closed
    pub fn is_closed(&self) -> bool {
        match self {
            Self::Core(err) => err.requires_reopen(),
            Self::Transport(err) => matches!(err.root(), as608_transport::Error::Closed),
            _ => false,
        }
    }

    /// Check if retrying the operation on the same handle makes sense
    ///
    /// Device-side rejections leave the stream in sync. After a reply
    /// timeout the transport drops the owed reply once it arrives; a module
    /// that never answers, or an abandoned multi-reply command, still needs
    /// `cancel` or a reopen. Stream failures, closed handles and malformed
    /// replies are not recoverable.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::DeviceStatus(_) | Self::UnknownStatus(_) | Self::EnrollTimeout => true,
            Self::Transport(as608_transport::Error::Timeout(_)) => true,
            _ => false,
        }
    }
}
