//! Transport errors

use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

pub type Result<T> = std::result::Result<T, Error>;

/// Transport errors
///
/// `Clone` because one exchange result is delivered to every waiter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("Frame error: {0}")]
    Frame(#[from] as608_core::Error),

    #[error("I/O error: {0}")]
    Io(Arc<io::Error>),

    #[error("Receive timed out after {0:?}")]
    Timeout(Duration),

    /// A multi-frame exchange broke off; the bytes collected so far are kept
    #[error("Exchange interrupted after {} bytes: {source}", .partial.len())]
    Incomplete {
        partial: Bytes,
        source: Box<Error>,
    },

    #[error("Transport closed")]
    Closed,
}

impl Error {
    /// Payload bytes received before the failure, if any
    pub fn partial(&self) -> Option<&Bytes> {
        match self {
            Self::Incomplete { partial, .. } => Some(partial),
            _ => None,
        }
    }

    /// The failure behind an interrupted exchange
    pub fn root(&self) -> &Error {
        match self {
            Self::Incomplete { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check if a corrupted or truncated frame ended the exchange
    pub fn is_wire_error(&self) -> bool {
        matches!(self.root(), Self::Frame(err) if err.is_wire_error())
    }

    /// Check if the underlying stream failed
    pub fn is_io(&self) -> bool {
        matches!(self.root(), Self::Io(_))
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}
