//! Session lifecycle for one module handle
//!
//! A session tracks:
//! - Lifecycle state (open, active, closed)
//! - Module address frames are sent to
//! - Outbound chunk size

use std::sync::Arc;

use crate::address::Address;
use crate::error::{Error, Result};
use crate::fragment::ChunkSize;

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Handle created, no exchange yet
    Open,

    /// At least one exchange started; the background reader is running
    Active,

    /// Closed; every further operation fails
    Closed,
}

/// Session manager
///
/// Thread-safe and can be cloned cheaply (Arc internally). All clones share
/// the same state.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    address: Address,
    chunk_size: ChunkSize,
    state: parking_lot::RwLock<SessionState>,
}

impl Session {
    /// Create a new open session
    pub fn new(address: Address, chunk_size: ChunkSize) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                address,
                chunk_size,
                state: parking_lot::RwLock::new(SessionState::Open),
            }),
        }
    }

    /// Module address
    pub fn address(&self) -> Address {
        self.inner.address
    }

    /// Outbound chunk size
    pub fn chunk_size(&self) -> ChunkSize {
        self.inner.chunk_size
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        *self.inner.state.read()
    }

    /// Check if closed
    pub fn is_closed(&self) -> bool {
        matches!(self.state(), SessionState::Closed)
    }

    /// Mark the session active before an exchange
    ///
    /// Returns `true` on the first transition out of `Open`.
    pub fn activate(&self) -> Result<bool> {
        let mut state = self.inner.state.write();

        match *state {
            SessionState::Open => {
                *state = SessionState::Active;
                Ok(true)
            }
            SessionState::Active => Ok(false),
            SessionState::Closed => Err(Error::SessionClosed),
        }
    }

    /// Close session
    ///
    /// Returns `false` if it was already closed.
    pub fn close(&self) -> bool {
        let mut state = self.inner.state.write();
        let was_open = *state != SessionState::Closed;
        *state = SessionState::Closed;
        was_open
    }

    /// Fail unless the session can still carry exchanges
    pub fn ensure_usable(&self) -> Result<()> {
        match self.state() {
            SessionState::Closed => Err(Error::SessionClosed),
            _ => Ok(()),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Address::BROADCAST, ChunkSize::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_new() {
        let session = Session::default();
        assert_eq!(session.state(), SessionState::Open);
        assert_eq!(session.address(), Address::BROADCAST);
        assert_eq!(session.chunk_size(), ChunkSize::B64);
        assert!(!session.is_closed());
    }

    #[test]
    fn test_session_activate_once() {
        let session = Session::default();

        assert!(session.activate().unwrap());
        assert!(!session.activate().unwrap());
        assert_eq!(session.state(), SessionState::Active);
    }

    #[test]
    fn test_session_close() {
        let session = Session::default();
        session.activate().unwrap();

        assert!(session.close());
        assert!(!session.close());
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_closed_session_rejects_exchanges() {
        let session = Session::default();
        session.close();

        assert_eq!(session.activate(), Err(Error::SessionClosed));
        assert_eq!(session.ensure_usable(), Err(Error::SessionClosed));
    }

    #[test]
    fn test_session_clone() {
        let session1 = Session::new(Address::from(0x0000_0001), ChunkSize::B256);
        let session2 = session1.clone();

        session1.activate().unwrap();
        assert_eq!(session2.state(), SessionState::Active);
        assert_eq!(session2.address(), Address::from(1));
        assert_eq!(session2.chunk_size(), ChunkSize::B256);
    }
}
