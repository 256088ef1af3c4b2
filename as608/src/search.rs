//! Automatic search
//!
//! The module waits for a finger, captures it and searches its library,
//! acknowledging each phase with `[status, phase, ...]` until the result.

use tracing::debug;

use as608_core::constants::search::{BUFFER_ID, RANGE_END};
use as608_types::SearchMatch;

use crate::error::{Error, Result};

/// Command arguments: character buffer, range end, flags
pub(crate) const ARGS: [u8; 5] = [
    BUFFER_ID,
    (RANGE_END >> 8) as u8,
    RANGE_END as u8,
    0x00,
    0x00,
];

/// Search phase reported by one reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    /// Finger detected on the sensor
    FingerDetected,

    /// Image captured, library search running
    Searching,

    /// Final result
    Finished(SearchMatch),
}

impl SearchPhase {
    /// Interpret one search reply
    pub fn parse(reply: &[u8]) -> Result<Self> {
        let &[status, phase, ..] = reply else {
            return Err(Error::ProtocolViolation(format!(
                "search reply needs 2 bytes, got {}",
                reply.len()
            )));
        };

        let parsed = match phase {
            0x00 | 0x01 if status != 0 => return Err(Error::from_status(status)),
            0x00 => Self::FingerDetected,
            0x01 => Self::Searching,
            0x05 => Self::Finished(SearchMatch::parse(reply)?),
            other => {
                return Err(Error::ProtocolViolation(format!(
                    "unrecognized search phase 0x{:02X}",
                    other
                )))
            }
        };

        debug!("Search phase: {:?}", parsed);
        Ok(parsed)
    }
}
