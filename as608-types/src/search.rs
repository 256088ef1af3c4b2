//! Search results

use std::fmt;

use byteorder::{BigEndian, ByteOrder};

use as608_core::constants::search::NO_MATCH;

use crate::error::{Error, Result};

/// Outcome of a library search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    /// Matched template index, `0xFFFF` if nothing matched
    pub id: u16,

    /// Match score
    pub score: u16,
}

impl SearchMatch {
    /// Parse a match reply: `[status, phase, idHi, idLo, scoreHi, scoreLo]`
    pub fn parse(reply: &[u8]) -> Result<Self> {
        if reply.len() < 6 {
            return Err(Error::Parse(format!(
                "search result needs 6 bytes, got {}",
                reply.len()
            )));
        }

        Ok(Self {
            id: BigEndian::read_u16(&reply[2..4]),
            score: BigEndian::read_u16(&reply[4..6]),
        })
    }

    /// Check if a stored template matched
    pub fn is_found(&self) -> bool {
        self.id != NO_MATCH
    }
}

impl fmt::Display for SearchMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_found() {
            write!(f, "match #{} (score {})", self.id, self.score)
        } else {
            write!(f, "no match")
        }
    }
}
