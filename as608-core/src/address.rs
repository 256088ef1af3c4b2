//! Module address

use std::fmt;

use crate::constants::BROADCAST_ADDRESS;

/// 4-byte module address carried by every frame
///
/// Modules answer frames sent to their own address or to the broadcast
/// address `FFFFFFFF`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address(pub [u8; 4]);

impl Address {
    /// Broadcast address, the factory default of every module
    pub const BROADCAST: Self = Self(BROADCAST_ADDRESS);

    /// Raw address bytes in wire order
    pub fn octets(self) -> [u8; 4] {
        self.0
    }

    /// Check if this is the broadcast address
    pub fn is_broadcast(self) -> bool {
        self == Self::BROADCAST
    }
}

impl Default for Address {
    fn default() -> Self {
        Self::BROADCAST
    }
}

impl From<u32> for Address {
    fn from(value: u32) -> Self {
        Self(value.to_be_bytes())
    }
}

impl From<Address> for u32 {
    fn from(addr: Address) -> u32 {
        u32::from_be_bytes(addr.0)
    }
}

impl From<[u8; 4]> for Address {
    fn from(octets: [u8; 4]) -> Self {
        Self(octets)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", u32::from(*self))
    }
}
