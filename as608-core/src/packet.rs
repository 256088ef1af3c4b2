//! Logical packets: one conversation turn, possibly spanning many frames

use bytes::Bytes;
use std::fmt;

use crate::{
    address::Address,
    command::Command,
    frame::{Frame, FrameType},
};

/// Logical packet
///
/// The payload is the concatenation of every frame payload that made up one
/// conversation turn. `frame_type` is the type of the frame that opened the
/// turn: `Data` for a reassembled multi-frame payload, `Ack` or `Command`
/// for a single frame.
///
/// # Examples
///
/// ```
/// use as608_core::{Address, Command, Packet};
///
/// let packet = Packet::command(Address::BROADCAST, Command::ReadIndexTable, &[0x01]);
/// assert_eq!(packet.payload.as_ref(), &[0x1F, 0x01]);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    pub address: Address,
    pub frame_type: FrameType,
    pub payload: Bytes,
}

impl Packet {
    /// Create a packet with payload
    pub fn with_payload(
        address: Address,
        frame_type: FrameType,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            address,
            frame_type,
            payload: payload.into(),
        }
    }

    /// Create a command packet: the command byte followed by its arguments
    pub fn command(address: Address, command: Command, args: &[u8]) -> Self {
        let mut payload = Vec::with_capacity(1 + args.len());
        payload.push(u8::from(command));
        payload.extend_from_slice(args);

        Self::with_payload(address, FrameType::Command, payload)
    }

    /// First payload byte: the confirmation code of a module reply
    pub fn status(&self) -> Option<u8> {
        self.payload.first().copied()
    }

    /// Payload after the status byte
    pub fn body(&self) -> &[u8] {
        self.payload.get(1..).unwrap_or_default()
    }

    /// Check if this packet was reassembled from fragments
    pub fn is_reassembled(&self) -> bool {
        self.frame_type == FrameType::Data
    }
}

impl From<Frame> for Packet {
    fn from(frame: Frame) -> Self {
        Self {
            address: frame.address,
            frame_type: frame.frame_type,
            payload: frame.payload,
        }
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("address", &self.address)
            .field("frame_type", &self.frame_type)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Packet[{}](addr={}, len={})",
            self.frame_type,
            self.address,
            self.payload.len()
        )
    }
}
