//! Fragmentation of outbound payloads and reassembly of inbound ones
//!
//! Outbound, a payload longer than the configured chunk size is split into
//! consecutive `Data` frames. The host never tags its last fragment `End`;
//! the module works from the total length. Inbound, a reply opened by a
//! `Data` frame continues until an `End` frame has been appended.

use bytes::{Bytes, BytesMut};
use std::fmt;

use crate::{
    address::Address,
    error::{Error, Result},
    frame::{Frame, FrameType},
    packet::Packet,
};

/// Maximum payload bytes per outbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChunkSize {
    /// Never split
    Disabled,
    #[default]
    B64,
    B128,
    B256,
}

impl ChunkSize {
    /// Chunk size in bytes, `None` when splitting is disabled
    pub fn bytes(self) -> Option<usize> {
        match self {
            Self::Disabled => None,
            Self::B64 => Some(64),
            Self::B128 => Some(128),
            Self::B256 => Some(256),
        }
    }
}

impl TryFrom<usize> for ChunkSize {
    type Error = Error;

    fn try_from(value: usize) -> Result<Self> {
        match value {
            0 => Ok(Self::Disabled),
            64 => Ok(Self::B64),
            128 => Ok(Self::B128),
            256 => Ok(Self::B256),
            _ => Err(Error::UnsupportedChunkSize(value)),
        }
    }
}

impl fmt::Display for ChunkSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bytes() {
            Some(n) => write!(f, "{n} bytes"),
            None => f.write_str("disabled"),
        }
    }
}

/// Split a logical packet into the frames that carry it on the wire
///
/// # Examples
///
/// ```
/// use as608_core::{fragment, Address, ChunkSize, FrameType, Packet};
///
/// let packet = Packet::with_payload(Address::BROADCAST, FrameType::Data, vec![0u8; 150]);
/// let frames = fragment::split(&packet, ChunkSize::B64);
///
/// assert_eq!(frames.len(), 3);
/// assert_eq!(frames[2].payload.len(), 22);
/// ```
pub fn split(packet: &Packet, chunk: ChunkSize) -> Vec<Frame> {
    match chunk.bytes() {
        Some(size) if packet.payload.len() > size => packet
            .payload
            .chunks(size)
            .map(|part| {
                Frame::new(
                    packet.address,
                    FrameType::Data,
                    packet.payload.slice_ref(part),
                )
            })
            .collect(),
        _ => vec![Frame::new(
            packet.address,
            packet.frame_type,
            packet.payload.clone(),
        )],
    }
}

/// Progress of a reassembly after accepting one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reassembly {
    /// More frames are needed
    Pending,

    /// The logical packet is complete
    Complete(Packet),
}

/// Collects frames into one logical packet
#[derive(Debug, Default)]
pub struct Reassembler {
    opened: Option<(Address, FrameType)>,
    buf: BytesMut,
    frames: usize,
}

impl Reassembler {
    /// Create an empty reassembler
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept the next decoded frame
    pub fn push(&mut self, frame: Frame) -> Reassembly {
        self.frames += 1;

        let (address, opened_as) = *self
            .opened
            .get_or_insert((frame.address, frame.frame_type));

        // A reply that does not open with a fragment is a single frame
        if self.frames == 1 && !frame.is_fragment() {
            self.reset();
            return Reassembly::Complete(Packet::from(frame));
        }

        self.buf.extend_from_slice(&frame.payload);

        if frame.is_terminal() {
            let payload = self.buf.split().freeze();
            self.reset();
            return Reassembly::Complete(Packet::with_payload(address, opened_as, payload));
        }

        Reassembly::Pending
    }

    /// Frames accepted so far
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Take whatever was collected before an error interrupted the exchange
    pub fn take_partial(&mut self) -> Bytes {
        let partial = self.buf.split().freeze();
        self.reset();
        partial
    }

    fn reset(&mut self) {
        self.opened = None;
        self.frames = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn data(payload: &[u8]) -> Frame {
        Frame::new(Address::BROADCAST, FrameType::Data, payload.to_vec())
    }

    fn end(payload: &[u8]) -> Frame {
        Frame::new(Address::BROADCAST, FrameType::End, payload.to_vec())
    }

    #[test]
    fn test_split_small_payload_keeps_type() {
        let packet = Packet::with_payload(Address::BROADCAST, FrameType::Command, vec![0x01]);
        let frames = split(&packet, ChunkSize::B64);

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].frame_type, FrameType::Command);
    }

    #[test]
    fn test_split_exact_chunk_is_single_frame() {
        let packet = Packet::with_payload(Address::BROADCAST, FrameType::Command, vec![7; 128]);
        let frames = split(&packet, ChunkSize::B128);

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].frame_type, FrameType::Command);
    }

    #[test]
    fn test_split_tags_every_fragment_data() {
        let packet = Packet::with_payload(Address::from(5), FrameType::Command, vec![1; 130]);
        let frames = split(&packet, ChunkSize::B64);

        assert_eq!(frames.len(), 3);
        assert!(frames.iter().all(|f| f.frame_type == FrameType::Data));
        assert!(frames.iter().all(|f| f.address == Address::from(5)));
        assert_eq!(frames[2].payload.len(), 2);
    }

    #[test]
    fn test_split_disabled() {
        let packet = Packet::with_payload(Address::BROADCAST, FrameType::Data, vec![0; 4096]);
        let frames = split(&packet, ChunkSize::Disabled);

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload.len(), 4096);
    }

    #[test]
    fn test_chunk_size_from_bytes() {
        assert_eq!(ChunkSize::try_from(0).unwrap(), ChunkSize::Disabled);
        assert_eq!(ChunkSize::try_from(256).unwrap(), ChunkSize::B256);
        assert!(ChunkSize::try_from(32).is_err());
        assert_eq!(ChunkSize::default(), ChunkSize::B64);
    }

    #[test]
    fn test_reassemble_single_ack() {
        let mut reassembler = Reassembler::new();
        let ack = Frame::new(Address::BROADCAST, FrameType::Ack, vec![0x00]);

        let Reassembly::Complete(packet) = reassembler.push(ack) else {
            panic!("single frame should complete");
        };
        assert_eq!(packet.frame_type, FrameType::Ack);
        assert_eq!(packet.payload.as_ref(), &[0x00]);
    }

    #[test]
    fn test_reassemble_data_then_end() {
        let mut reassembler = Reassembler::new();

        assert_eq!(reassembler.push(data(&[1, 2])), Reassembly::Pending);
        assert_eq!(reassembler.push(data(&[3])), Reassembly::Pending);
        assert_eq!(reassembler.frames(), 2);

        let Reassembly::Complete(packet) = reassembler.push(end(&[4, 5])) else {
            panic!("end frame should complete");
        };
        assert!(packet.is_reassembled());
        assert_eq!(packet.payload.as_ref(), &[1, 2, 3, 4, 5]);
        assert_eq!(reassembler.frames(), 0);
    }

    #[test]
    fn test_reassemble_appends_non_terminal_frames() {
        let mut reassembler = Reassembler::new();
        let ack = Frame::new(Address::BROADCAST, FrameType::Ack, vec![9]);

        assert_eq!(reassembler.push(data(&[1])), Reassembly::Pending);
        assert_eq!(reassembler.push(ack), Reassembly::Pending);
        assert!(matches!(
            reassembler.push(end(&[])),
            Reassembly::Complete(p) if p.payload.as_ref() == &[1, 9]
        ));
    }

    #[test]
    fn test_take_partial() {
        let mut reassembler = Reassembler::new();
        reassembler.push(data(&[1, 2, 3]));

        assert_eq!(reassembler.take_partial().as_ref(), &[1, 2, 3]);
        assert_eq!(reassembler.frames(), 0);
        assert!(reassembler.take_partial().is_empty());
    }

    proptest! {
        #[test]
        fn prop_split_then_reassemble(
            payload in proptest::collection::vec(any::<u8>(), 257..2048),
            chunk in prop_oneof![
                Just(ChunkSize::B64),
                Just(ChunkSize::B128),
                Just(ChunkSize::B256),
            ],
        ) {
            let size = chunk.bytes().unwrap();
            let packet = Packet::with_payload(Address::BROADCAST, FrameType::Data, payload.clone());
            let mut frames = split(&packet, chunk);

            prop_assert_eq!(frames.len(), payload.len().div_ceil(size));
            prop_assert!(frames.iter().all(|f| f.payload.len() <= size));

            // Module to host direction: last fragment tagged End
            if let Some(last) = frames.last_mut() {
                last.frame_type = FrameType::End;
            }

            let mut reassembler = Reassembler::new();
            let mut complete = None;
            for frame in frames {
                if let Reassembly::Complete(p) = reassembler.push(frame) {
                    complete = Some(p);
                }
            }

            prop_assert_eq!(complete.map(|p| p.payload.to_vec()), Some(payload));
        }
    }
}
