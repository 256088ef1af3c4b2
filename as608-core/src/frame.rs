//! AS608 wire frame structure and encoding/decoding

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

use crate::{
    address::Address,
    checksum,
    constants::{CHECKSUM_SIZE, HEADER_SIZE, MAGIC, MAX_PAYLOAD_SIZE},
    error::{Error, Result},
};

/// Frame type tag
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameType {
    /// Self-contained command (host to module)
    Command = 0x01,

    /// Non-terminal fragment of a larger payload
    Data = 0x02,

    /// Single-frame reply (module to host)
    Ack = 0x07,

    /// Terminal fragment of a larger payload
    End = 0x08,
}

impl FrameType {
    /// Get type name
    pub fn name(self) -> &'static str {
        match self {
            Self::Command => "COMMAND",
            Self::Data => "DATA",
            Self::Ack => "ACK",
            Self::End => "END",
        }
    }
}

impl From<FrameType> for u8 {
    fn from(ty: FrameType) -> u8 {
        ty as u8
    }
}

impl TryFrom<u8> for FrameType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(Self::Command),
            0x02 => Ok(Self::Data),
            0x07 => Ok(Self::Ack),
            0x08 => Ok(Self::End),
            _ => Err(Error::UnknownFrameType(value)),
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), *self as u8)
    }
}

/// Fixed 9-byte frame header
///
/// The type byte is kept raw: it is only interpreted once the checksum,
/// which covers it, has been verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub address: Address,
    pub frame_type: u8,
    /// Wire length field: payload length + 2
    pub length: u16,
}

impl FrameHeader {
    /// Parse the header, rejecting anything without the `EF 01` magic
    pub fn parse(raw: &[u8; HEADER_SIZE]) -> Result<Self> {
        if raw[..2] != MAGIC {
            return Err(Error::InvalidFrame {
                found: u16::from_be_bytes([raw[0], raw[1]]),
            });
        }

        Ok(Self {
            address: Address([raw[2], raw[3], raw[4], raw[5]]),
            frame_type: raw[6],
            length: u16::from_be_bytes([raw[7], raw[8]]),
        })
    }

    /// Bytes following the header (payload + checksum)
    pub fn body_len(&self) -> usize {
        self.length as usize
    }
}

/// AS608 wire frame
///
/// # Frame Structure
///
/// ```text
/// ┌─────────┬─────────┬──────┬─────────┬───────────┬──────────┐
/// │  Magic  │ Address │ Type │ Length  │  Payload  │ Checksum │
/// │ EF 01   │ 4 bytes │  1   │ 2 (BE)  │ len-2     │  2 (BE)  │
/// └─────────┴─────────┴──────┴─────────┴───────────┴──────────┘
/// ```
///
/// `Length` counts the payload plus the checksum. The checksum is the
/// 16-bit wrapping sum of type, both length bytes and the payload.
///
/// # Examples
///
/// ```
/// use as608_core::{Address, Frame, FrameType};
///
/// let frame = Frame::new(Address::BROADCAST, FrameType::Command, vec![0x01]);
/// let encoded = frame.encode().unwrap();
///
/// let decoded = Frame::decode(encoded).unwrap();
/// assert_eq!(frame, decoded);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    pub address: Address,
    pub frame_type: FrameType,
    pub payload: Bytes,
}

impl Frame {
    /// Create a frame
    pub fn new(address: Address, frame_type: FrameType, payload: impl Into<Bytes>) -> Self {
        Self {
            address,
            frame_type,
            payload: payload.into(),
        }
    }

    /// Wire length field for this frame
    pub fn length(&self) -> u16 {
        (self.payload.len() + CHECKSUM_SIZE) as u16
    }

    /// Calculate checksum for this frame
    pub fn checksum(&self) -> u16 {
        checksum::calculate(self.frame_type.into(), self.length(), &self.payload)
    }

    /// Encode frame to bytes
    ///
    /// # Errors
    ///
    /// Returns `PayloadTooLarge` if the payload exceeds 65533 bytes.
    pub fn encode(&self) -> Result<BytesMut> {
        if self.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(Error::PayloadTooLarge {
                size: self.payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let mut buf = BytesMut::with_capacity(self.size());

        buf.put_slice(&MAGIC);
        buf.put_slice(&self.address.octets());
        buf.put_u8(self.frame_type.into());
        buf.put_u16(self.length());
        buf.put_slice(&self.payload);
        buf.put_u16(self.checksum());

        Ok(buf)
    }

    /// Decode one complete frame held in `buf`
    ///
    /// Bytes past the declared length are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Buffer is shorter than the header or the declared length
    /// - Magic bytes are not `EF 01`
    /// - Length field cannot hold a checksum
    /// - Checksum verification fails
    /// - Type tag is unknown
    pub fn decode(mut buf: BytesMut) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::FrameTooShort {
                expected: HEADER_SIZE,
                actual: buf.len(),
            });
        }

        let mut raw = [0u8; HEADER_SIZE];
        buf.copy_to_slice(&mut raw);
        let header = FrameHeader::parse(&raw)?;

        if buf.len() < header.body_len() {
            return Err(Error::FrameTooShort {
                expected: HEADER_SIZE + header.body_len(),
                actual: HEADER_SIZE + buf.len(),
            });
        }

        let body = buf.split_to(header.body_len());
        Self::from_parts(header, body)
    }

    /// Assemble a frame from its parsed header and the `length` bytes that
    /// followed it on the wire
    pub fn from_parts(header: FrameHeader, mut body: BytesMut) -> Result<Self> {
        if body.len() < CHECKSUM_SIZE {
            return Err(Error::ShortPayload { length: body.len() });
        }

        let trailer = body.split_off(body.len() - CHECKSUM_SIZE);
        let received = u16::from_be_bytes([trailer[0], trailer[1]]);
        let expected = checksum::calculate(header.frame_type, header.length, &body);

        if expected != received {
            return Err(Error::ChecksumMismatch { expected, received });
        }

        Ok(Self {
            address: header.address,
            frame_type: FrameType::try_from(header.frame_type)?,
            payload: body.freeze(),
        })
    }

    /// Check if this frame opens or continues a multi-frame payload
    pub fn is_fragment(&self) -> bool {
        self.frame_type == FrameType::Data
    }

    /// Check if this frame closes a multi-frame payload
    pub fn is_terminal(&self) -> bool {
        self.frame_type == FrameType::End
    }

    /// Get total encoded size
    pub fn size(&self) -> usize {
        HEADER_SIZE + self.payload.len() + CHECKSUM_SIZE
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let preview = &self.payload[..self.payload.len().min(16)];
        f.debug_struct("Frame")
            .field("address", &self.address)
            .field("frame_type", &self.frame_type)
            .field("checksum", &format!("0x{:04X}", self.checksum()))
            .field("payload_len", &self.payload.len())
            .field("payload", &hex::encode_upper(preview))
            .finish()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame[{}](addr={}, len={})",
            self.frame_type,
            self.address,
            self.payload.len()
        )
    }
}
