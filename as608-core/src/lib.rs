//! # as608-core
//!
//! Core protocol implementation for AS608 optical fingerprint modules.
//!
//! This crate provides the low-level protocol primitives:
//! - Frame structure and encoding/decoding
//! - Checksum calculation
//! - Fragmentation and reassembly of multi-frame payloads
//! - Instruction and confirmation code tables
//! - Session lifecycle

pub mod address;
pub mod checksum;
pub mod command;
pub mod constants;
pub mod error;
pub mod fragment;
pub mod frame;
pub mod packet;
pub mod session;
pub mod status;

pub use address::Address;
pub use command::Command;
pub use error::{Error, Result};
pub use fragment::{ChunkSize, Reassembler, Reassembly};
pub use frame::{Frame, FrameHeader, FrameType};
pub use packet::Packet;
pub use session::{Session, SessionState};
pub use status::Status;
