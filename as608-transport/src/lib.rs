//! Transport layer for AS608 modules
//!
//! Moves logical packets over a shared duplex byte stream (a serial port,
//! a TCP serial bridge, an in-memory pipe) and fans each completed
//! exchange out to every concurrent receiver.

pub mod codec;
pub mod error;
pub mod mux;
pub mod waiter;

pub use error::{Error, Result};
pub use mux::{Multiplexer, ReaderState};

use std::time::Duration;

use async_trait::async_trait;

use as608_core::{ChunkSize, Packet};

/// Transport trait for packet-level communication
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a packet, fragmenting per the configured chunk size
    async fn send(&self, packet: &Packet) -> Result<()>;

    /// Wait for the next completed exchange
    async fn receive(&self) -> Result<Packet>;

    /// Wait for the next completed exchange, giving up after `timeout`
    async fn receive_timeout(&self, timeout: Duration) -> Result<Packet>;

    /// Close the transport, releasing every waiter
    async fn close(&self) -> Result<()>;

    /// Check if closed
    fn is_closed(&self) -> bool;

    /// Outbound chunk size
    fn chunk_size(&self) -> ChunkSize;

    /// Change the outbound chunk size for subsequent sends
    fn set_chunk_size(&self, chunk_size: ChunkSize);
}
