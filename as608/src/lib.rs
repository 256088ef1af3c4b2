//! # as608
//!
//! Async driver for AS608 optical fingerprint modules.
//!
//! ## Features
//!
//! - Works over any duplex byte stream (serial port, TCP serial bridge)
//! - Concurrent callers share one stream through a fan-out multiplexer
//! - Typed replies: device info, index table, search results, images
//! - Automatic enrollment with progress reporting
//!
//! ## Quick Start
//!
//! ```no_run
//! use as608::Device;
//! use tokio::net::TcpStream;
//!
//! #[tokio::main]
//! async fn main() -> as608::Result<()> {
//!     // Module behind a TCP-to-serial bridge
//!     let stream = TcpStream::connect("192.168.1.50:8899").await.unwrap();
//!     let device = Device::open(stream);
//!
//!     println!("{} templates stored", device.template_count().await?);
//!
//!     let result = device.search().await?;
//!     println!("{}", result);
//!
//!     device.close().await?;
//!     Ok(())
//! }
//! ```

pub mod device;
pub mod enroll;
pub mod error;
pub mod search;

// Re-exports
pub use device::Device;
pub use enroll::{EnrollEvent, EnrollFlags, EnrollOptions, EnrollStep};
pub use error::{Error, Result};
pub use search::SearchPhase;

// Re-export protocol and record types
pub use as608_core::{Address, ChunkSize, Command, Packet, Session, SessionState, Status};
pub use as608_transport::{Multiplexer, Transport};
pub use as608_types::{DeviceInfo, IndexTable, Raster, SearchMatch};
