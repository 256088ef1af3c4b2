//! Domain records decoded from AS608 replies

pub mod device_info;
pub mod error;
pub mod index_table;
pub mod raster;
pub mod search;

pub use device_info::DeviceInfo;
pub use error::{Error, Result};
pub use index_table::IndexTable;
pub use raster::Raster;
pub use search::SearchMatch;
