//! Protocol constants

use std::time::Duration;

/// Frame start marker, high byte first on the wire
pub const MAGIC: [u8; 2] = [0xEF, 0x01];

/// Broadcast module address (accepted by every module)
pub const BROADCAST_ADDRESS: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];

/// Bytes before the payload: magic(2) + address(4) + type(1) + length(2)
pub const HEADER_SIZE: usize = 9;

/// Trailing checksum bytes
pub const CHECKSUM_SIZE: usize = 2;

/// Largest payload the 16-bit length field can describe
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize - CHECKSUM_SIZE;

/// How long a receive waits for the idle reader to accept a wake
pub const WAKE_TIMEOUT: Duration = Duration::from_millis(20);

/// Delay between capture attempts while no finger is on the sensor
pub const CAPTURE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Marker closing a valid device info block
pub const INFO_BLOCK_MAGIC: u16 = 0x1234;

/// Size of the device info block
pub const INFO_BLOCK_SIZE: usize = 128;

/// Image geometry
pub mod image {
    /// Raster width in pixels
    pub const WIDTH: usize = 256;

    /// Raster height in pixels
    pub const HEIGHT: usize = 288;

    /// Packed image size: two 4-bit samples per byte
    pub const PACKED_SIZE: usize = WIDTH * HEIGHT / 2;
}

/// Template index table layout
pub mod index_table {
    /// Pages read by an index table scan
    pub const PAGES: u8 = 2;

    /// Template indices covered by one page
    pub const INDICES_PER_PAGE: u16 = 256;

    /// Highest number of templates addressable through the table
    pub const CAPACITY: u16 = PAGES as u16 * INDICES_PER_PAGE;
}

/// Search reply constants
pub mod search {
    /// Template id reported when nothing matched
    pub const NO_MATCH: u16 = 0xFFFF;

    /// Character buffer used by the automatic search
    pub const BUFFER_ID: u8 = 0x03;

    /// Upper bound of the searched range
    pub const RANGE_END: u16 = 0xFFFF;
}

/// Enrollment defaults
pub mod enroll {
    /// Captures merged into one template
    pub const DEFAULT_CAPTURES: u8 = 2;
}
