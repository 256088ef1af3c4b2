//! Device information block
//!
//! Reply to the read-info-page command: a fixed 128-byte big-endian record
//! closed by the `0x1234` parameter table marker.

use std::fmt;

use byteorder::{BigEndian, ByteOrder};

use as608_core::constants::{INFO_BLOCK_MAGIC, INFO_BLOCK_SIZE};
use as608_core::Address;

use crate::error::{Error, Result};

/// Device information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Status register
    pub status_register: u16,

    /// Sensor type code
    pub sensor_type: u16,

    /// Template library capacity
    pub database_size: u16,

    /// Matching security level (1-5)
    pub security_level: u16,

    /// Configured module address
    pub address: Address,

    /// Packet size code (0: 32, 1: 64, 2: 128, 3: 256 bytes)
    pub packet_size_code: u16,

    /// Baud rate as a multiple of 9600
    pub baud_multiplier: u16,

    /// USB vendor id
    pub usb_vid: u16,

    /// USB product id
    pub usb_pid: u16,

    /// Product serial
    pub product_serial: String,

    /// Firmware version
    pub software_version: String,

    /// Manufacturer name
    pub manufacturer: String,

    /// Sensor name
    pub sensor_name: String,

    /// Handshake password
    pub password: [u8; 4],

    /// JTAG lock flag
    pub jtag_lock: [u8; 4],

    /// Sensor init routine entry
    pub sensor_init_entry: u16,

    /// Sensor get-image routine entry
    pub sensor_get_image_entry: u16,

    /// Parameter table flag, always `0x1234` on a valid block
    pub parameter_table_flag: u16,
}

impl DeviceInfo {
    /// Parse an info block
    ///
    /// Bytes past the first 128 are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use as608_types::DeviceInfo;
    ///
    /// let mut block = [0u8; 128];
    /// block[4..6].copy_from_slice(&300u16.to_be_bytes());
    /// block[126..128].copy_from_slice(&0x1234u16.to_be_bytes());
    ///
    /// let info = DeviceInfo::parse(&block).unwrap();
    /// assert_eq!(info.database_size, 300);
    /// ```
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < INFO_BLOCK_SIZE {
            return Err(Error::Parse(format!(
                "info block needs {} bytes, got {}",
                INFO_BLOCK_SIZE,
                data.len()
            )));
        }

        let u16_at = |offset: usize| BigEndian::read_u16(&data[offset..offset + 2]);

        let parameter_table_flag = u16_at(126);
        if parameter_table_flag != INFO_BLOCK_MAGIC {
            return Err(Error::Validation(format!(
                "parameter table flag 0x{:04X}, expected 0x{:04X}",
                parameter_table_flag, INFO_BLOCK_MAGIC
            )));
        }

        Ok(Self {
            status_register: u16_at(0),
            sensor_type: u16_at(2),
            database_size: u16_at(4),
            security_level: u16_at(6),
            address: Address(quad(&data[8..12])),
            packet_size_code: u16_at(12),
            baud_multiplier: u16_at(14),
            usb_vid: u16_at(16),
            usb_pid: u16_at(18),
            product_serial: ascii(&data[28..36]),
            software_version: ascii(&data[36..44]),
            manufacturer: ascii(&data[44..52]),
            sensor_name: ascii(&data[52..60]),
            password: quad(&data[60..64]),
            jtag_lock: quad(&data[64..68]),
            sensor_init_entry: u16_at(68),
            sensor_get_image_entry: u16_at(70),
            parameter_table_flag,
        })
    }

    /// Data packet size in bytes, if the code is known
    pub fn packet_size(&self) -> Option<usize> {
        match self.packet_size_code {
            code @ 0..=3 => Some(32usize << code),
            _ => None,
        }
    }

    /// Serial baud rate
    pub fn baud_rate(&self) -> u32 {
        u32::from(self.baud_multiplier) * 9600
    }
}

fn quad(bytes: &[u8]) -> [u8; 4] {
    let mut out = [0u8; 4];
    out.copy_from_slice(bytes);
    out
}

fn ascii(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(|c: char| c == '\0' || c == ' ')
        .to_string()
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Device[Sensor: {}, SN: {}, FW: {}, Capacity: {}]",
            self.sensor_name, self.product_serial, self.software_version, self.database_size
        )
    }
}
