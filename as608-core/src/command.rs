//! AS608 instruction codes

use std::fmt;

/// Instruction codes understood by the module firmware
///
/// The code is the first payload byte of every command frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    // Image capture
    GetImage = 0x01,
    UploadImage = 0x0A,

    // Template library
    ClearLibrary = 0x0D,
    ReadInfoPage = 0x16,
    TemplateCount = 0x1D,
    ReadIndexTable = 0x1F,

    // Automatic operations
    Cancel = 0x30,
    AutoEnroll = 0x31,
    AutoSearch = 0x32,
    Sleep = 0x33,
    ReadSerial = 0x34,
}

impl Command {
    /// Get command name
    pub fn name(self) -> &'static str {
        match self {
            Self::GetImage => "GET_IMAGE",
            Self::UploadImage => "UP_IMAGE",
            Self::ClearLibrary => "EMPTY",
            Self::ReadInfoPage => "READ_INF_PAGE",
            Self::TemplateCount => "VALID_TEMPLATE_NUM",
            Self::ReadIndexTable => "READ_INDEX_TABLE",
            Self::Cancel => "CANCEL",
            Self::AutoEnroll => "AUTO_ENROLL",
            Self::AutoSearch => "AUTO_SEARCH",
            Self::Sleep => "SLEEP",
            Self::ReadSerial => "READ_SN",
        }
    }

    /// Check if the module answers this command with more than one reply
    pub fn is_multi_reply(self) -> bool {
        matches!(
            self,
            Self::UploadImage | Self::ReadInfoPage | Self::AutoEnroll | Self::AutoSearch
        )
    }
}

impl From<Command> for u8 {
    fn from(cmd: Command) -> u8 {
        cmd as u8
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), *self as u8)
    }
}
