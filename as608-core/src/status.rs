//! Confirmation codes reported by the module
//!
//! The first payload byte of (almost) every reply is a confirmation code.
//! The table is fixed by the module firmware.

use std::fmt;

use crate::error::{Error, Result};

/// Module confirmation code
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    ReceiveError = 0x01,
    NoFinger = 0x02,
    ImageFailed = 0x03,
    TooDry = 0x04,
    TooWet = 0x05,
    TooMessy = 0x06,
    TooFewFeatures = 0x07,
    Mismatch = 0x08,
    NotFound = 0x09,
    MergeFailed = 0x0A,
    IndexOutOfRange = 0x0B,
    InvalidTemplate = 0x0C,
    UploadFeatureFailed = 0x0D,
    PacketRefused = 0x0E,
    UploadImageFailed = 0x0F,
    DeleteFailed = 0x10,
    ClearFailed = 0x11,
    WrongPassword = 0x13,
    NoValidImage = 0x15,
    ResidualFinger = 0x17,
    FlashError = 0x18,
    Undefined = 0x19,
    InvalidRegister = 0x1A,
    RegisterContentError = 0x1B,
    NotepadPageError = 0x1C,
    PortFailed = 0x1D,
    EnrollFailed = 0x1E,
    LibraryFull = 0x1F,
    TemplateEmpty = 0x23,
    LibraryEmpty = 0x24,
    Timeout = 0x26,
    AlreadyEnrolled = 0x27,
}

impl Status {
    /// Human-readable description
    pub fn description(self) -> &'static str {
        match self {
            Self::Ok => "command completed",
            Self::ReceiveError => "packet receive error",
            Self::NoFinger => "no finger on the sensor",
            Self::ImageFailed => "failed to capture fingerprint image",
            Self::TooDry => "image too dry or faint to generate features",
            Self::TooWet => "image too wet or blurry to generate features",
            Self::TooMessy => "image too messy to generate features",
            Self::TooFewFeatures => "too few feature points",
            Self::Mismatch => "fingerprints do not match",
            Self::NotFound => "no matching fingerprint found",
            Self::MergeFailed => "failed to merge features",
            Self::IndexOutOfRange => "template index out of range",
            Self::InvalidTemplate => "template read error or invalid template",
            Self::UploadFeatureFailed => "feature upload failed",
            Self::PacketRefused => "module cannot accept further packets",
            Self::UploadImageFailed => "image upload failed",
            Self::DeleteFailed => "failed to delete template",
            Self::ClearFailed => "failed to clear the library",
            Self::WrongPassword => "wrong password",
            Self::NoValidImage => "no valid image in buffer",
            Self::ResidualFinger => "residual fingerprint on sensor",
            Self::FlashError => "flash read/write error",
            Self::Undefined => "undefined error",
            Self::InvalidRegister => "invalid register number",
            Self::RegisterContentError => "invalid register content",
            Self::NotepadPageError => "invalid notepad page",
            Self::PortFailed => "port operation failed",
            Self::EnrollFailed => "automatic enrollment failed",
            Self::LibraryFull => "fingerprint library full",
            Self::TemplateEmpty => "template is empty",
            Self::LibraryEmpty => "fingerprint library empty",
            Self::Timeout => "operation timed out",
            Self::AlreadyEnrolled => "fingerprint already enrolled",
        }
    }
}

impl From<Status> for u8 {
    fn from(status: Status) -> u8 {
        status as u8
    }
}

impl TryFrom<u8> for Status {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x00 => Ok(Self::Ok),
            0x01 => Ok(Self::ReceiveError),
            0x02 => Ok(Self::NoFinger),
            0x03 => Ok(Self::ImageFailed),
            0x04 => Ok(Self::TooDry),
            0x05 => Ok(Self::TooWet),
            0x06 => Ok(Self::TooMessy),
            0x07 => Ok(Self::TooFewFeatures),
            0x08 => Ok(Self::Mismatch),
            0x09 => Ok(Self::NotFound),
            0x0A => Ok(Self::MergeFailed),
            0x0B => Ok(Self::IndexOutOfRange),
            0x0C => Ok(Self::InvalidTemplate),
            0x0D => Ok(Self::UploadFeatureFailed),
            0x0E => Ok(Self::PacketRefused),
            0x0F => Ok(Self::UploadImageFailed),
            0x10 => Ok(Self::DeleteFailed),
            0x11 => Ok(Self::ClearFailed),
            0x13 => Ok(Self::WrongPassword),
            0x15 => Ok(Self::NoValidImage),
            0x17 => Ok(Self::ResidualFinger),
            0x18 => Ok(Self::FlashError),
            0x19 => Ok(Self::Undefined),
            0x1A => Ok(Self::InvalidRegister),
            0x1B => Ok(Self::RegisterContentError),
            0x1C => Ok(Self::NotepadPageError),
            0x1D => Ok(Self::PortFailed),
            0x1E => Ok(Self::EnrollFailed),
            0x1F => Ok(Self::LibraryFull),
            0x23 => Ok(Self::TemplateEmpty),
            0x24 => Ok(Self::LibraryEmpty),
            0x26 => Ok(Self::Timeout),
            0x27 => Ok(Self::AlreadyEnrolled),
            _ => Err(Error::UnknownStatus(value)),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.description(), *self as u8)
    }
}
