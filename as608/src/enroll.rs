//! Automatic enrollment
//!
//! One enroll command makes the module capture, merge and store a template
//! on its own. It reports progress as `[status, step, number]` replies until
//! the store step (or an abort) ends the conversation.

use std::fmt;

use bitflags::bitflags;
use tracing::{debug, info, warn};

use as608_core::{constants::enroll::DEFAULT_CAPTURES, Status};

use crate::error::{Error, Result};

bitflags! {
    /// Enrollment option bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EnrollFlags: u16 {
        /// Keep the sensor backlight off
        const LIGHT_OFF = 1 << 0;
        /// Pre-process captured images
        const PRETREATMENT = 1 << 1;
        /// Only report the final result
        const QUIET = 1 << 2;
        /// Allow overwriting an occupied index
        const OVERWRITE = 1 << 3;
        /// Reject fingers already in the library
        const UNIQUE = 1 << 4;
        /// Do not require lifting the finger between captures
        const ALLOW_KEEP_PRESSING = 1 << 5;
    }
}

impl Default for EnrollFlags {
    fn default() -> Self {
        Self::UNIQUE
    }
}

/// Enrollment parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrollOptions {
    /// Captures merged into the template
    pub captures: u8,

    /// Option bits
    pub flags: EnrollFlags,
}

impl EnrollOptions {
    /// Set the number of captures
    pub fn with_captures(mut self, captures: u8) -> Self {
        self.captures = captures;
        self
    }

    /// Set option bits
    pub fn with_flags(mut self, flags: EnrollFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Command arguments for storing at `index`
    pub(crate) fn args(&self, index: u16) -> [u8; 5] {
        let [id_hi, id_lo] = index.to_be_bytes();
        let [opt_hi, opt_lo] = self.flags.bits().to_be_bytes();
        [id_hi, id_lo, self.captures, opt_hi, opt_lo]
    }
}

impl Default for EnrollOptions {
    fn default() -> Self {
        Self {
            captures: DEFAULT_CAPTURES,
            flags: EnrollFlags::default(),
        }
    }
}

/// Enrollment step reported by the module
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum EnrollStep {
    FingerPresent = 0x00,
    ImageCaptured = 0x01,
    FeaturesGenerated = 0x02,
    LiftFinger = 0x03,
    TemplatesMerged = 0x04,
    DuplicateCheck = 0x05,
    Stored = 0x06,
}

impl EnrollStep {
    pub fn name(self) -> &'static str {
        match self {
            Self::FingerPresent => "place finger",
            Self::ImageCaptured => "image captured",
            Self::FeaturesGenerated => "features generated",
            Self::LiftFinger => "lift finger",
            Self::TemplatesMerged => "templates merged",
            Self::DuplicateCheck => "duplicate check",
            Self::Stored => "stored",
        }
    }
}

impl TryFrom<u8> for EnrollStep {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x00 => Ok(Self::FingerPresent),
            0x01 => Ok(Self::ImageCaptured),
            0x02 => Ok(Self::FeaturesGenerated),
            0x03 => Ok(Self::LiftFinger),
            0x04 => Ok(Self::TemplatesMerged),
            0x05 => Ok(Self::DuplicateCheck),
            0x06 => Ok(Self::Stored),
            _ => Err(Error::ProtocolViolation(format!(
                "unrecognized enroll step 0x{:02X}",
                value
            ))),
        }
    }
}

impl fmt::Display for EnrollStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Progress report for one accepted enrollment reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrollEvent {
    /// Step reached
    pub step: EnrollStep,

    /// Capture round (the reply's number byte)
    pub round: u8,

    /// Raw confirmation code
    pub status: u8,
}

impl EnrollEvent {
    /// Check if the module is repeating a failed capture
    pub fn is_retrying(&self) -> bool {
        matches!(
            self.step,
            EnrollStep::ImageCaptured | EnrollStep::FeaturesGenerated
        ) && self.status != 0
    }
}

impl fmt::Display for EnrollEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_retrying() {
            write!(f, "[{}] {} failed (0x{:02X}), retrying", self.round, self.step, self.status)
        } else {
            write!(f, "[{}] {}", self.round, self.step)
        }
    }
}

/// What the reply did to the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// More replies follow
    Continue(EnrollEvent),

    /// Template stored
    Done(EnrollEvent),
}

/// Interpret one enrollment reply
///
/// Device-side aborts come back as errors: `EnrollTimeout` for `0x26`,
/// `DeviceStatus` for failed presence, merge, duplicate or store steps.
pub fn advance(reply: &[u8]) -> Result<Progress> {
    let &[status, step, round, ..] = reply else {
        return Err(Error::ProtocolViolation(format!(
            "enroll reply needs 3 bytes, got {}",
            reply.len()
        )));
    };

    if status == u8::from(Status::Timeout) {
        warn!("Enrollment timed out on the device");
        return Err(Error::EnrollTimeout);
    }

    let step = EnrollStep::try_from(step)?;
    let event = EnrollEvent { step, round, status };

    match step {
        EnrollStep::FingerPresent | EnrollStep::TemplatesMerged if status != 0 => {
            Err(Error::from_status(status))
        }
        EnrollStep::ImageCaptured | EnrollStep::FeaturesGenerated if status != 0 => {
            warn!("{}", event);
            Ok(Progress::Continue(event))
        }
        EnrollStep::DuplicateCheck if status == u8::from(Status::AlreadyEnrolled) => {
            Err(Error::DeviceStatus(Status::AlreadyEnrolled))
        }
        EnrollStep::Stored if status != 0 => Err(Error::from_status(status)),
        EnrollStep::Stored => {
            info!("Enrollment {}", event);
            Ok(Progress::Done(event))
        }
        _ => {
            debug!("Enrollment {}", event);
            Ok(Progress::Continue(event))
        }
    }
}
