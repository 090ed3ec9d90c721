//! Retry and device error codes carried by control frames

use std::fmt;

use crate::error::{Error, Result};

/// Recoverable capture-quality reasons
///
/// The caller may re-run the same operation after one of these.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum RetryCode {
    General = 0,
    TooShort = 1,
    CenterFinger = 2,
    RemoveFinger = 3,
    TooFast = 4,
}

impl RetryCode {
    pub fn name(self) -> &'static str {
        match self {
            Self::General => "RETRY_GENERAL",
            Self::TooShort => "RETRY_TOO_SHORT",
            Self::CenterFinger => "RETRY_CENTER_FINGER",
            Self::RemoveFinger => "RETRY_REMOVE_FINGER",
            Self::TooFast => "RETRY_TOO_FAST",
        }
    }

    /// Message suitable for prompting the user
    pub fn message(self) -> &'static str {
        match self {
            Self::General => "Please try again.",
            Self::TooShort => "The swipe was too short, please try again.",
            Self::CenterFinger => "The finger was not centered properly, please try again.",
            Self::RemoveFinger => "Please try again after removing the finger first.",
            Self::TooFast => "The swipe was too fast, please try again.",
        }
    }
}

impl From<RetryCode> for i32 {
    fn from(code: RetryCode) -> i32 {
        code as i32
    }
}

impl TryFrom<i32> for RetryCode {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Self::General),
            1 => Ok(Self::TooShort),
            2 => Ok(Self::CenterFinger),
            3 => Ok(Self::RemoveFinger),
            4 => Ok(Self::TooFast),
            _ => Err(Error::UnknownRetryCode(value)),
        }
    }
}

impl fmt::Display for RetryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), *self as i32)
    }
}

/// Fatal failures of the current operation
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum DeviceErrorCode {
    General = 0,
    NotSupported = 1,
    NotOpen = 2,
    AlreadyOpen = 3,
    Busy = 4,
    Proto = 5,
    DataInvalid = 6,
    DataNotFound = 7,
    DataFull = 8,
    DataDuplicate = 9,
    Removed = 10,
    TooHot = 11,
}

impl DeviceErrorCode {
    pub fn name(self) -> &'static str {
        match self {
            Self::General => "ERROR_GENERAL",
            Self::NotSupported => "ERROR_NOT_SUPPORTED",
            Self::NotOpen => "ERROR_NOT_OPEN",
            Self::AlreadyOpen => "ERROR_ALREADY_OPEN",
            Self::Busy => "ERROR_BUSY",
            Self::Proto => "ERROR_PROTO",
            Self::DataInvalid => "ERROR_DATA_INVALID",
            Self::DataNotFound => "ERROR_DATA_NOT_FOUND",
            Self::DataFull => "ERROR_DATA_FULL",
            Self::DataDuplicate => "ERROR_DATA_DUPLICATE",
            Self::Removed => "ERROR_REMOVED",
            Self::TooHot => "ERROR_TOO_HOT",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::General => "An unspecified error occurred!",
            Self::NotSupported => "The operation is not supported on this device!",
            Self::NotOpen => "The device needs to be opened first!",
            Self::AlreadyOpen => "The device has already been opened!",
            Self::Busy => "The device is still busy with another operation, please try again later.",
            Self::Proto => "The driver encountered a protocol error with the device.",
            Self::DataInvalid => "Passed (print) data is not valid.",
            Self::DataNotFound => "Print was not found on the devices storage.",
            Self::DataFull => "On device storage space is full.",
            Self::DataDuplicate => "This finger has already been enrolled.",
            Self::Removed => "This device has been removed from the system.",
            Self::TooHot => "Device disabled to prevent overheating.",
        }
    }
}

impl From<DeviceErrorCode> for i32 {
    fn from(code: DeviceErrorCode) -> i32 {
        code as i32
    }
}

impl TryFrom<i32> for DeviceErrorCode {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Self::General),
            1 => Ok(Self::NotSupported),
            2 => Ok(Self::NotOpen),
            3 => Ok(Self::AlreadyOpen),
            4 => Ok(Self::Busy),
            5 => Ok(Self::Proto),
            6 => Ok(Self::DataInvalid),
            7 => Ok(Self::DataNotFound),
            8 => Ok(Self::DataFull),
            9 => Ok(Self::DataDuplicate),
            10 => Ok(Self::Removed),
            11 => Ok(Self::TooHot),
            _ => Err(Error::UnknownErrorCode(value)),
        }
    }
}

impl fmt::Display for DeviceErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), *self as i32)
    }
}
