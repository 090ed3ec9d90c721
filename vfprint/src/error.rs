//! High-level error types

use vfprint_core::{DeviceErrorCode, RetryCode};
use vfprint_transport::Error as ChannelError;

use crate::matcher::MatchError;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by device operations
pub type DriverError = Error;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The operation failed; the caller should not retry as-is
    #[error("Device error {code}: {}", .code.message())]
    Device {
        code: DeviceErrorCode,
        #[source]
        source: Option<ChannelError>,
    },

    /// Capture quality was insufficient; the caller may retry
    #[error("Retry {0}: {}", .0.message())]
    Retry(RetryCode),

    #[error("Operation was cancelled")]
    Cancelled,

    #[error("Timed out after {ms} ms")]
    Timeout { ms: u64 },

    #[error("Type error: {0}")]
    Types(#[from] vfprint_types::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Device error without an underlying channel failure
    pub fn device(code: DeviceErrorCode) -> Self {
        Self::Device { code, source: None }
    }

    /// Device error code, if this is a device error
    pub fn device_code(&self) -> Option<DeviceErrorCode> {
        match self {
            Self::Device { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Retry code, if this is a retry error
    pub fn retry_code(&self) -> Option<RetryCode> {
        match self {
            Self::Retry(code) => Some(*code),
            _ => None,
        }
    }

    pub fn is_retry(&self) -> bool {
        matches!(self, Self::Retry(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<ChannelError> for Error {
    fn from(e: ChannelError) -> Self {
        let code = if e.is_malformed() {
            DeviceErrorCode::Proto
        } else {
            DeviceErrorCode::General
        };
        Self::Device {
            code,
            source: Some(e),
        }
    }
}

impl From<vfprint_core::Error> for Error {
    fn from(e: vfprint_core::Error) -> Self {
        use vfprint_core::Error as Core;

        match e {
            Core::NotOpen => Self::device(DeviceErrorCode::NotOpen),
            Core::AlreadyOpen => Self::device(DeviceErrorCode::AlreadyOpen),
            Core::Busy(_) | Core::Suspended | Core::NotSuspended => {
                Self::device(DeviceErrorCode::Busy)
            }
            Core::Types(e) => Self::Types(e),
            other => Self::from(ChannelError::from(other)),
        }
    }
}

impl From<MatchError> for Error {
    fn from(e: MatchError) -> Self {
        match e {
            MatchError::Retry(code) => Self::Retry(code),
            MatchError::Invalid(_) => Self::device(DeviceErrorCode::DataInvalid),
            MatchError::Failed(_) => Self::device(DeviceErrorCode::General),
        }
    }
}
