//! Error types for vfprint-core

/// Result type alias for vfprint-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Frame header is not a valid image or control header
    #[error("Malformed frame header: ({first}, {second})")]
    Malformed {
        first: i32,
        second: i32,
    },

    /// Retry code not known to the protocol
    #[error("Unknown retry code: {0}")]
    UnknownRetryCode(i32),

    /// Device error code not known to the protocol
    #[error("Unknown device error code: {0}")]
    UnknownErrorCode(i32),

    /// Session is closed
    #[error("Session not open - open the device first")]
    NotOpen,

    /// Session is already open
    #[error("Session already open")]
    AlreadyOpen,

    /// Another operation is outstanding on the session
    #[error("Session busy with {0}")]
    Busy(crate::session::Action),

    /// The session is suspended
    #[error("Session suspended")]
    Suspended,

    /// Resume without a matching suspend
    #[error("Session not suspended")]
    NotSuspended,

    #[error("Type error: {0}")]
    Types(#[from] vfprint_types::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if the error is a violation of the wire protocol
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::Malformed { .. } | Self::UnknownRetryCode(_) | Self::UnknownErrorCode(_)
        )
    }
}
