//! Transport errors

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Virtual device at {path} is unreachable: {source}")]
    Unreachable {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Malformed frame header: ({first}, {second})")]
    Malformed {
        first: i32,
        second: i32,
    },

    #[error("Not connected")]
    NotConnected,

    #[error("Already connected")]
    AlreadyConnected,

    #[error("Connection timeout")]
    ConnectionTimeout,

    #[error("Connection closed by remote")]
    ConnectionClosed,

    #[error("Protocol error: {0}")]
    Protocol(vfprint_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

impl Error {
    /// Check if the peer sent data that violates the wire protocol
    pub fn is_malformed(&self) -> bool {
        match self {
            Self::Malformed { .. } => true,
            Self::Protocol(e) => e.is_protocol_violation(),
            _ => false,
        }
    }
}

impl From<vfprint_core::Error> for Error {
    fn from(e: vfprint_core::Error) -> Self {
        match e {
            vfprint_core::Error::Malformed { first, second } => Self::Malformed { first, second },
            vfprint_core::Error::Io(e) => Self::Io(e),
            other => Self::Protocol(other),
        }
    }
}
