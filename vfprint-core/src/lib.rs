//! # vfprint-core
//!
//! Wire protocol for the virtual fingerprint device.
//!
//! This crate provides the low-level protocol primitives:
//! - Frame structure and header classification
//! - Streaming frame codec
//! - Retry and device error codes
//! - Driver session state
//! - Protocol constants

pub mod codec;
pub mod codes;
pub mod constants;
pub mod error;
pub mod frame;
pub mod session;

pub use codec::FrameCodec;
pub use codes::{DeviceErrorCode, RetryCode};
pub use error::{Error, Result};
pub use frame::{FrameHeader, VirtualFrame};
pub use session::{Action, ActionGuard, Session, SessionState};
