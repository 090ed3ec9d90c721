//! Transport layer for the virtual fingerprint device
//!
//! Provides the channel between the driver and the simulated hardware:
//! - [`UnixTransport`]: driver side, connects to the hardware's socket
//! - [`VirtualHardware`]: harness side, listens and sends frames
//! - [`MockTransport`]: in-memory channel for driver tests

pub mod error;
pub mod hardware;
pub mod mock;
pub mod unix;

pub use error::{Error, Result};
pub use hardware::{HardwareLink, VirtualHardware};
pub use mock::{MockHandle, MockTransport};
pub use unix::UnixTransport;

use async_trait::async_trait;
use vfprint_core::VirtualFrame;

/// Transport trait for the driver's end of the channel
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to the simulated hardware
    async fn connect(&mut self) -> Result<()>;

    /// Disconnect from the simulated hardware
    async fn disconnect(&mut self) -> Result<()>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Receive the next complete frame
    ///
    /// Must be cancel safe: dropping the future before it resolves loses
    /// no buffered bytes, and the next call continues where it left off.
    async fn receive(&mut self) -> Result<VirtualFrame>;

    /// Get remote address
    fn remote_addr(&self) -> String;
}
