//! # vfprint
//!
//! Simulated image fingerprint device and the async driver that exercises
//! it, for testing a fingerprint stack without hardware.
//!
//! ## Features
//!
//! - Virtual hardware speaking a small framed protocol over a Unix socket
//! - Capture, multi-stage enroll (including print updates), verify and identify
//! - Cancellation, busy detection and finger status tracking
//! - Pluggable matching engine
//!
//! ## Quick Start
//!
//! ```no_run
//! use vfprint::{CancellationToken, Device, DeviceConfig, Finger, Image, Print, VirtualHardware};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let hardware = VirtualHardware::bind("/tmp/vfprint.sock")?;
//!     let device = Device::new(DeviceConfig::new(hardware.path()));
//!
//!     device.open().await?;
//!     let mut link = hardware.accept().await?;
//!
//!     let scan = Image::new(64, 64, (0..64 * 64).map(|i| (i % 200) as u8).collect::<Vec<_>>())?;
//!     let template = Print::builder(device.info()).finger(Finger::LeftThumb).build();
//!
//!     let cancel = CancellationToken::new();
//!     let enroll = device.enroll(template, &cancel, |p| {
//!         println!("stage {}/{}", p.stage, p.nr_stages);
//!     });
//!     let feed = async {
//!         for _ in 0..device.nr_enroll_stages() {
//!             link.send_image(scan.clone()).await?;
//!         }
//!         Ok::<_, vfprint::ChannelError>(())
//!     };
//!
//!     let (print, fed) = tokio::join!(enroll, feed);
//!     fed?;
//!     println!("Enrolled {}", print?);
//!
//!     device.close().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod matcher;
pub mod scheduler;

// Re-exports
pub use config::DeviceConfig;
pub use device::{Device, EnrollProgress, IdentifyOutcome, VerifyOutcome};
pub use error::{DriverError, Error, Result};
pub use matcher::{GridMatcher, MatchEngine, MatchError};
pub use scheduler::Scheduler;
pub use tokio_util::sync::CancellationToken;

// Re-export protocol, transport and value types
pub use vfprint_core::{Action, DeviceErrorCode, RetryCode, VirtualFrame};
pub use vfprint_transport::{
    Error as ChannelError, HardwareLink, MockHandle, MockTransport, Transport, UnixTransport,
    VirtualHardware,
};
pub use vfprint_types::{
    BitmapSource, DeviceFeature, DeviceInfo, Finger, FingerStatusFlags, Image, MatchPayload,
    Print, ScanType,
};
