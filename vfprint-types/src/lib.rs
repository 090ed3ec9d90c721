//! Type definitions for vfprint
//!
//! Plain values shared by the protocol, transport and driver crates:
//! bitmaps, finger identities, capability and status bitsets, device
//! information and enrolled prints.

pub mod device_info;
pub mod error;
pub mod finger;
pub mod flags;
pub mod image;
pub mod print;

pub use device_info::{DeviceInfo, ScanType};
pub use error::{Error, Result};
pub use finger::Finger;
pub use flags::{DeviceFeature, FingerStatusFlags};
pub use image::{BitmapSource, Image};
pub use print::{MatchPayload, Print, PrintBuilder};
