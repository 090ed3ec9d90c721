//! Device capability and finger status bitsets

use std::fmt;

bitflags::bitflags! {
    /// Static capabilities advertised by a device.
    ///
    /// Fixed when the device is constructed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DeviceFeature: u32 {
        /// Raw image capture
        const CAPTURE = 1 << 0;
        /// Match against a gallery of prints
        const IDENTIFY = 1 << 1;
        /// Match against a single print
        const VERIFY = 1 << 2;
        /// Prints are stored on the device
        const STORAGE = 1 << 3;
        const STORAGE_LIST = 1 << 4;
        const STORAGE_DELETE = 1 << 5;
        const STORAGE_CLEAR = 1 << 6;
        /// Enrollment rejects prints that already exist
        const DUPLICATES_CHECK = 1 << 7;
        /// Enrollment can extend an existing print
        const UPDATE_PRINT = 1 << 9;
    }
}

bitflags::bitflags! {
    /// Whether the driver waits for a finger and whether one is on the sensor.
    ///
    /// `PRESENT` is only meaningful together with `NEEDED`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FingerStatusFlags: u8 {
        /// The driver is waiting for a finger
        const NEEDED = 1 << 0;
        /// A finger is currently detected
        const PRESENT = 1 << 1;
    }
}

impl FingerStatusFlags {
    /// No finger needed, none present
    pub const NONE: Self = Self::empty();

    /// Check the NEEDED/PRESENT invariant
    pub fn is_consistent(self) -> bool {
        !self.contains(Self::PRESENT) || self.contains(Self::NEEDED)
    }
}

impl fmt::Display for FingerStatusFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "NONE");
        }
        bitflags::parser::to_writer(self, f)
    }
}
