//! Protocol constants

/// Size of a frame header: two native-endian i32 values
pub const HEADER_SIZE: usize = 8;

/// Largest accepted image (pixels); bigger headers are protocol violations
pub const MAX_IMAGE_PIXELS: usize = 16 * 1024 * 1024;

/// Control frame sentinels (first header integer)
pub mod sentinels {
    /// Retry frame, second integer is a retry code
    pub const RETRY: i32 = -1;

    /// Error frame, second integer is a device error code
    pub const ERROR: i32 = -2;

    /// Automatic finger reporting on (1) or off (0)
    pub const FINGER_AUTOMATIC: i32 = -3;

    /// Finger present (1) or removed (0)
    pub const FINGER_REPORT: i32 = -4;
}

/// Environment variables used to configure the virtual device
pub mod env {
    /// Path of the Unix socket shared by driver and simulated hardware
    pub const VIRTUAL_IMAGE: &str = "FP_VIRTUAL_IMAGE";
}

/// Default connect timeout (milliseconds)
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;

/// Enrollment stages of the reference virtual device
pub const DEFAULT_ENROLL_STAGES: u32 = 5;

/// Driver identifier of the virtual image device
pub const VIRTUAL_IMAGE_DRIVER: &str = "virtual_image";

/// Display name of the virtual image device
pub const VIRTUAL_IMAGE_NAME: &str = "Virtual image device for debugging";
