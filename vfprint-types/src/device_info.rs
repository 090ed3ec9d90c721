//! Device information structures

use std::fmt;

use crate::flags::DeviceFeature;

/// How the sensor acquires a print
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanType {
    /// Finger is placed on the sensor
    #[default]
    Press,
    /// Finger is swiped across the sensor
    Swipe,
}

/// Static device information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Identifier of the driver handling the device
    pub driver: String,

    /// Identifier of this device instance
    pub device_id: String,

    /// Human readable device name
    pub name: String,

    /// Advertised capabilities
    pub features: DeviceFeature,

    /// Number of captures needed to enroll a print
    pub nr_enroll_stages: u32,

    pub scan_type: ScanType,
}

impl DeviceInfo {
    pub fn new(
        driver: impl Into<String>,
        device_id: impl Into<String>,
        features: DeviceFeature,
    ) -> Self {
        Self {
            driver: driver.into(),
            device_id: device_id.into(),
            name: String::new(),
            features,
            nr_enroll_stages: 1,
            scan_type: ScanType::Press,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_enroll_stages(mut self, stages: u32) -> Self {
        self.nr_enroll_stages = stages;
        self
    }

    pub fn with_scan_type(mut self, scan_type: ScanType) -> Self {
        self.scan_type = scan_type;
        self
    }

    /// Check whether any of the given features is advertised
    pub fn has_feature(&self, feature: DeviceFeature) -> bool {
        self.features.intersects(feature)
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Device[{}/{}: {}]", self.driver, self.device_id, self.name)
    }
}
