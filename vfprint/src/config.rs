//! Device configuration

use std::path::PathBuf;
use std::time::Duration;

use vfprint_core::constants::{
    env, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_ENROLL_STAGES, VIRTUAL_IMAGE_DRIVER,
    VIRTUAL_IMAGE_NAME,
};
use vfprint_types::{DeviceFeature, DeviceInfo, ScanType};

use crate::error::{Error, Result};

/// Configuration of a virtual image device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Socket the simulated hardware listens on
    pub socket_path: PathBuf,
    pub driver: String,
    pub device_id: String,
    pub name: String,
    pub features: DeviceFeature,
    pub nr_enroll_stages: u32,
    pub scan_type: ScanType,
    pub connect_timeout: Duration,
}

impl DeviceConfig {
    /// Configuration of the reference virtual image device at `socket_path`
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            driver: VIRTUAL_IMAGE_DRIVER.to_string(),
            device_id: "0".to_string(),
            name: VIRTUAL_IMAGE_NAME.to_string(),
            features: DeviceFeature::CAPTURE
                | DeviceFeature::IDENTIFY
                | DeviceFeature::VERIFY
                | DeviceFeature::UPDATE_PRINT,
            nr_enroll_stages: DEFAULT_ENROLL_STAGES,
            scan_type: ScanType::Press,
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
        }
    }

    /// Read the socket path from `FP_VIRTUAL_IMAGE`
    pub fn from_env() -> Result<Self> {
        let path = std::env::var_os(env::VIRTUAL_IMAGE)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| Error::Config(format!("{} is not set", env::VIRTUAL_IMAGE)))?;
        Ok(Self::new(PathBuf::from(path)))
    }

    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = device_id.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_features(mut self, features: DeviceFeature) -> Self {
        self.features = features;
        self
    }

    /// Set the number of captures per enrollment
    pub fn with_enroll_stages(mut self, stages: u32) -> Self {
        self.nr_enroll_stages = stages;
        self
    }

    pub fn with_scan_type(mut self, scan_type: ScanType) -> Self {
        self.scan_type = scan_type;
        self
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.nr_enroll_stages == 0 {
            return Err(Error::Config("enrollment needs at least one stage".into()));
        }
        if self.socket_path.as_os_str().is_empty() {
            return Err(Error::Config("socket path is empty".into()));
        }
        Ok(())
    }

    /// Static device information for this configuration
    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo::new(self.driver.clone(), self.device_id.clone(), self.features)
            .with_name(self.name.clone())
            .with_enroll_stages(self.nr_enroll_stages)
            .with_scan_type(self.scan_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = DeviceConfig::new("/tmp/vfprint.sock");
        let info = config.device_info();

        assert_eq!(info.driver, "virtual_image");
        assert_eq!(info.device_id, "0");
        assert_eq!(info.nr_enroll_stages, 5);
        assert!(info.has_feature(DeviceFeature::UPDATE_PRINT));
        assert!(!info.has_feature(DeviceFeature::STORAGE));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = DeviceConfig::new("/tmp/vfprint.sock")
            .with_device_id("7")
            .with_enroll_stages(3)
            .with_scan_type(ScanType::Swipe)
            .with_features(DeviceFeature::CAPTURE);
        let info = config.device_info();

        assert_eq!(info.device_id, "7");
        assert_eq!(info.nr_enroll_stages, 3);
        assert_eq!(info.scan_type, ScanType::Swipe);
        assert_eq!(info.features, DeviceFeature::CAPTURE);
    }

    #[test]
    fn test_zero_stages_invalid() {
        let config = DeviceConfig::new("/tmp/vfprint.sock").with_enroll_stages(0);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
