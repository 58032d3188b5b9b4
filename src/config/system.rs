//! System configuration - root configuration structure.

use heapless::{FnvIndexMap, String};
use serde::Deserialize;

use super::driver::DriverConfig;
use super::parameters::BaseParameters;

/// One L6474 on the board.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Human-readable name (max 32 chars).
    pub name: String<32>,

    /// Driver behavior.
    #[serde(default)]
    pub driver: DriverConfig,

    /// Base parameters written by `initialize`.
    #[serde(default)]
    pub parameters: BaseParameters,
}

/// Root configuration structure from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    /// Named device configurations.
    #[serde(default)]
    pub devices: FnvIndexMap<String<32>, DeviceConfig, 8>,
}

impl SystemConfig {
    /// Get a device configuration by name.
    pub fn device(&self, name: &str) -> Option<&DeviceConfig> {
        self.devices
            .iter()
            .find(|(k, _)| k.as_str() == name)
            .map(|(_, v)| v)
    }

    /// List all device names.
    pub fn device_names(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(|s| s.as_str())
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            devices: FnvIndexMap::new(),
        }
    }
}
