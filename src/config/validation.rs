//! Configuration validation.

use crate::error::{ConfigError, Error, Result};

use super::{DeviceConfig, SystemConfig};

/// Validate a system configuration.
///
/// Checks:
/// - Synchronous chunk size is positive
/// - Every base parameter set encodes (finite, non-negative values)
///
/// Parameters that merely saturate are accepted and logged.
pub fn validate_config(config: &SystemConfig) -> Result<()> {
    for (name, device) in config.devices.iter() {
        validate_device(name.as_str(), device)?;
    }

    Ok(())
}

fn validate_device(name: &str, device: &DeviceConfig) -> Result<()> {
    if device.driver.chunk_pulses == 0 {
        return Err(Error::Config(ConfigError::InvalidChunkSize(
            device.driver.chunk_pulses,
        )));
    }

    match device.parameters.encode() {
        Ok(encoded) => {
            if encoded.is_clamped() {
                log::warn!("device '{}': base parameters saturated at register limits", name);
            }
            Ok(())
        }
        Err(error) => Err(Error::Config(ConfigError::InvalidParameter {
            device: heapless::String::try_from(name).unwrap_or_default(),
            error,
        })),
    }
}
