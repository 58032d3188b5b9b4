//! Configuration module for the l6474 driver.
//!
//! Provides types for loading and validating device configurations from
//! TOML files (with `std` feature) or pre-parsed data.

mod driver;
mod parameters;
mod system;
pub mod units;
#[cfg(feature = "std")]
mod loader;
mod validation;

pub use driver::{DriverConfig, Stepping, StopPolicy};
pub use parameters::{BaseParameters, EncodedParameters};
pub use system::{DeviceConfig, SystemConfig};
pub use validation::validate_config;

#[cfg(feature = "std")]
pub use loader::{load_config, parse_config};

// Re-export unit types at config level
pub use units::{Microseconds, Milliamps};
