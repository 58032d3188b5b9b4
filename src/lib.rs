//! # l6474
//!
//! Driver core for the ST L6474 stepper power stage, built on embedded-hal 1.0.
//!
//! ## Features
//!
//! - **Parameter codec**: phase current, timing and thresholds to register
//!   fields, with saturation reported as a success variant
//! - **State machine**: standby, ready, moving and fault states guard every
//!   command
//! - **Synchronous and asynchronous stepping**: block until the pulses are
//!   out, or arm a step clock and apply its notifications
//! - **Selectable locking**: `NoopRawMutex` for single-context use,
//!   `CriticalSectionRawMutex` when shared
//! - **no_std compatible**: core library works without standard library
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use l6474::{BaseParameters, DriverConfig, L6474, Platform, SpiRegisterIo};
//!
//! let mut io = SpiRegisterIo::new(spi_device);
//! let platform = Platform::new(&mut io, &mut delay)
//!     .with_standby(&mut stby_pin)
//!     .with_step_clock(&mut step_clock);
//!
//! let driver = L6474::new(platform, DriverConfig::default());
//! driver.initialize(&BaseParameters::default())?;
//! driver.set_power_outputs(true)?;
//! driver.step_incremental(200)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): Enables file I/O and TOML parsing
//! - `alloc`: Enables heap allocation for no_std with allocator
//! - `defmt`: Derives `defmt::Format` on public enums

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow large error types - necessary for no_std with heapless strings
#![allow(clippy::result_large_err)]

#[cfg(feature = "alloc")]
extern crate alloc;

// Core modules
pub mod codec;
pub mod config;
pub mod driver;
pub mod error;
pub mod platform;
pub mod register;
pub mod status;

// Re-exports for ergonomic API
pub use codec::{Encoded, FastDecay, OcdThreshold, StepMode};
pub use config::{validate_config, BaseParameters, DeviceConfig, DriverConfig, Stepping, StopPolicy, SystemConfig};
pub use driver::{DriverState, Drivers, Handle, StepEvent, StepEvents, StepOutcome, L6474};
pub use error::{Error, Result};
pub use platform::{Direction, PinStepClock, Platform, RegisterIo, SpiRegisterIo, StepClock, StepTicket};
pub use register::{Command, Property, Register};
pub use status::{AlarmMask, Status};

// Configuration loading (std only)
#[cfg(feature = "std")]
pub use config::{load_config, parse_config};

// Unit types
pub use config::units::{Microseconds, Milliamps};
