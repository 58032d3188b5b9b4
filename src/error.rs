//! Error types for the l6474 driver.
//!
//! Provides unified error handling across parameter encoding, the driver state
//! machine, platform I/O and configuration.

use core::fmt;

use crate::driver::DriverState;
use crate::register::Property;
use crate::status::AlarmMask;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all driver operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A value is outside the domain of the field it is written to
    Param(ParamError),
    /// The driver state machine rejected the operation
    Driver(DriverError),
    /// A platform transport failed
    Io(IoError),
    /// Configuration parsing or validation error
    Config(ConfigError),
}

/// Parameter errors (values outside a register field's domain).
#[derive(Debug, Clone, PartialEq)]
pub enum ParamError {
    /// Integer value exceeds the field's maximum
    OutOfRange {
        /// Field name
        field: &'static str,
        /// Rejected value
        value: i64,
        /// Smallest accepted value
        min: i64,
        /// Largest accepted value
        max: i64,
    },
    /// Physical value is NaN, infinite or negative
    NotFinite(&'static str),
    /// Over-current threshold not supported by the hardware (mA)
    UnsupportedThreshold(u16),
    /// Unknown step mode code
    InvalidStepMode(u8),
    /// Property cannot be written
    ReadOnly(Property),
}

/// Which optional platform capability was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Capability {
    /// Standby / reset output pin
    Standby,
    /// Step-clock source
    StepClock,
}

/// Driver state machine errors.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverError {
    /// Operation requires `initialize` to have completed
    NotInitialized,
    /// Operation is not allowed in the current state
    InvalidState(DriverState),
    /// A move is already in progress
    Busy,
    /// An enabled alarm is latched on the device
    Fault(AlarmMask),
    /// Required platform capability was not supplied
    CapabilityMissing(Capability),
    /// No free slot for a new instance
    AllocationFailed,
    /// Handle does not refer to a live instance
    InvalidHandle,
    /// Device flagged the last command as wrong or not performed
    CommandRejected {
        /// Raw STATUS register value read after the command
        status: u16,
    },
}

/// Platform transport errors. The core never retries these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IoError {
    /// Register read/write or command transfer failed
    Register,
    /// Standby pin operation failed
    Standby,
    /// Step-clock arm or cancel failed
    StepClock,
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    ParseError(heapless::String<128>),
    /// Device name not found in configuration
    DeviceNotFound(heapless::String<32>),
    /// Synchronous chunk size must be at least one pulse
    InvalidChunkSize(u32),
    /// A base parameter of the named device cannot be encoded
    InvalidParameter {
        /// Device name
        device: heapless::String<32>,
        /// Encoding failure
        error: ParamError,
    },
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    IoError(heapless::String<128>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Param(e) => write!(f, "Invalid parameter: {}", e),
            Error::Driver(e) => write!(f, "Driver error: {}", e),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Config(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamError::OutOfRange { field, value, min, max } => {
                write!(f, "{} = {} outside [{}, {}]", field, value, min, max)
            }
            ParamError::NotFinite(field) => write!(f, "{} must be a finite, non-negative value", field),
            ParamError::UnsupportedThreshold(ma) => {
                write!(f, "Unsupported over-current threshold: {} mA. Valid values: 375..=6000 in 375 mA steps", ma)
            }
            ParamError::InvalidStepMode(code) => write!(f, "Invalid step mode code: {:#04x}", code),
            ParamError::ReadOnly(prop) => write!(f, "Property {} is read-only", prop.name()),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Standby => write!(f, "standby pin"),
            Capability::StepClock => write!(f, "step clock"),
        }
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::NotInitialized => write!(f, "Driver not initialized"),
            DriverError::InvalidState(state) => write!(f, "Operation not allowed in state {}", state.name()),
            DriverError::Busy => write!(f, "A move is already in progress"),
            DriverError::Fault(alarms) => write!(f, "Device fault, alarms {:#04x}", alarms.bits()),
            DriverError::CapabilityMissing(cap) => write!(f, "Platform capability missing: {}", cap),
            DriverError::AllocationFailed => write!(f, "No free driver slot"),
            DriverError::InvalidHandle => write!(f, "Handle does not refer to a live driver"),
            DriverError::CommandRejected { status } => {
                write!(f, "Device rejected command, STATUS {:#06x}", status)
            }
        }
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoError::Register => write!(f, "register transfer failed"),
            IoError::Standby => write!(f, "standby pin operation failed"),
            IoError::StepClock => write!(f, "step clock operation failed"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::DeviceNotFound(name) => write!(f, "Device '{}' not found", name),
            ConfigError::InvalidChunkSize(v) => write!(f, "Invalid chunk size: {}. Must be > 0", v),
            ConfigError::InvalidParameter { device, error } => {
                write!(f, "Device '{}': {}", device, error)
            }
            #[cfg(feature = "std")]
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

// Conversion impls
impl From<ParamError> for Error {
    fn from(e: ParamError) -> Self {
        Error::Param(e)
    }
}

impl From<DriverError> for Error {
    fn from(e: DriverError) -> Self {
        Error::Driver(e)
    }
}

impl From<IoError> for Error {
    fn from(e: IoError) -> Self {
        Error::Io(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ParamError {}

#[cfg(feature = "std")]
impl std::error::Error for DriverError {}

#[cfg(feature = "std")]
impl std::error::Error for IoError {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}
