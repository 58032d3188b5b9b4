//! Platform capabilities consumed by the driver.
//!
//! The driver never touches hardware itself. Register access, the standby
//! line, the step-clock source and sleeps are supplied by the caller as
//! borrowed capabilities bundled in a [`Platform`]:
//!
//! - [`RegisterIo`]: mandatory register/command transport
//! - `DelayNs`: mandatory sleeps (reset pulse, power-up settle)
//! - `OutputPin` standby line: optional, high = active, low = standby
//! - [`StepClock`]: optional step pulse source
//!
//! Optional capabilities are checked when an operation first needs them.

mod pin_clock;
mod spi;

use core::convert::Infallible;
use core::fmt::Debug;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};

use crate::register::{Command, Register};

pub use pin_clock::PinStepClock;
pub use spi::SpiRegisterIo;

/// Register and command transport to one L6474.
pub trait RegisterIo {
    /// Transport error.
    type Error: Debug;

    /// Read a register (GET_PARAM). Returns the payload right-aligned.
    fn read_register(&mut self, register: Register) -> Result<u32, Self::Error>;

    /// Write a register (SET_PARAM). `value` is already range-checked.
    fn write_register(&mut self, register: Register, value: u32) -> Result<(), Self::Error>;

    /// Send an application command. Returns the response payload, zero for
    /// commands without one.
    fn command(&mut self, command: Command) -> Result<u16, Self::Error>;
}

/// Direction of travel, the value of the DIR input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Positive step count, ABS_POS increments.
    Forward,
    /// Negative step count, ABS_POS decrements.
    Reverse,
}

impl Direction {
    /// Get direction from signed step count.
    #[inline]
    pub fn from_steps(steps: i64) -> Self {
        if steps >= 0 {
            Direction::Forward
        } else {
            Direction::Reverse
        }
    }

    /// Get the sign multiplier.
    #[inline]
    pub fn sign(self) -> i64 {
        match self {
            Direction::Forward => 1,
            Direction::Reverse => -1,
        }
    }
}

/// Identifies one armed pulse train.
///
/// Notifications carrying a ticket other than the pending one are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StepTicket(u32);

impl StepTicket {
    /// Wrap a raw ticket value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw ticket value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Step pulse source.
///
/// A synchronous driver expects `arm` to block until every pulse is out. An
/// asynchronous driver expects `arm` to return at once and the source to
/// report progress through `StepEvents` or `L6474::notify`.
pub trait StepClock {
    /// Clock error.
    type Error: Debug;

    /// Set the direction and emit `pulses` step pulses.
    fn arm(&mut self, direction: Direction, pulses: u32, ticket: StepTicket) -> Result<(), Self::Error>;

    /// Stop emitting pulses.
    ///
    /// Returns the number of pulses emitted for the current ticket when the
    /// source knows it exactly, `None` otherwise.
    fn cancel(&mut self) -> Result<Option<u32>, Self::Error>;
}

/// Placeholder for a platform without a standby line.
#[derive(Debug)]
pub enum NoStandby {}

impl ErrorType for NoStandby {
    type Error = Infallible;
}

impl OutputPin for NoStandby {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        match *self {}
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        match *self {}
    }
}

/// Placeholder for a platform without a step clock.
#[derive(Debug)]
pub enum NoStepClock {}

impl StepClock for NoStepClock {
    type Error = Infallible;

    fn arm(&mut self, _: Direction, _: u32, _: StepTicket) -> Result<(), Self::Error> {
        match *self {}
    }

    fn cancel(&mut self) -> Result<Option<u32>, Self::Error> {
        match *self {}
    }
}

/// Capabilities borrowed by one driver instance.
///
/// # Example
///
/// ```rust,ignore
/// let platform = Platform::new(&mut spi_io, &mut delay)
///     .with_standby(&mut stby_pin)
///     .with_step_clock(&mut step_clock);
/// ```
pub struct Platform<'a, IO, DELAY, STBY = NoStandby, CLK = NoStepClock>
where
    IO: RegisterIo,
    DELAY: DelayNs,
    STBY: OutputPin,
    CLK: StepClock,
{
    pub(crate) io: &'a mut IO,
    pub(crate) delay: &'a mut DELAY,
    pub(crate) standby: Option<&'a mut STBY>,
    pub(crate) clock: Option<&'a mut CLK>,
}

impl<'a, IO, DELAY> Platform<'a, IO, DELAY>
where
    IO: RegisterIo,
    DELAY: DelayNs,
{
    /// Create a platform with only the mandatory capabilities.
    pub fn new(io: &'a mut IO, delay: &'a mut DELAY) -> Self {
        Self {
            io,
            delay,
            standby: None,
            clock: None,
        }
    }
}

impl<'a, IO, DELAY, STBY, CLK> Platform<'a, IO, DELAY, STBY, CLK>
where
    IO: RegisterIo,
    DELAY: DelayNs,
    STBY: OutputPin,
    CLK: StepClock,
{
    /// Attach the standby/reset output.
    pub fn with_standby<S: OutputPin>(self, pin: &'a mut S) -> Platform<'a, IO, DELAY, S, CLK> {
        Platform {
            io: self.io,
            delay: self.delay,
            standby: Some(pin),
            clock: self.clock,
        }
    }

    /// Attach the step-clock source.
    pub fn with_step_clock<C: StepClock>(self, clock: &'a mut C) -> Platform<'a, IO, DELAY, STBY, C> {
        Platform {
            io: self.io,
            delay: self.delay,
            standby: self.standby,
            clock: Some(clock),
        }
    }

    /// Check if a standby line is attached.
    #[inline]
    pub fn has_standby(&self) -> bool {
        self.standby.is_some()
    }

    /// Check if a step clock is attached.
    #[inline]
    pub fn has_step_clock(&self) -> bool {
        self.clock.is_some()
    }
}
