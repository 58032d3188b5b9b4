//! Blocking step clock driven by STEP/DIR pins.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{Error as _, ErrorKind, OutputPin};

use super::{Direction, StepClock, StepTicket};

/// Bit-banged [`StepClock`] for synchronous stepping.
///
/// `arm` returns after the last pulse, so there is never anything to cancel.
pub struct PinStepClock<STEP, DIR, DELAY> {
    step_pin: STEP,
    dir_pin: DIR,
    delay: DELAY,
    /// STEP high time in microseconds (datasheet minimum is 1 µs).
    pulse_width_us: u32,
    /// STEP low time between pulses in microseconds.
    interval_us: u32,
    current_direction: Option<Direction>,
}

impl<STEP, DIR, DELAY> PinStepClock<STEP, DIR, DELAY>
where
    STEP: OutputPin,
    DIR: OutputPin,
    DELAY: DelayNs,
{
    /// Create a step clock with 2 µs pulses at 1 kHz.
    pub fn new(step_pin: STEP, dir_pin: DIR, delay: DELAY) -> Self {
        Self {
            step_pin,
            dir_pin,
            delay,
            pulse_width_us: 2,
            interval_us: 998,
            current_direction: None,
        }
    }

    /// Set the pulse high time and the low time between pulses.
    pub fn with_timing(mut self, pulse_width_us: u32, interval_us: u32) -> Self {
        self.pulse_width_us = pulse_width_us.max(1);
        self.interval_us = interval_us;
        self
    }

    /// Release the pins and the delay provider.
    pub fn release(self) -> (STEP, DIR, DELAY) {
        (self.step_pin, self.dir_pin, self.delay)
    }

    fn set_direction(&mut self, direction: Direction) -> Result<(), ErrorKind> {
        if self.current_direction == Some(direction) {
            return Ok(());
        }

        match direction {
            Direction::Forward => self.dir_pin.set_high(),
            Direction::Reverse => self.dir_pin.set_low(),
        }
        .map_err(|e| e.kind())?;

        self.current_direction = Some(direction);
        Ok(())
    }

    fn pulse(&mut self) -> Result<(), ErrorKind> {
        self.step_pin.set_high().map_err(|e| e.kind())?;
        self.delay.delay_us(self.pulse_width_us);
        self.step_pin.set_low().map_err(|e| e.kind())?;
        if self.interval_us > 0 {
            self.delay.delay_us(self.interval_us);
        }
        Ok(())
    }
}

impl<STEP, DIR, DELAY> StepClock for PinStepClock<STEP, DIR, DELAY>
where
    STEP: OutputPin,
    DIR: OutputPin,
    DELAY: DelayNs,
{
    type Error = ErrorKind;

    fn arm(&mut self, direction: Direction, pulses: u32, _ticket: StepTicket) -> Result<(), Self::Error> {
        self.set_direction(direction)?;
        for _ in 0..pulses {
            self.pulse()?;
        }
        Ok(())
    }

    fn cancel(&mut self) -> Result<Option<u32>, Self::Error> {
        Ok(None)
    }
}
