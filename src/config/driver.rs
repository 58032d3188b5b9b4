//! Per-instance driver behavior.

use serde::Deserialize;

use crate::status::AlarmMask;

/// How `step_incremental` generates pulses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "snake_case")]
pub enum Stepping {
    /// Block the caller until the pulses are out or a fault/stop ends the move.
    #[default]
    Synchronous,
    /// Arm the step clock and return; completion arrives as notifications.
    Asynchronous,
}

/// How the position model is settled after a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "snake_case")]
pub enum StopPolicy {
    /// Re-read ABS_POS from the device; exact whenever the device counted
    /// every pulse that left the step clock.
    #[default]
    Resync,
    /// Trust the pulse count reported by the step clock (or the last
    /// notification when the clock cannot tell).
    Counted,
}

/// Driver instance configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DriverConfig {
    /// Pulse generation mode.
    #[serde(default)]
    pub stepping: Stepping,

    /// Pulses issued per synchronous chunk; status is polled between chunks.
    ///
    /// The instance lock is held while a chunk is issued. With a bit-banged
    /// clock such as `PinStepClock` under `L6474::new_locked`, that is a
    /// critical section of `chunk_pulses` pulse periods (64 ms at the default
    /// and 1 kHz); use a few pulses per chunk there.
    #[serde(default = "default_chunk_pulses")]
    pub chunk_pulses: u32,

    /// Clear OC_SD so an over-current does not shut the bridges down.
    #[serde(default)]
    pub disable_overcurrent_shutdown: bool,

    /// Alarms latched and reported after initialization.
    #[serde(default)]
    pub alarm_enables: AlarmMask,

    /// Position settling after a stop.
    #[serde(default)]
    pub stop_policy: StopPolicy,
}

fn default_chunk_pulses() -> u32 {
    64
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            stepping: Stepping::default(),
            chunk_pulses: default_chunk_pulses(),
            disable_overcurrent_shutdown: false,
            alarm_enables: AlarmMask::default(),
            stop_policy: StopPolicy::default(),
        }
    }
}

impl DriverConfig {
    /// Configuration for asynchronous stepping with defaults otherwise.
    pub fn asynchronous() -> Self {
        Self {
            stepping: Stepping::Asynchronous,
            ..Self::default()
        }
    }

    /// Set the synchronous chunk size.
    pub fn with_chunk_pulses(mut self, pulses: u32) -> Self {
        self.chunk_pulses = pulses;
        self
    }

    /// Set the stop policy.
    pub fn with_stop_policy(mut self, policy: StopPolicy) -> Self {
        self.stop_policy = policy;
        self
    }

    /// Set the alarm enables written at initialization.
    pub fn with_alarm_enables(mut self, mask: AlarmMask) -> Self {
        self.alarm_enables = mask;
        self
    }

    /// CONFIG register value written at initialization.
    ///
    /// Starts from the reset value 0x2E88 with the clock selection bits
    /// cleared (internal oscillator, no clock output).
    pub fn config_register(&self) -> u32 {
        const RESET_VALUE: u32 = 0x2E88;
        const OSC_SEL_MASK: u32 = 0x000F;
        const OC_SD: u32 = 1 << 7;

        let mut value = RESET_VALUE & !OSC_SEL_MASK;
        if self.disable_overcurrent_shutdown {
            value &= !OC_SD;
        }
        value
    }
}
