//! STATUS register snapshot and alarm enable mask.

use core::ops::{BitAnd, BitOr, Not};

use serde::Deserialize;

const HIGHZ: u16 = 1 << 0;
const DIRECTION: u16 = 1 << 4;
const NOTPERF_CMD: u16 = 1 << 7;
const WRONG_CMD: u16 = 1 << 8;
const UVLO_N: u16 = 1 << 9;
const TH_WRN_N: u16 = 1 << 10;
const TH_SD_N: u16 = 1 << 11;
const OCD_N: u16 = 1 << 12;

/// Alarm flags are active low on the device; this is the quiescent pattern.
const ACTIVE_LOW: u16 = UVLO_N | TH_WRN_N | TH_SD_N | OCD_N;

/// Snapshot of the 16-bit STATUS register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status {
    raw: u16,
}

impl Status {
    /// Status of a healthy, disabled device.
    pub const IDLE: Status = Status {
        raw: ACTIVE_LOW | HIGHZ,
    };

    /// Wrap a raw register value.
    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self { raw }
    }

    /// Raw register value.
    #[inline]
    pub const fn raw(&self) -> u16 {
        self.raw
    }

    /// Bridges are in high impedance.
    #[inline]
    pub fn high_z(&self) -> bool {
        self.raw & HIGHZ != 0
    }

    /// Direction of the last move (true = forward).
    #[inline]
    pub fn forward(&self) -> bool {
        self.raw & DIRECTION != 0
    }

    /// Last command could not be performed.
    #[inline]
    pub fn not_performed(&self) -> bool {
        self.raw & NOTPERF_CMD != 0
    }

    /// Last command does not exist.
    #[inline]
    pub fn wrong_command(&self) -> bool {
        self.raw & WRONG_CMD != 0
    }

    /// Either command flag is set.
    #[inline]
    pub fn command_rejected(&self) -> bool {
        self.not_performed() || self.wrong_command()
    }

    /// Supply undervoltage lockout.
    #[inline]
    pub fn undervoltage(&self) -> bool {
        self.raw & UVLO_N == 0
    }

    /// Thermal warning.
    #[inline]
    pub fn thermal_warning(&self) -> bool {
        self.raw & TH_WRN_N == 0
    }

    /// Thermal shutdown.
    #[inline]
    pub fn thermal_shutdown(&self) -> bool {
        self.raw & TH_SD_N == 0
    }

    /// Over-current detected.
    #[inline]
    pub fn overcurrent(&self) -> bool {
        self.raw & OCD_N == 0
    }

    /// Alarm conditions currently latched, in ALARM_EN bit layout.
    pub fn alarms(&self) -> AlarmMask {
        let mut mask = AlarmMask::NONE;
        if self.overcurrent() {
            mask = mask | AlarmMask::OVERCURRENT;
        }
        if self.thermal_shutdown() {
            mask = mask | AlarmMask::THERMAL_SHUTDOWN;
        }
        if self.thermal_warning() {
            mask = mask | AlarmMask::THERMAL_WARNING;
        }
        if self.undervoltage() {
            mask = mask | AlarmMask::UNDERVOLTAGE;
        }
        if self.command_rejected() {
            mask = mask | AlarmMask::COMMAND_ERROR;
        }
        mask
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::IDLE
    }
}

/// Alarm enable bits (ALARM_EN register layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(transparent)]
pub struct AlarmMask(u8);

impl AlarmMask {
    /// No alarms.
    pub const NONE: Self = Self(0);
    /// Over-current.
    pub const OVERCURRENT: Self = Self(1 << 0);
    /// Thermal shutdown.
    pub const THERMAL_SHUTDOWN: Self = Self(1 << 1);
    /// Thermal warning.
    pub const THERMAL_WARNING: Self = Self(1 << 2);
    /// Undervoltage.
    pub const UNDERVOLTAGE: Self = Self(1 << 3);
    /// Wrong or non-performable command.
    pub const COMMAND_ERROR: Self = Self(1 << 7);
    /// Every bit of the register.
    pub const ALL: Self = Self(0xFF);

    /// Create from raw register bits.
    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw register bits.
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Check if no bit is set.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Check if every bit of `other` is set.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for AlarmMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl BitOr for AlarmMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd for AlarmMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl Not for AlarmMask {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self(!self.0)
    }
}
