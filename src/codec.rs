//! Conversions between physical values and register fields.
//!
//! All functions here are pure. Continuous inputs are discretized to the
//! nearest register step with ties going to the higher value; inputs beyond
//! the field's range saturate and come back as [`Encoded::Clamped`].

use serde::Deserialize;

use crate::config::units::{Microseconds, Milliamps};
use crate::error::ParamError;

/// Result of encoding a physical value into a register field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoded<T> {
    /// Value was inside the field's range (rounded to the nearest step).
    Exact(T),
    /// Value was outside the field's range and saturated at the limit.
    Clamped(T),
}

impl<T> Encoded<T> {
    /// Get the encoded value regardless of clamping.
    #[inline]
    pub fn value(self) -> T {
        match self {
            Encoded::Exact(v) | Encoded::Clamped(v) => v,
        }
    }

    /// Check if the value was saturated.
    #[inline]
    pub fn is_clamped(&self) -> bool {
        matches!(self, Encoded::Clamped(_))
    }

    /// Transform the value, keeping the clamp indication.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Encoded<U> {
        match self {
            Encoded::Exact(v) => Encoded::Exact(f(v)),
            Encoded::Clamped(v) => Encoded::Clamped(f(v)),
        }
    }

    /// Rewrap a value as clamped if `clamped` is set.
    pub(crate) fn with_clamp(value: T, clamped: bool) -> Self {
        if clamped {
            Encoded::Clamped(value)
        } else {
            Encoded::Exact(value)
        }
    }
}

/// Phase current step (TVAL LSB).
pub const CURRENT_STEP_MA: f32 = 31.25;
/// Largest TVAL code (4 A).
pub const TVAL_MAX: u8 = 0x7F;
/// TON_MIN / TOFF_MIN step.
pub const MIN_TIME_STEP_US: f32 = 0.5;
/// Largest TON_MIN / TOFF_MIN code (64 µs).
pub const MIN_TIME_MAX: u8 = 0x7F;
/// TOFF_FAST / FAST_STEP step.
pub const FAST_TIME_STEP_US: f32 = 2.0;
/// Largest TOFF_FAST / FAST_STEP code (32 µs).
pub const FAST_TIME_MAX: u8 = 0x0F;

/// Smallest absolute position or mark.
pub const POSITION_MIN: i32 = -(1 << 21);
/// Largest absolute position or mark.
pub const POSITION_MAX: i32 = (1 << 21) - 1;
const POSITION_MASK: u32 = 0x3F_FFFF;
const POSITION_SIGN: u32 = 1 << 21;

/// Electrical positions per electrical cycle (4 full steps of 128 microsteps).
pub const ELECTRICAL_CYCLE: u16 = 512;

/// Code n of a field stands for (n + 1) * step.
fn quantize(field: &'static str, value: f32, step: f32, max_code: u8) -> Result<Encoded<u8>, ParamError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ParamError::NotFinite(field));
    }

    // floor(x + 0.5) sends exact halves upward
    let n = libm::floorf(value / step + 0.5);
    if n < 1.0 {
        Ok(Encoded::Clamped(0))
    } else if n > max_code as f32 + 1.0 {
        Ok(Encoded::Clamped(max_code))
    } else {
        Ok(Encoded::Exact(n as u8 - 1))
    }
}

#[inline]
fn dequantize(code: u8, step: f32) -> f32 {
    (code as f32 + 1.0) * step
}

/// Encode a phase current into a TVAL code.
///
/// # Errors
///
/// Returns `ParamError::NotFinite` for NaN, infinite or negative input.
pub fn encode_phase_current(current: Milliamps) -> Result<Encoded<u8>, ParamError> {
    quantize("phase_current", current.0, CURRENT_STEP_MA, TVAL_MAX)
}

/// Decode a TVAL code into a phase current.
#[inline]
pub fn decode_phase_current(code: u8) -> Milliamps {
    Milliamps(dequantize(code & TVAL_MAX, CURRENT_STEP_MA))
}

/// Encode a minimum on/off time into a TON_MIN / TOFF_MIN code.
pub fn encode_min_time(field: &'static str, time: Microseconds) -> Result<Encoded<u8>, ParamError> {
    quantize(field, time.0, MIN_TIME_STEP_US, MIN_TIME_MAX)
}

/// Decode a TON_MIN / TOFF_MIN code.
#[inline]
pub fn decode_min_time(code: u8) -> Microseconds {
    Microseconds(dequantize(code & MIN_TIME_MAX, MIN_TIME_STEP_US))
}

/// Fast decay timing, packed into the T_FAST register.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct FastDecay {
    /// Fast decay off time (TOFF_FAST, high nibble).
    #[serde(rename = "off_time_us")]
    pub off_time: Microseconds,
    /// Fast step time (FAST_STEP, low nibble).
    #[serde(rename = "step_time_us")]
    pub step_time: Microseconds,
}

impl FastDecay {
    /// Encode into the T_FAST byte.
    pub fn encode(&self) -> Result<Encoded<u8>, ParamError> {
        let off = quantize("fast_decay.off_time", self.off_time.0, FAST_TIME_STEP_US, FAST_TIME_MAX)?;
        let step = quantize("fast_decay.step_time", self.step_time.0, FAST_TIME_STEP_US, FAST_TIME_MAX)?;
        let clamped = off.is_clamped() || step.is_clamped();
        Ok(Encoded::with_clamp((off.value() << 4) | step.value(), clamped))
    }

    /// Decode a T_FAST byte.
    pub fn decode(raw: u8) -> Self {
        Self {
            off_time: Microseconds(dequantize(raw >> 4, FAST_TIME_STEP_US)),
            step_time: Microseconds(dequantize(raw & FAST_TIME_MAX, FAST_TIME_STEP_US)),
        }
    }
}

impl Default for FastDecay {
    /// T_FAST = 0x14.
    fn default() -> Self {
        Self::decode(0x14)
    }
}

/// Over-current detection thresholds supported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OcdThreshold {
    /// 375 mA
    Ma375 = 0x00,
    /// 750 mA
    Ma750 = 0x01,
    /// 1125 mA
    Ma1125 = 0x02,
    /// 1500 mA
    Ma1500 = 0x03,
    /// 1875 mA
    Ma1875 = 0x04,
    /// 2250 mA
    Ma2250 = 0x05,
    /// 2625 mA
    Ma2625 = 0x06,
    /// 3000 mA
    Ma3000 = 0x07,
    /// 3375 mA
    Ma3375 = 0x08,
    /// 3750 mA
    Ma3750 = 0x09,
    /// 4125 mA
    Ma4125 = 0x0A,
    /// 4500 mA
    Ma4500 = 0x0B,
    /// 4875 mA
    Ma4875 = 0x0C,
    /// 5250 mA
    Ma5250 = 0x0D,
    /// 5625 mA
    Ma5625 = 0x0E,
    /// 6000 mA
    Ma6000 = 0x0F,
}

impl OcdThreshold {
    /// All thresholds in register order.
    pub const ALL: [OcdThreshold; 16] = [
        OcdThreshold::Ma375,
        OcdThreshold::Ma750,
        OcdThreshold::Ma1125,
        OcdThreshold::Ma1500,
        OcdThreshold::Ma1875,
        OcdThreshold::Ma2250,
        OcdThreshold::Ma2625,
        OcdThreshold::Ma3000,
        OcdThreshold::Ma3375,
        OcdThreshold::Ma3750,
        OcdThreshold::Ma4125,
        OcdThreshold::Ma4500,
        OcdThreshold::Ma4875,
        OcdThreshold::Ma5250,
        OcdThreshold::Ma5625,
        OcdThreshold::Ma6000,
    ];

    /// Register code.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Threshold in milliamps.
    #[inline]
    pub const fn milliamps(self) -> u16 {
        (self as u16 + 1) * 375
    }

    /// Look up the threshold for an exact milliamp value.
    ///
    /// # Errors
    ///
    /// Returns `ParamError::UnsupportedThreshold` for values the hardware does not offer.
    pub fn from_milliamps(ma: u16) -> Result<Self, ParamError> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.milliamps() == ma)
            .ok_or(ParamError::UnsupportedThreshold(ma))
    }

    /// Decode a register code.
    pub fn from_code(code: u8) -> Result<Self, ParamError> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or(ParamError::OutOfRange {
                field: "ocd_threshold",
                value: code as i64,
                min: 0,
                max: 0x0F,
            })
    }
}

impl Default for OcdThreshold {
    fn default() -> Self {
        OcdThreshold::Ma1500
    }
}

impl TryFrom<u16> for OcdThreshold {
    type Error = ParamError;

    fn try_from(ma: u16) -> Result<Self, Self::Error> {
        Self::from_milliamps(ma)
    }
}

impl<'de> Deserialize<'de> for OcdThreshold {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use core::fmt::Write;
        let ma = u16::deserialize(deserializer)?;
        OcdThreshold::from_milliamps(ma).map_err(|e| {
            let mut buf = heapless::String::<128>::new();
            let _ = write!(buf, "{}", e);
            serde::de::Error::custom(buf.as_str())
        })
    }
}

/// Microstepping resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum StepMode {
    /// Full step
    Full = 0x00,
    /// Half step
    Half = 0x01,
    /// 1/4 microstep
    Micro4 = 0x02,
    /// 1/8 microstep
    Micro8 = 0x03,
    /// 1/16 microstep
    #[default]
    Micro16 = 0x04,
}

/// Bit 3 of STEP_MODE must be written as one.
const STEP_MODE_FIXED_BIT: u8 = 1 << 3;
const STEP_SEL_MASK: u8 = 0x07;

impl StepMode {
    /// Value written to the STEP_MODE register.
    #[inline]
    pub const fn register_value(self) -> u8 {
        self as u8 | STEP_MODE_FIXED_BIT
    }

    /// Decode the STEP_MODE register. STEP_SEL values 4..=7 all select 1/16.
    pub fn from_register(raw: u32) -> Self {
        match raw as u8 & STEP_SEL_MASK {
            0 => StepMode::Full,
            1 => StepMode::Half,
            2 => StepMode::Micro4,
            3 => StepMode::Micro8,
            _ => StepMode::Micro16,
        }
    }

    /// Microsteps per full step.
    #[inline]
    pub const fn microsteps(self) -> u16 {
        1 << self as u8
    }

    /// EL_POS increment produced by one step pulse.
    #[inline]
    pub const fn electrical_increment(self) -> u16 {
        128 >> self as u8
    }
}

impl TryFrom<u8> for StepMode {
    type Error = ParamError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(StepMode::Full),
            1 => Ok(StepMode::Half),
            2 => Ok(StepMode::Micro4),
            3 => Ok(StepMode::Micro8),
            4 => Ok(StepMode::Micro16),
            _ => Err(ParamError::InvalidStepMode(code)),
        }
    }
}

/// Encode a signed position into the 22-bit ABS_POS / MARK field.
pub fn encode_position(field: &'static str, position: i32) -> Result<u32, ParamError> {
    if !(POSITION_MIN..=POSITION_MAX).contains(&position) {
        return Err(ParamError::OutOfRange {
            field,
            value: position as i64,
            min: POSITION_MIN as i64,
            max: POSITION_MAX as i64,
        });
    }
    Ok(position as u32 & POSITION_MASK)
}

/// Decode a 22-bit two's complement ABS_POS / MARK value.
#[inline]
pub fn decode_position(raw: u32) -> i32 {
    let raw = raw & POSITION_MASK;
    if raw & POSITION_SIGN != 0 {
        (raw | !POSITION_MASK) as i32
    } else {
        raw as i32
    }
}

/// Wrap an arbitrary step count into the device's 22-bit position range.
#[inline]
pub fn wrap_position(position: i64) -> i32 {
    decode_position(position as u32)
}

/// Validate an EL_POS value.
pub fn encode_electrical_position(position: u16) -> Result<u32, ParamError> {
    if position >= ELECTRICAL_CYCLE {
        return Err(ParamError::OutOfRange {
            field: "electrical_position",
            value: position as i64,
            min: 0,
            max: (ELECTRICAL_CYCLE - 1) as i64,
        });
    }
    Ok(position as u32)
}
