//! Base parameter set applied at initialization.

use serde::Deserialize;

use crate::codec::{self, Encoded, FastDecay, OcdThreshold, StepMode};
use crate::error::ParamError;

use super::units::{Microseconds, Milliamps};

/// Physical configuration written to the device by `initialize`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BaseParameters {
    /// Phase current reference.
    #[serde(rename = "phase_current_ma", default = "default_phase_current")]
    pub phase_current: Milliamps,

    /// Over-current detection threshold.
    #[serde(rename = "ocd_threshold_ma", default)]
    pub ocd_threshold: OcdThreshold,

    /// Step mode after initialization.
    #[serde(default)]
    pub step_mode: StepMode,

    /// Minimum on time.
    #[serde(rename = "on_time_us", default = "default_min_time")]
    pub on_time: Microseconds,

    /// Minimum off time.
    #[serde(rename = "off_time_us", default = "default_min_time")]
    pub off_time: Microseconds,

    /// Fast decay timing.
    #[serde(default)]
    pub fast_decay: FastDecay,
}

fn default_phase_current() -> Milliamps {
    codec::decode_phase_current(0x26)
}

fn default_min_time() -> Microseconds {
    codec::decode_min_time(0x29)
}

impl Default for BaseParameters {
    fn default() -> Self {
        Self {
            phase_current: default_phase_current(),
            ocd_threshold: OcdThreshold::default(),
            step_mode: StepMode::default(),
            on_time: default_min_time(),
            off_time: default_min_time(),
            fast_decay: FastDecay::default(),
        }
    }
}

/// Register codes derived from a [`BaseParameters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedParameters {
    /// OCD_TH
    pub ocd_th: u8,
    /// TVAL
    pub tval: u8,
    /// TON_MIN
    pub ton_min: u8,
    /// TOFF_MIN
    pub toff_min: u8,
    /// T_FAST
    pub t_fast: u8,
    /// STEP_MODE
    pub step_mode: u8,
}

impl BaseParameters {
    /// Create parameters with a phase current, threshold and step mode and
    /// default timing.
    pub fn new(phase_current: Milliamps, ocd_threshold: OcdThreshold, step_mode: StepMode) -> Self {
        Self {
            phase_current,
            ocd_threshold,
            step_mode,
            ..Self::default()
        }
    }

    /// Encode every field.
    ///
    /// Returns `Encoded::Clamped` if any field saturated.
    ///
    /// # Errors
    ///
    /// Returns a `ParamError` if a value is not finite or negative.
    pub fn encode(&self) -> Result<Encoded<EncodedParameters>, ParamError> {
        let tval = codec::encode_phase_current(self.phase_current)?;
        let ton = codec::encode_min_time("on_time", self.on_time)?;
        let toff = codec::encode_min_time("off_time", self.off_time)?;
        let fast = self.fast_decay.encode()?;

        let clamped = tval.is_clamped() || ton.is_clamped() || toff.is_clamped() || fast.is_clamped();

        Ok(Encoded::with_clamp(
            EncodedParameters {
                ocd_th: self.ocd_threshold.code(),
                tval: tval.value(),
                ton_min: ton.value(),
                toff_min: toff.value(),
                t_fast: fast.value(),
                step_mode: self.step_mode.register_value(),
            },
            clamped,
        ))
    }
}
