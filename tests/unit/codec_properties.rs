//! Property tests for the register codecs.

use l6474::codec::{self, POSITION_MAX, POSITION_MIN};
use l6474::{Microseconds, Milliamps, StepMode};
use proptest::prelude::*;

proptest! {
    /// A decoded TVAL code encodes back to itself.
    #[test]
    fn phase_current_code_is_stable(code in 0u8..=0x7F) {
        let current = codec::decode_phase_current(code);
        let encoded = codec::encode_phase_current(current).unwrap();
        prop_assert!(!encoded.is_clamped());
        prop_assert_eq!(encoded.value(), code);
    }

    /// Encoding picks the nearest representable current.
    #[test]
    fn phase_current_rounds_to_nearest(ma in 31.25f32..4000.0) {
        let encoded = codec::encode_phase_current(Milliamps(ma)).unwrap();
        let applied = codec::decode_phase_current(encoded.value());
        prop_assert!((applied.0 - ma).abs() <= codec::CURRENT_STEP_MA / 2.0 + 0.01);
    }

    /// Anything above the field saturates at the top code.
    #[test]
    fn min_time_saturates(us in 64.5f32..10_000.0) {
        let encoded = codec::encode_min_time("on_time", Microseconds(us)).unwrap();
        prop_assert!(encoded.is_clamped());
        prop_assert_eq!(encoded.value(), codec::MIN_TIME_MAX);
    }

    /// A decoded TON_MIN/TOFF_MIN code encodes back to itself.
    #[test]
    fn min_time_code_is_stable(code in 0u8..=0x7F) {
        let time = codec::decode_min_time(code);
        prop_assert_eq!(codec::encode_min_time("off_time", time).unwrap().value(), code);
    }

    /// Every position in range survives the 22-bit field.
    #[test]
    fn position_field_is_lossless(position in POSITION_MIN..=POSITION_MAX) {
        let raw = codec::encode_position("absolute_position", position).unwrap();
        prop_assert!(raw <= 0x3F_FFFF);
        prop_assert_eq!(codec::decode_position(raw), position);
    }

    /// Positions outside the field are rejected, never wrapped.
    #[test]
    fn position_out_of_range_rejected(position in (POSITION_MAX + 1)..i32::MAX) {
        prop_assert!(codec::encode_position("mark", position).is_err());
        prop_assert!(codec::encode_position("mark", -position - 1).is_err());
    }

    /// Wrapping matches the device's modular counter.
    #[test]
    fn wrap_is_modular(position in any::<i32>(), delta in -100_000i64..100_000) {
        let wrapped = codec::wrap_position(position as i64 + delta);
        let period = 1i64 << 22;
        prop_assert_eq!((wrapped as i64 - (position as i64 + delta)).rem_euclid(period), 0);
        prop_assert!((POSITION_MIN..=POSITION_MAX).contains(&wrapped));
    }

    /// STEP_MODE always decodes to the mode that was written.
    #[test]
    fn step_mode_register_round_trip(code in 0u8..=4) {
        let mode = StepMode::try_from(code).unwrap();
        prop_assert_eq!(StepMode::from_register(mode.register_value() as u32), mode);
        prop_assert_eq!(mode.electrical_increment() * mode.microsteps(), 128);
    }
}
