//! Position model mirrored from ABS_POS, EL_POS and MARK.

use crate::codec::{self, StepMode, ELECTRICAL_CYCLE};
use crate::platform::Direction;

/// Host copy of the device's position registers.
///
/// Absolute position and mark wrap at 22 bits like the registers do; the
/// electrical position wraps at one electrical cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PositionModel {
    absolute: i32,
    electrical: u16,
    mark: i32,
}

impl PositionModel {
    /// Absolute position in steps.
    #[inline]
    pub fn absolute(&self) -> i32 {
        self.absolute
    }

    /// Electrical position (0..512).
    #[inline]
    pub fn electrical(&self) -> u16 {
        self.electrical
    }

    /// Position mark.
    #[inline]
    pub fn mark(&self) -> i32 {
        self.mark
    }

    /// Absolute position minus the mark, wrapped like the device.
    #[inline]
    pub fn relative(&self) -> i32 {
        codec::wrap_position(self.absolute as i64 - self.mark as i64)
    }

    #[inline]
    pub(crate) fn set_absolute(&mut self, position: i32) {
        self.absolute = position;
    }

    #[inline]
    pub(crate) fn set_electrical(&mut self, position: u16) {
        self.electrical = position % ELECTRICAL_CYCLE;
    }

    #[inline]
    pub(crate) fn set_mark(&mut self, position: i32) {
        self.mark = position;
    }

    /// Apply `pulses` step pulses in `direction`.
    pub(crate) fn advance(&mut self, direction: Direction, pulses: u32, mode: StepMode) {
        if pulses == 0 {
            return;
        }

        let delta = direction.sign() * pulses as i64;
        self.absolute = codec::wrap_position(self.absolute as i64 + delta);

        let cycle = ELECTRICAL_CYCLE as i64;
        let electrical = self.electrical as i64 + delta * mode.electrical_increment() as i64;
        self.electrical = electrical.rem_euclid(cycle) as u16;
    }
}
