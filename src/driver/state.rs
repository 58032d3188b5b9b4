//! Driver operating states.

/// Operating state of one driver instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverState {
    /// Created, `initialize` not yet run.
    #[default]
    Uninitialized,
    /// Registers configured, bridges in high impedance.
    Standby,
    /// Bridges enabled, no move in progress.
    Ready,
    /// Pulses are being issued.
    Moving,
    /// An enabled alarm was detected; only `reset_standby` leaves this state.
    Fault,
    /// `initialize` failed part way; the instance must be destroyed.
    FaultedInit,
}

impl DriverState {
    /// Get the state name as a static string.
    pub const fn name(self) -> &'static str {
        match self {
            DriverState::Uninitialized => "Uninitialized",
            DriverState::Standby => "Standby",
            DriverState::Ready => "Ready",
            DriverState::Moving => "Moving",
            DriverState::Fault => "Fault",
            DriverState::FaultedInit => "FaultedInit",
        }
    }

    /// Check if `initialize` completed.
    #[inline]
    pub const fn is_initialized(self) -> bool {
        !matches!(self, DriverState::Uninitialized | DriverState::FaultedInit)
    }

    /// Check if the power bridges are commanded on.
    #[inline]
    pub const fn outputs_enabled(self) -> bool {
        matches!(self, DriverState::Ready | DriverState::Moving)
    }

    /// States an unmasked alarm moves to `Fault`.
    #[inline]
    pub(crate) const fn watches_alarms(self) -> bool {
        matches!(self, DriverState::Standby | DriverState::Ready | DriverState::Moving)
    }
}
