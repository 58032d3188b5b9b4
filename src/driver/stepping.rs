//! Step generator types and the asynchronous notification channel.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;

use crate::platform::StepTicket;

/// Notifications buffered per instance.
pub const STEP_EVENT_CAPACITY: usize = 8;

/// Progress report from an asynchronous step clock.
///
/// Counts are cumulative for the ticket, so a lost `Progress` is superseded by
/// the next event. `Complete` must be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepEvent {
    /// `emitted` pulses are out so far.
    Progress {
        /// Move the pulses belong to
        ticket: StepTicket,
        /// Pulses emitted since `arm`
        emitted: u32,
    },
    /// The pulse train ended after `emitted` pulses.
    Complete {
        /// Move the pulses belong to
        ticket: StepTicket,
        /// Pulses emitted since `arm`
        emitted: u32,
    },
}

impl StepEvent {
    /// Ticket of the move this event reports on.
    #[inline]
    pub fn ticket(&self) -> StepTicket {
        match *self {
            StepEvent::Progress { ticket, .. } | StepEvent::Complete { ticket, .. } => ticket,
        }
    }

    /// Cumulative pulse count.
    #[inline]
    pub fn emitted(&self) -> u32 {
        match *self {
            StepEvent::Progress { emitted, .. } | StepEvent::Complete { emitted, .. } => emitted,
        }
    }

    /// Check if this event ends the move.
    #[inline]
    pub fn is_complete(&self) -> bool {
        matches!(self, StepEvent::Complete { .. })
    }
}

/// Bounded channel from a step-clock context into a driver instance.
///
/// The clock side publishes with [`StepEvents::publish`]; the driver drains
/// the channel under its lock at the start of every operation and in
/// `L6474::poll`. With `NoopRawMutex` the channel is not `Sync` and can only
/// be fed from the driver's own context.
pub struct StepEvents<M: RawMutex> {
    channel: Channel<M, StepEvent, STEP_EVENT_CAPACITY>,
}

impl<M: RawMutex> StepEvents<M> {
    /// Create an empty channel.
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Queue an event without blocking.
    ///
    /// # Errors
    ///
    /// Returns the event back if the channel is full.
    pub fn publish(&self, event: StepEvent) -> core::result::Result<(), StepEvent> {
        self.channel.try_send(event).map_err(|e| match e {
            embassy_sync::channel::TrySendError::Full(event) => event,
        })
    }

    /// Number of undelivered events.
    pub fn len(&self) -> usize {
        self.channel.len()
    }

    /// Check if no event is queued.
    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    pub(crate) fn try_next(&self) -> Option<StepEvent> {
        self.channel.try_receive().ok()
    }
}

impl<M: RawMutex> Default for StepEvents<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of `step_incremental`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepOutcome {
    /// Synchronous move ended.
    Completed {
        /// Signed number of pulses actually issued
        steps: i32,
        /// Absolute position afterwards
        position: i32,
    },
    /// Asynchronous move armed; progress arrives as [`StepEvent`]s.
    Armed {
        /// Ticket to match notifications against
        ticket: StepTicket,
    },
}

impl StepOutcome {
    /// Signed step count for a completed move, `None` for an armed one.
    pub fn steps(&self) -> Option<i32> {
        match *self {
            StepOutcome::Completed { steps, .. } => Some(steps),
            StepOutcome::Armed { .. } => None,
        }
    }
}
