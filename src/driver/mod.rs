//! L6474 driver instances, their state machine and the handle arena.

mod instance;
mod manager;
mod position;
mod state;
mod stepping;

pub use instance::L6474;
pub use manager::{Drivers, Handle};
pub use position::PositionModel;
pub use state::DriverState;
pub use stepping::{StepEvent, StepEvents, StepOutcome, STEP_EVENT_CAPACITY};
