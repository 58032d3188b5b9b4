//! Unit types for physical quantities.
//!
//! Provides type-safe representations of phase currents and timing constants
//! to prevent unit confusion at compile time.

use serde::Deserialize;

/// Current in milliamps.
///
/// Used for configuration and user-facing API. Encoded into register codes by
/// [`crate::codec`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize)]
#[serde(transparent)]
pub struct Milliamps(pub f32);

/// Time in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize)]
#[serde(transparent)]
pub struct Microseconds(pub f32);
