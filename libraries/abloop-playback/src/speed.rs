//! Playback speed factor
//!
//! The factor is stored in hundredths so that repeated ±5% steps never
//! accumulate floating point error. Reachable values are 0.25 ..= 2.45.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Default speed (1.00x)
const DEFAULT_HUNDREDTHS: u16 = 100;

/// Size of one adjustment step (0.05x)
const STEP_HUNDREDTHS: u16 = 5;

/// Exclusive lower bound (0.20x)
const MIN_EXCLUSIVE: u16 = 20;

/// Exclusive upper bound for stepping (2.50x)
const MAX_EXCLUSIVE: u16 = 250;

/// Direction of a speed adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedDirection {
    /// +5%
    Faster,
    /// -5%
    Slower,
}

impl SpeedDirection {
    /// Map a `+1` / `-1` style increment onto a direction
    ///
    /// Returns `None` for zero.
    pub fn from_increment(increment: i32) -> Option<Self> {
        match increment.signum() {
            1 => Some(Self::Faster),
            -1 => Some(Self::Slower),
            _ => None,
        }
    }
}

/// Percentage outside the valid speed range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Speed {0}% is outside the range 25%..=245%")]
pub struct SpeedOutOfRange(pub u16);

/// Multiplicative playback rate applied to the audio primitive
///
/// Serialized as a whole percentage. Deserializing checks the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct SpeedFactor(u16);

impl Default for SpeedFactor {
    fn default() -> Self {
        Self(DEFAULT_HUNDREDTHS)
    }
}

impl SpeedFactor {
    /// Normal speed
    pub const NORMAL: Self = Self(DEFAULT_HUNDREDTHS);

    /// Build from a whole percentage, rejecting values outside the valid range
    pub fn from_percent(percent: u16) -> Option<Self> {
        Self::in_range(percent).then_some(Self(percent))
    }

    fn in_range(hundredths: u16) -> bool {
        hundredths > MIN_EXCLUSIVE && hundredths < MAX_EXCLUSIVE
    }

    /// Step one increment in `direction`
    ///
    /// Steps that would leave the range leave the factor unchanged.
    #[must_use]
    pub fn step(self, direction: SpeedDirection) -> Self {
        let next = match direction {
            SpeedDirection::Faster => self.0.saturating_add(STEP_HUNDREDTHS),
            SpeedDirection::Slower => self.0.saturating_sub(STEP_HUNDREDTHS),
        };

        if Self::in_range(next) {
            Self(next)
        } else {
            self
        }
    }

    /// Factor as a whole percentage (100 = normal speed)
    pub fn percent(self) -> u16 {
        self.0
    }

    /// Factor as a rate multiplier for the primitive
    pub fn as_f32(self) -> f32 {
        f32::from(self.0) / 100.0
    }

    /// Whether this is the unmodified 1.00x rate
    pub fn is_normal(self) -> bool {
        self.0 == DEFAULT_HUNDREDTHS
    }
}

impl TryFrom<u16> for SpeedFactor {
    type Error = SpeedOutOfRange;

    fn try_from(percent: u16) -> Result<Self, Self::Error> {
        Self::from_percent(percent).ok_or(SpeedOutOfRange(percent))
    }
}

impl From<SpeedFactor> for u16 {
    fn from(speed: SpeedFactor) -> Self {
        speed.0
    }
}

impl fmt::Display for SpeedFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}
