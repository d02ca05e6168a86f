//! A/B loop capture and enforcement
//!
//! A single "set loop" control walks through three stages:
//!
//! | stage           | action on press                         | next stage      |
//! |-----------------|-----------------------------------------|-----------------|
//! | `Idle`          | capture start at current position       | `StartCaptured` |
//! | `StartCaptured` | capture end, order the pair, arm        | `Armed`         |
//! | `Armed`         | disarm (boundaries are kept)            | `Idle`          |
//!
//! `Disabled` means no track is loaded; presses are rejected.
//!
//! While a region is armed the primitive's whole-track looping is turned off
//! and the position poller seeks back to the region start instead.

use crate::{
    engine::PlaybackEngine,
    error::{PlaybackError, Result},
    types::{format_time, PlayerConfig},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Stage of the loop capture protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopStage {
    /// No track loaded
    Disabled,

    /// Next press captures the loop start
    Idle,

    /// Start captured; next press captures the end and arms the loop
    StartCaptured,

    /// Loop armed; next press clears it
    Armed,
}

impl LoopStage {
    /// Numeric mode as shown by simple UIs: -1, 0, 1, 2
    pub fn mode(self) -> i32 {
        match self {
            LoopStage::Disabled => -1,
            LoopStage::Idle => 0,
            LoopStage::StartCaptured => 1,
            LoopStage::Armed => 2,
        }
    }

    /// Inverse of [`mode`](Self::mode), reducing modulo 3
    pub fn from_mode(mode: i32) -> Self {
        if mode < 0 {
            return LoopStage::Disabled;
        }
        match mode % 3 {
            0 => LoopStage::Idle,
            1 => LoopStage::StartCaptured,
            _ => LoopStage::Armed,
        }
    }

    fn next(self) -> Self {
        match self {
            LoopStage::Disabled => LoopStage::Disabled,
            LoopStage::Idle => LoopStage::StartCaptured,
            LoopStage::StartCaptured => LoopStage::Armed,
            LoopStage::Armed => LoopStage::Idle,
        }
    }
}

/// Captured loop boundaries
///
/// Invariant while armed: `start_ms <= end_ms <= duration - end guard`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopRegion {
    pub start_ms: u64,
    pub end_ms: u64,
    pub armed: bool,
}

impl LoopRegion {
    /// Build an armed region from two captured positions in either order
    ///
    /// The end is pulled back to `duration - end_guard_ms` so enforcement
    /// fires before the primitive reaches the physical end of the track.
    pub fn armed_between(a: u64, b: u64, duration_ms: u64, end_guard_ms: u64) -> Self {
        let (start, end) = if b < a { (b, a) } else { (a, b) };
        let end = end.min(duration_ms.saturating_sub(end_guard_ms));
        let start = start.min(end);

        Self {
            start_ms: start,
            end_ms: end,
            armed: true,
        }
    }

    /// Loop start to seek to if `position_ms` has run past the region
    pub fn loop_back_target(&self, position_ms: u64, duration_ms: u64) -> Option<u64> {
        if self.armed && (position_ms >= self.end_ms || position_ms >= duration_ms) {
            Some(self.start_ms)
        } else {
            None
        }
    }

    /// Start and end as fractions of the track, for seek bar markers
    pub fn fractions(&self, duration_ms: u64) -> Option<(f32, f32)> {
        if duration_ms == 0 {
            return None;
        }
        let duration = duration_ms as f32;
        Some((self.start_ms as f32 / duration, self.end_ms as f32 / duration))
    }
}

/// Human-readable loop boundary labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopLabels {
    pub start: String,
    pub end: String,
}

impl LoopLabels {
    const UNSET: &'static str = "N/A";

    /// Labels for the given stage
    pub fn describe(stage: LoopStage, region: &LoopRegion) -> Self {
        let start = match stage {
            LoopStage::StartCaptured | LoopStage::Armed => format_time(region.start_ms),
            LoopStage::Disabled | LoopStage::Idle => Self::UNSET.to_string(),
        };
        let end = match stage {
            LoopStage::Armed => format_time(region.end_ms),
            _ => Self::UNSET.to_string(),
        };

        Self {
            start: format!("Loop Start: {}", start),
            end: format!("Loop End: {}", end),
        }
    }
}

/// Result of a "set loop" press
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopUpdate {
    /// Stage after the press
    pub stage: LoopStage,
    pub region: LoopRegion,
    pub labels: LoopLabels,
}

/// Three-stage loop capture state machine
#[derive(Debug, Clone)]
pub struct LoopController {
    region: LoopRegion,
    stage: LoopStage,
    end_guard_ms: u64,
}

impl LoopController {
    /// Create a controller for an engine with no track loaded
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            region: LoopRegion::default(),
            stage: LoopStage::Disabled,
            end_guard_ms: config.end_guard_ms,
        }
    }

    /// Forget the region after a load attempt
    ///
    /// `track_loaded` selects `Idle` (load succeeded) or `Disabled`.
    pub fn reset(&mut self, track_loaded: bool) {
        self.region = LoopRegion::default();
        self.stage = if track_loaded {
            LoopStage::Idle
        } else {
            LoopStage::Disabled
        };
    }

    /// Handle a "set loop" press at the current stage
    pub fn set_loop(&mut self, engine: &mut PlaybackEngine) -> Result<LoopUpdate> {
        self.set_loop_at(engine, self.stage)
    }

    /// Handle a "set loop" press as if the controller were at `stage`
    ///
    /// For hosts that track the stage themselves. Pressing at `Idle` twice
    /// just recaptures the start.
    pub fn set_loop_at(
        &mut self,
        engine: &mut PlaybackEngine,
        stage: LoopStage,
    ) -> Result<LoopUpdate> {
        if self.stage == LoopStage::Disabled {
            return Err(PlaybackError::Uninitialized);
        }

        // Nothing changes unless the position can be read
        let position = engine.position_ms()?;

        match stage {
            LoopStage::Idle => {
                if self.region.armed {
                    self.region.armed = false;
                    engine.set_looping(true).ok();
                }
                self.region.start_ms = position;
                debug!("Loop start captured at {} ms", position);
            }
            LoopStage::StartCaptured => {
                self.region = LoopRegion::armed_between(
                    self.region.start_ms,
                    position,
                    engine.duration_ms(),
                    self.end_guard_ms,
                );
                // The region loop owns replay now; failure is logged by the engine
                engine.set_looping(false).ok();
                debug!(
                    "Loop armed: {} ms .. {} ms",
                    self.region.start_ms, self.region.end_ms
                );
            }
            LoopStage::Armed => {
                self.region.armed = false;
                engine.set_looping(true).ok();
                debug!("Loop cleared");
            }
            LoopStage::Disabled => return Err(PlaybackError::Uninitialized),
        }

        self.stage = stage.next();

        let labels = LoopLabels::describe(self.stage, &self.region);
        engine.listener().on_loop_changed(&self.region, &labels);

        Ok(LoopUpdate {
            stage: self.stage,
            region: self.region,
            labels,
        })
    }

    /// Loop start to seek to, if the armed region has been overrun
    pub fn loop_back_target(&self, position_ms: u64, duration_ms: u64) -> Option<u64> {
        self.region.loop_back_target(position_ms, duration_ms)
    }

    pub fn region(&self) -> LoopRegion {
        self.region
    }

    pub fn stage(&self) -> LoopStage {
        self.stage
    }

    pub fn is_armed(&self) -> bool {
        self.region.armed
    }
}
