//! Playback session - the single owner of all mutable playback state
//!
//! A session ties the engine, the loop controller and position reporting
//! together. Only one thread drives it: either the host directly, or the
//! [`Player`](crate::Player) actor, which feeds it commands and poller ticks
//! through channels. Nothing inside is shared, so nothing is locked.

use crate::{
    engine::PlaybackEngine,
    error::Result,
    events::PlaybackListener,
    looping::{LoopController, LoopStage, LoopUpdate},
    primitive::PrimitiveFactory,
    speed::{SpeedDirection, SpeedFactor},
    types::{MediaSource, PlaybackSnapshot, PlaybackState, PlayerConfig, Ready},
};
use std::sync::Arc;
use tracing::debug;

/// What a poller tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No primitive (nothing loaded or position unreadable)
    Skipped,

    /// Position sampled; `reported` is false when it had not changed
    Sampled { position_ms: u64, reported: bool },

    /// Armed loop overrun; seeked back to the loop start and resumed
    LoopedBack { from_ms: u64, to_ms: u64 },
}

/// Engine + loop controller + position reporting
pub struct Session {
    engine: PlaybackEngine,
    looping: LoopController,
    last_reported: Option<u64>,
}

impl Session {
    pub fn new(
        factory: Box<dyn PrimitiveFactory>,
        listener: Arc<dyn PlaybackListener>,
        config: &PlayerConfig,
    ) -> Self {
        Self {
            engine: PlaybackEngine::new(factory, listener, config),
            looping: LoopController::new(config),
            last_reported: None,
        }
    }

    /// Load a track; the loop region is reset whether or not it succeeds
    pub fn load(&mut self, source: &MediaSource) -> Result<Ready> {
        let result = self.engine.load(source);
        self.looping.reset(result.is_ok());
        self.last_reported = result.as_ref().ok().map(|_| 0);
        result
    }

    pub fn play(&mut self) -> Result<PlaybackState> {
        self.engine.play()
    }

    pub fn pause(&mut self) -> Result<PlaybackState> {
        self.engine.pause()
    }

    pub fn toggle(&mut self) -> Result<PlaybackState> {
        self.engine.toggle()
    }

    pub fn stop(&mut self) -> Result<PlaybackState> {
        let state = self.engine.stop()?;
        self.last_reported = Some(0);
        Ok(state)
    }

    pub fn seek_to(&mut self, position_ms: u64) -> Result<()> {
        self.engine.seek_to(position_ms)
    }

    pub fn adjust_speed(&mut self, direction: SpeedDirection) -> SpeedFactor {
        self.engine.adjust_speed(direction)
    }

    pub fn skip_forward(&mut self) -> Result<u64> {
        self.engine.skip_forward()
    }

    pub fn skip_backward(&mut self) -> Result<u64> {
        self.engine.skip_backward()
    }

    /// Advance the loop capture protocol by one press
    pub fn set_loop(&mut self) -> Result<LoopUpdate> {
        self.looping.set_loop(&mut self.engine)
    }

    /// Loop press at an explicit stage (see [`LoopController::set_loop_at`])
    pub fn set_loop_at(&mut self, stage: LoopStage) -> Result<LoopUpdate> {
        self.looping.set_loop_at(&mut self.engine, stage)
    }

    /// Release the primitive and disable looping until the next load
    pub fn release(&mut self) {
        self.engine.release();
        self.looping.reset(false);
        self.last_reported = None;
    }

    /// One position poller tick
    ///
    /// Reports the position when it changed since the last report, then
    /// enforces the armed loop region while playing.
    pub fn on_tick(&mut self) -> TickOutcome {
        let Ok(position_ms) = self.engine.position_ms() else {
            return TickOutcome::Skipped;
        };
        let reported = self.report_position(position_ms);

        if !self.engine.is_playing() {
            return TickOutcome::Sampled {
                position_ms,
                reported,
            };
        }

        let Some(start_ms) = self
            .looping
            .loop_back_target(position_ms, self.engine.duration_ms())
        else {
            return TickOutcome::Sampled {
                position_ms,
                reported,
            };
        };

        debug!("Looping back from {} ms to {} ms", position_ms, start_ms);
        if self.engine.seek_to(start_ms).is_err() {
            return TickOutcome::Sampled {
                position_ms,
                reported,
            };
        }
        // Seek first, then make sure the primitive did not stop at the track end
        self.engine.resume().ok();
        self.report_position(start_ms);

        TickOutcome::LoopedBack {
            from_ms: position_ms,
            to_ms: start_ms,
        }
    }

    fn report_position(&mut self, position_ms: u64) -> bool {
        if self.last_reported == Some(position_ms) {
            return false;
        }
        self.last_reported = Some(position_ms);
        self.engine.listener().on_position_changed(position_ms);
        true
    }

    /// Whether the position poller should be running
    pub fn wants_polling(&self) -> bool {
        self.engine.is_playing()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            state: self.engine.state(),
            position_ms: self.engine.position_ms().unwrap_or(0),
            duration_ms: self.engine.duration_ms(),
            speed: self.engine.speed(),
            loop_region: self.looping.region(),
            loop_stage: self.looping.stage(),
        }
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    pub fn loop_controller(&self) -> &LoopController {
        &self.looping
    }
}
