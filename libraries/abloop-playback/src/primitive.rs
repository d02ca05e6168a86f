//! Platform audio-output primitive
//!
//! Abstracts the platform media player (Android `MediaPlayer`, an AVPlayer
//! bridge, a desktop decoder + output stream). The controller only drives the
//! primitive; decoding and device handling stay on the platform side.

use crate::error::PrimitiveError;
use crate::types::MediaSource;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Platform audio-output primitive
///
/// All calls are synchronous. `prepare` may block while the platform reads
/// headers.
pub trait AudioPrimitive: Send {
    /// Bind a media source
    fn set_data_source(&mut self, source: &MediaSource) -> Result<(), PrimitiveError>;

    /// Prepare the bound source for playback
    fn prepare(&mut self) -> Result<(), PrimitiveError>;

    /// Start or resume output
    fn start(&mut self) -> Result<(), PrimitiveError>;

    /// Pause output, keeping the position
    fn pause(&mut self) -> Result<(), PrimitiveError>;

    /// Seek to a position in milliseconds
    ///
    /// Implementations are expected to clamp out-of-range targets.
    fn seek_to(&mut self, position_ms: u64) -> Result<(), PrimitiveError>;

    /// Set the playback rate multiplier (1.0 = normal)
    fn set_playback_rate(&mut self, rate: f32) -> Result<(), PrimitiveError>;

    /// Current position in milliseconds
    fn current_position(&self) -> Result<u64, PrimitiveError>;

    /// Track duration in milliseconds
    fn duration(&self) -> Result<u64, PrimitiveError>;

    /// Whether the primitive restarts the whole track when it reaches the end
    fn set_looping(&mut self, looping: bool) -> Result<(), PrimitiveError>;

    /// Whether output is currently running
    fn is_playing(&self) -> bool;

    /// Free platform resources. The primitive is unusable afterwards.
    fn release(&mut self);
}

/// Builds a fresh primitive for every load
pub trait PrimitiveFactory: Send {
    fn create(&self) -> Box<dyn AudioPrimitive>;
}

impl<F> PrimitiveFactory for F
where
    F: Fn() -> Box<dyn AudioPrimitive> + Send,
{
    fn create(&self) -> Box<dyn AudioPrimitive> {
        self()
    }
}

#[derive(Debug, Default)]
struct SimulatedState {
    source: Option<MediaSource>,
    prepared: bool,
    released: bool,
    playing: bool,
    looping: bool,
    position_ms: u64,
    duration_ms: u64,
    rate: f32,
    seeks: Vec<u64>,
}

/// In-memory primitive driven by a virtual clock
///
/// Position only moves when [`SimulatedHandle::advance`] is called, which
/// keeps tests deterministic. Sources are resolved against a fixed table of
/// known durations; unknown sources fail to bind.
pub struct SimulatedPrimitive {
    catalog: Arc<HashMap<MediaSource, u64>>,
    unpreparable: Arc<Vec<MediaSource>>,
    state: Arc<Mutex<SimulatedState>>,
}

/// Shared view into a [`SimulatedPrimitive`] for driving and inspecting it
#[derive(Clone)]
pub struct SimulatedHandle {
    state: Arc<Mutex<SimulatedState>>,
}

fn lock(state: &Mutex<SimulatedState>) -> MutexGuard<'_, SimulatedState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SimulatedPrimitive {
    fn new(catalog: Arc<HashMap<MediaSource, u64>>, unpreparable: Arc<Vec<MediaSource>>) -> Self {
        let state = SimulatedState {
            rate: 1.0,
            ..Default::default()
        };

        Self {
            catalog,
            unpreparable,
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn handle(&self) -> SimulatedHandle {
        SimulatedHandle {
            state: Arc::clone(&self.state),
        }
    }

    fn ready(state: &SimulatedState) -> Result<(), PrimitiveError> {
        if state.released {
            return Err(PrimitiveError::IllegalState("released".into()));
        }
        if !state.prepared {
            return Err(PrimitiveError::IllegalState("not prepared".into()));
        }
        Ok(())
    }
}

impl AudioPrimitive for SimulatedPrimitive {
    fn set_data_source(&mut self, source: &MediaSource) -> Result<(), PrimitiveError> {
        let mut state = lock(&self.state);
        let duration = self
            .catalog
            .get(source)
            .copied()
            .ok_or_else(|| PrimitiveError::DataSource(format!("unknown source {}", source)))?;

        state.source = Some(source.clone());
        state.duration_ms = duration;
        Ok(())
    }

    fn prepare(&mut self) -> Result<(), PrimitiveError> {
        let mut state = lock(&self.state);
        let Some(source) = state.source.as_ref() else {
            return Err(PrimitiveError::IllegalState("no data source".into()));
        };
        if self.unpreparable.contains(source) {
            return Err(PrimitiveError::Prepare("unsupported format".into()));
        }
        state.prepared = true;
        Ok(())
    }

    fn start(&mut self) -> Result<(), PrimitiveError> {
        let mut state = lock(&self.state);
        Self::ready(&state)?;
        if state.position_ms >= state.duration_ms {
            state.position_ms = 0;
        }
        state.playing = true;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), PrimitiveError> {
        let mut state = lock(&self.state);
        Self::ready(&state)?;
        state.playing = false;
        Ok(())
    }

    fn seek_to(&mut self, position_ms: u64) -> Result<(), PrimitiveError> {
        let mut state = lock(&self.state);
        Self::ready(&state)?;
        let position_ms = position_ms.min(state.duration_ms);
        state.position_ms = position_ms;
        state.seeks.push(position_ms);
        Ok(())
    }

    fn set_playback_rate(&mut self, rate: f32) -> Result<(), PrimitiveError> {
        let mut state = lock(&self.state);
        Self::ready(&state)?;
        if !(rate.is_finite() && rate > 0.0) {
            return Err(PrimitiveError::Other(format!("invalid rate {}", rate)));
        }
        state.rate = rate;
        Ok(())
    }

    fn current_position(&self) -> Result<u64, PrimitiveError> {
        let state = lock(&self.state);
        Self::ready(&state)?;
        Ok(state.position_ms)
    }

    fn duration(&self) -> Result<u64, PrimitiveError> {
        let state = lock(&self.state);
        Self::ready(&state)?;
        Ok(state.duration_ms)
    }

    fn set_looping(&mut self, looping: bool) -> Result<(), PrimitiveError> {
        let mut state = lock(&self.state);
        if state.released {
            return Err(PrimitiveError::IllegalState("released".into()));
        }
        state.looping = looping;
        Ok(())
    }

    fn is_playing(&self) -> bool {
        lock(&self.state).playing
    }

    fn release(&mut self) {
        let mut state = lock(&self.state);
        state.released = true;
        state.playing = false;
        state.prepared = false;
    }
}

impl SimulatedHandle {
    /// Advance the virtual clock by `wall_ms` of real time
    ///
    /// Position moves by `wall_ms * rate` while playing. At the end of the
    /// track the primitive wraps if looping, otherwise it stops at the end.
    pub fn advance(&self, wall_ms: u64) {
        let mut state = lock(&self.state);
        if !state.playing || state.duration_ms == 0 {
            return;
        }

        let delta = (wall_ms as f64 * f64::from(state.rate)).round() as u64;
        let next = state.position_ms.saturating_add(delta);

        if next < state.duration_ms {
            state.position_ms = next;
        } else if state.looping {
            state.position_ms = next % state.duration_ms;
        } else {
            state.position_ms = state.duration_ms;
            state.playing = false;
        }
    }

    /// Move the position directly, as if the platform had drifted there
    pub fn set_position(&self, position_ms: u64) {
        let mut state = lock(&self.state);
        state.position_ms = position_ms.min(state.duration_ms);
    }

    pub fn position(&self) -> u64 {
        lock(&self.state).position_ms
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.state).playing
    }

    pub fn is_looping(&self) -> bool {
        lock(&self.state).looping
    }

    pub fn is_released(&self) -> bool {
        lock(&self.state).released
    }

    pub fn rate(&self) -> f32 {
        lock(&self.state).rate
    }

    /// Every seek target the primitive received, after clamping
    pub fn seeks(&self) -> Vec<u64> {
        lock(&self.state).seeks.clone()
    }
}

/// Factory for [`SimulatedPrimitive`]s
///
/// Tracks the most recently created primitive so callers can drive it.
#[derive(Clone, Default)]
pub struct SimulatedFactory {
    catalog: Arc<HashMap<MediaSource, u64>>,
    unpreparable: Arc<Vec<MediaSource>>,
    latest: Arc<Mutex<Option<SimulatedHandle>>>,
}

impl SimulatedFactory {
    /// Create a factory that knows no sources
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source with its duration
    #[must_use]
    pub fn with_track(mut self, source: impl Into<MediaSource>, duration_ms: u64) -> Self {
        Arc::make_mut(&mut self.catalog).insert(source.into(), duration_ms);
        self
    }

    /// Register a source that binds but fails to prepare
    #[must_use]
    pub fn with_broken_track(mut self, source: impl Into<MediaSource>) -> Self {
        let source = source.into();
        Arc::make_mut(&mut self.catalog).insert(source.clone(), 0);
        Arc::make_mut(&mut self.unpreparable).push(source);
        self
    }

    /// Handle to the primitive built by the last `create` call
    pub fn latest(&self) -> Option<SimulatedHandle> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PrimitiveFactory for SimulatedFactory {
    fn create(&self) -> Box<dyn AudioPrimitive> {
        let primitive =
            SimulatedPrimitive::new(Arc::clone(&self.catalog), Arc::clone(&self.unpreparable));

        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(primitive.handle());

        Box::new(primitive)
    }
}
