//! Playback engine - owns the audio primitive
//!
//! Wraps a platform [`AudioPrimitive`] behind a transport API that never
//! panics. Every load builds a fresh primitive through the injected
//! [`PrimitiveFactory`]; the previous one is released first.

use crate::{
    error::{PlaybackError, PrimitiveError, Result},
    events::PlaybackListener,
    primitive::{AudioPrimitive, PrimitiveFactory},
    speed::{SpeedDirection, SpeedFactor},
    types::{MediaSource, PlaybackState, PlayerConfig, Ready},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Log a failed primitive call and convert it into a [`PlaybackError`]
fn logged(operation: &'static str) -> impl FnOnce(PrimitiveError) -> PlaybackError {
    move |e| {
        warn!("Audio primitive {} failed: {}", operation, e);
        PlaybackError::Primitive(e)
    }
}

/// Transport over a single loaded track
pub struct PlaybackEngine {
    factory: Box<dyn PrimitiveFactory>,
    primitive: Option<Box<dyn AudioPrimitive>>,
    listener: Arc<dyn PlaybackListener>,
    state: PlaybackState,
    speed: SpeedFactor,
    duration_ms: u64,
    skip_ms: u64,
}

impl PlaybackEngine {
    /// Create an engine with no track loaded
    pub fn new(
        factory: Box<dyn PrimitiveFactory>,
        listener: Arc<dyn PlaybackListener>,
        config: &PlayerConfig,
    ) -> Self {
        Self {
            factory,
            primitive: None,
            listener,
            state: PlaybackState::Uninitialized,
            speed: SpeedFactor::default(),
            duration_ms: 0,
            skip_ms: config.skip_ms,
        }
    }

    /// Load a media source, replacing the current track
    ///
    /// On failure the engine is left `Uninitialized` and the error is
    /// returned for the host to report or retry.
    pub fn load(&mut self, source: &MediaSource) -> Result<Ready> {
        self.drop_primitive();
        self.duration_ms = 0;

        let mut primitive = self.factory.create();
        let duration_ms = match Self::bind(primitive.as_mut(), source) {
            Ok(duration_ms) => duration_ms,
            Err(reason) => {
                warn!("Failed to load {}: {}", source, reason);
                primitive.release();
                self.set_state(PlaybackState::Uninitialized);
                return Err(PlaybackError::MediaLoad {
                    media: source.to_string(),
                    reason,
                });
            }
        };

        info!("Loaded {} ({} ms)", source, duration_ms);

        self.primitive = Some(primitive);
        self.duration_ms = duration_ms;

        self.listener.on_duration_changed(duration_ms);
        self.listener.on_position_changed(0);
        self.set_state(PlaybackState::Stopped);

        Ok(Ready { duration_ms })
    }

    fn bind(
        primitive: &mut dyn AudioPrimitive,
        source: &MediaSource,
    ) -> std::result::Result<u64, PrimitiveError> {
        primitive.set_data_source(source)?;
        primitive.prepare()?;
        // Whole-track looping until a loop region takes over
        primitive.set_looping(true)?;
        primitive.duration()
    }

    /// Start playback
    ///
    /// Reapplies the current speed factor. Does nothing if already playing.
    pub fn play(&mut self) -> Result<PlaybackState> {
        if self.state == PlaybackState::Playing {
            return Ok(self.state);
        }
        self.start_primitive()?;
        Ok(self.state)
    }

    /// Ensure the primitive is running, even if the engine already thinks it is
    ///
    /// Used after a loop-back seek, where the primitive may have stopped on
    /// its own at the end of the track.
    pub fn resume(&mut self) -> Result<PlaybackState> {
        self.start_primitive()?;
        Ok(self.state)
    }

    fn start_primitive(&mut self) -> Result<()> {
        let rate = self.speed.as_f32();
        let primitive = self.primitive_mut()?;

        primitive.start().map_err(logged("start"))?;
        if let Err(e) = primitive.set_playback_rate(rate) {
            warn!("Failed to apply playback rate {}: {}", rate, e);
        }

        self.set_state(PlaybackState::Playing);
        Ok(())
    }

    /// Pause playback. Does nothing unless playing.
    pub fn pause(&mut self) -> Result<PlaybackState> {
        let playing = self.state == PlaybackState::Playing;
        let primitive = self.primitive_mut()?;

        if playing {
            primitive.pause().map_err(logged("pause"))?;
            self.set_state(PlaybackState::Paused);
        }
        Ok(self.state)
    }

    /// Stop playback and return to the beginning of the track
    pub fn stop(&mut self) -> Result<PlaybackState> {
        let primitive = self.primitive_mut()?;

        if primitive.is_playing() {
            primitive.pause().map_err(logged("pause"))?;
        }
        primitive.seek_to(0).map_err(logged("seek"))?;

        self.listener.on_position_changed(0);
        self.set_state(PlaybackState::Stopped);
        Ok(self.state)
    }

    /// Play when not playing, pause when playing
    pub fn toggle(&mut self) -> Result<PlaybackState> {
        match self.state {
            PlaybackState::Playing => self.pause(),
            _ => self.play(),
        }
    }

    /// Seek without validation; the primitive clamps out-of-range targets
    pub fn seek_to(&mut self, position_ms: u64) -> Result<()> {
        self.primitive_mut()?
            .seek_to(position_ms)
            .map_err(logged("seek"))
    }

    /// Step the speed factor by 5% in `direction`
    ///
    /// Steps that would leave the valid range are ignored. The resulting
    /// factor is returned either way so the UI can always show it.
    pub fn adjust_speed(&mut self, direction: SpeedDirection) -> SpeedFactor {
        let next = self.speed.step(direction);
        if next == self.speed {
            debug!("Speed {} already at limit, ignoring {:?}", self.speed, direction);
            return self.speed;
        }

        self.speed = next;
        if self.state == PlaybackState::Playing {
            if let Some(primitive) = self.primitive.as_mut() {
                if let Err(e) = primitive.set_playback_rate(next.as_f32()) {
                    warn!("Failed to apply playback rate {}: {}", next, e);
                }
            }
        }

        self.speed
    }

    /// Seek forward by the configured skip offset, clamped to the track end
    pub fn skip_forward(&mut self) -> Result<u64> {
        let target = self
            .position_ms()?
            .saturating_add(self.skip_ms)
            .min(self.duration_ms);
        self.seek_to(target)?;
        Ok(target)
    }

    /// Seek backward by the configured skip offset, clamped to zero
    pub fn skip_backward(&mut self) -> Result<u64> {
        let target = self.position_ms()?.saturating_sub(self.skip_ms);
        self.seek_to(target)?;
        Ok(target)
    }

    /// Release the primitive. Everything except `load` is a no-op afterwards.
    pub fn release(&mut self) {
        self.drop_primitive();
        self.duration_ms = 0;
        self.set_state(PlaybackState::Uninitialized);
    }

    fn drop_primitive(&mut self) {
        if let Some(mut primitive) = self.primitive.take() {
            primitive.release();
        }
    }

    /// Enable or disable the primitive's whole-track looping
    pub fn set_looping(&mut self, looping: bool) -> Result<()> {
        self.primitive_mut()?
            .set_looping(looping)
            .map_err(logged("set_looping"))
    }

    /// Current position read from the primitive
    pub fn position_ms(&self) -> Result<u64> {
        self.primitive
            .as_ref()
            .ok_or(PlaybackError::Uninitialized)?
            .current_position()
            .map_err(logged("current_position"))
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn speed(&self) -> SpeedFactor {
        self.speed
    }

    pub fn is_initialized(&self) -> bool {
        self.primitive.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub(crate) fn listener(&self) -> &Arc<dyn PlaybackListener> {
        &self.listener
    }

    fn primitive_mut(&mut self) -> Result<&mut (dyn AudioPrimitive + 'static)> {
        self.primitive
            .as_deref_mut()
            .ok_or(PlaybackError::Uninitialized)
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            debug!("Playback state {:?} -> {:?}", self.state, state);
            self.state = state;
            self.listener.on_state_changed(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::SimulatedFactory;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl PlaybackListener for Recorder {
        fn on_duration_changed(&self, duration_ms: u64) {
            self.calls.lock().unwrap().push(format!("duration {}", duration_ms));
        }

        fn on_position_changed(&self, position_ms: u64) {
            self.calls.lock().unwrap().push(format!("position {}", position_ms));
        }

        fn on_state_changed(&self, state: PlaybackState) {
            self.calls.lock().unwrap().push(format!("state {:?}", state));
        }
    }

    fn engine() -> (PlaybackEngine, SimulatedFactory, Arc<Recorder>) {
        let factory = SimulatedFactory::new()
            .with_track("song.mp3", 180_000)
            .with_broken_track("broken.mp3");
        let recorder = Arc::new(Recorder::default());
        let engine = PlaybackEngine::new(
            Box::new(factory.clone()),
            recorder.clone(),
            &PlayerConfig::default(),
        );
        (engine, factory, recorder)
    }

    #[test]
    fn load_reports_duration_then_position() {
        let (mut engine, _, recorder) = engine();

        let ready = engine.load(&"song.mp3".into()).unwrap();

        assert_eq!(ready.duration_ms, 180_000);
        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_eq!(
            recorder.calls(),
            vec!["duration 180000", "position 0", "state Stopped"]
        );
    }

    #[test]
    fn load_enables_whole_track_looping() {
        let (mut engine, factory, _) = engine();
        engine.load(&"song.mp3".into()).unwrap();
        assert!(factory.latest().unwrap().is_looping());
    }

    #[test]
    fn failed_load_leaves_engine_uninitialized() {
        let (mut engine, factory, recorder) = engine();
        engine.load(&"song.mp3".into()).unwrap();
        let first = factory.latest().unwrap();

        let err = engine.load(&"broken.mp3".into()).unwrap_err();

        assert!(matches!(err, PlaybackError::MediaLoad { .. }));
        assert_eq!(engine.state(), PlaybackState::Uninitialized);
        assert!(!engine.is_initialized());
        assert!(first.is_released());
        assert!(factory.latest().unwrap().is_released());
        assert_eq!(recorder.calls().last().unwrap(), "state Uninitialized");
    }

    #[test]
    fn unknown_source_is_a_load_error() {
        let (mut engine, _, recorder) = engine();
        let err = engine.load(&"nope.mp3".into()).unwrap_err();

        assert!(err.to_string().contains("nope.mp3"));
        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn transport_requires_a_track() {
        let (mut engine, _, _) = engine();

        assert!(matches!(engine.play(), Err(PlaybackError::Uninitialized)));
        assert!(matches!(engine.pause(), Err(PlaybackError::Uninitialized)));
        assert!(matches!(engine.seek_to(1000), Err(PlaybackError::Uninitialized)));
        assert!(matches!(engine.skip_forward(), Err(PlaybackError::Uninitialized)));
        assert!(matches!(engine.position_ms(), Err(PlaybackError::Uninitialized)));
    }

    #[test]
    fn toggle_alternates_play_and_pause() {
        let (mut engine, _, _) = engine();
        engine.load(&"song.mp3".into()).unwrap();

        assert_eq!(engine.toggle().unwrap(), PlaybackState::Playing);
        assert_eq!(engine.toggle().unwrap(), PlaybackState::Paused);
        assert_eq!(engine.toggle().unwrap(), PlaybackState::Playing);
    }

    #[test]
    fn play_is_idempotent() {
        let (mut engine, _, recorder) = engine();
        engine.load(&"song.mp3".into()).unwrap();

        engine.play().unwrap();
        engine.play().unwrap();

        let playing = recorder
            .calls()
            .iter()
            .filter(|c| *c == "state Playing")
            .count();
        assert_eq!(playing, 1);
    }

    #[test]
    fn play_reapplies_speed() {
        let (mut engine, factory, _) = engine();
        engine.load(&"song.mp3".into()).unwrap();

        engine.adjust_speed(SpeedDirection::Slower);
        engine.adjust_speed(SpeedDirection::Slower);
        let handle = factory.latest().unwrap();
        assert_eq!(handle.rate(), 1.0);

        engine.play().unwrap();
        assert!((handle.rate() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn speed_applies_immediately_while_playing() {
        let (mut engine, factory, _) = engine();
        engine.load(&"song.mp3".into()).unwrap();
        engine.play().unwrap();

        let speed = engine.adjust_speed(SpeedDirection::Faster);

        assert_eq!(speed.percent(), 105);
        assert!((factory.latest().unwrap().rate() - 1.05).abs() < 1e-6);
    }

    #[test]
    fn skips_are_clamped_to_track_bounds() {
        let (mut engine, factory, _) = engine();
        engine.load(&"song.mp3".into()).unwrap();

        engine.seek_to(2_000).unwrap();
        assert_eq!(engine.skip_backward().unwrap(), 0);

        engine.seek_to(178_000).unwrap();
        assert_eq!(engine.skip_forward().unwrap(), 180_000);

        engine.seek_to(60_000).unwrap();
        assert_eq!(engine.skip_forward().unwrap(), 65_000);
        assert_eq!(factory.latest().unwrap().position(), 65_000);
    }

    #[test]
    fn stop_rewinds_to_start() {
        let (mut engine, factory, _) = engine();
        engine.load(&"song.mp3".into()).unwrap();
        engine.play().unwrap();
        factory.latest().unwrap().advance(3_000);

        assert_eq!(engine.stop().unwrap(), PlaybackState::Stopped);
        assert_eq!(engine.position_ms().unwrap(), 0);
        assert!(!factory.latest().unwrap().is_playing());
    }

    #[test]
    fn release_makes_transport_inert() {
        let (mut engine, factory, _) = engine();
        engine.load(&"song.mp3".into()).unwrap();
        engine.play().unwrap();

        engine.release();

        assert!(factory.latest().unwrap().is_released());
        assert_eq!(engine.state(), PlaybackState::Uninitialized);
        assert_eq!(engine.duration_ms(), 0);
        assert!(engine.play().is_err());
        assert!(engine.seek_to(0).is_err());
    }
}
