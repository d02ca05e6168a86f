//! Shared fixtures for integration tests

#![allow(dead_code)]

use abloop_playback::{
    LoopLabels, LoopRegion, PlaybackEvent, PlaybackListener, PlaybackState, PlayerConfig, Session,
    SimulatedFactory, SimulatedHandle,
};
use std::sync::{Arc, Mutex};

pub const SHORT_TRACK: &str = "short.mp3";
pub const LONG_TRACK: &str = "long.mp3";
pub const BROKEN_TRACK: &str = "broken.mp3";

/// Listener that records every notification as an event
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<PlaybackEvent>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<PlaybackEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    pub fn positions(&self) -> Vec<u64> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                PlaybackEvent::PositionChanged { position_ms } => Some(position_ms),
                _ => None,
            })
            .collect()
    }

    pub fn states(&self) -> Vec<PlaybackState> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                PlaybackEvent::StateChanged { state } => Some(state),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: PlaybackEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl PlaybackListener for RecordingListener {
    fn on_duration_changed(&self, duration_ms: u64) {
        self.push(PlaybackEvent::DurationChanged { duration_ms });
    }

    fn on_position_changed(&self, position_ms: u64) {
        self.push(PlaybackEvent::PositionChanged { position_ms });
    }

    fn on_state_changed(&self, state: PlaybackState) {
        self.push(PlaybackEvent::StateChanged { state });
    }

    fn on_loop_changed(&self, region: &LoopRegion, labels: &LoopLabels) {
        self.push(PlaybackEvent::LoopChanged {
            region: *region,
            labels: labels.clone(),
        });
    }
}

/// Factory knowing a 100 s track, a 180 s track and one that fails to prepare
pub fn test_factory() -> SimulatedFactory {
    SimulatedFactory::new()
        .with_track(SHORT_TRACK, 100_000)
        .with_track(LONG_TRACK, 180_000)
        .with_broken_track(BROKEN_TRACK)
}

pub struct TestSession {
    pub session: Session,
    pub factory: SimulatedFactory,
    pub listener: Arc<RecordingListener>,
}

impl TestSession {
    pub fn new() -> Self {
        let factory = test_factory();
        let listener = Arc::new(RecordingListener::default());
        let session = Session::new(
            Box::new(factory.clone()),
            listener.clone(),
            &PlayerConfig::default(),
        );

        Self {
            session,
            factory,
            listener,
        }
    }

    pub fn loaded(track: &str) -> Self {
        let mut test = Self::new();
        test.session.load(&track.into()).unwrap();
        test
    }

    /// Handle to the primitive of the current track
    pub fn primitive(&self) -> SimulatedHandle {
        self.factory.latest().expect("no primitive created yet")
    }

    /// Move the playback position and capture it as the next loop boundary
    pub fn capture_at(&mut self, position_ms: u64) {
        self.session.seek_to(position_ms).unwrap();
        self.session.set_loop().unwrap();
    }
}
