//! Playback notifications
//!
//! The controller reports to the host through a [`PlaybackListener`] injected
//! at construction. Notifications are fire-and-forget and arrive on the thread
//! that owns the session, so hosts with a UI thread should marshal them (for
//! example with [`ChannelListener`]).

use crate::looping::{LoopLabels, LoopRegion};
use crate::types::PlaybackState;
use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};

/// Receives playback notifications
pub trait PlaybackListener: Send + Sync {
    /// Track duration became known (once per successful load)
    fn on_duration_changed(&self, duration_ms: u64);

    /// Playback position changed
    fn on_position_changed(&self, position_ms: u64);

    /// Playback state changed
    fn on_state_changed(&self, state: PlaybackState);

    /// Loop region was captured, armed or cleared
    fn on_loop_changed(&self, _region: &LoopRegion, _labels: &LoopLabels) {}
}

/// Listener that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl PlaybackListener for NoopListener {
    fn on_duration_changed(&self, _duration_ms: u64) {}
    fn on_position_changed(&self, _position_ms: u64) {}
    fn on_state_changed(&self, _state: PlaybackState) {}
}

/// Notification as a value, for hosts that consume events from a channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlaybackEvent {
    DurationChanged {
        duration_ms: u64,
    },

    PositionChanged {
        position_ms: u64,
    },

    StateChanged {
        state: PlaybackState,
    },

    /// Loop region changed, with the labels to display
    LoopChanged {
        region: LoopRegion,
        labels: LoopLabels,
    },
}

/// Forwards notifications as [`PlaybackEvent`]s over a crossbeam channel
///
/// Send failures (receiver dropped) are ignored.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: Sender<PlaybackEvent>,
}

impl ChannelListener {
    pub fn new(tx: Sender<PlaybackEvent>) -> Self {
        Self { tx }
    }

    fn emit(&self, event: PlaybackEvent) {
        self.tx.send(event).ok();
    }
}

impl PlaybackListener for ChannelListener {
    fn on_duration_changed(&self, duration_ms: u64) {
        self.emit(PlaybackEvent::DurationChanged { duration_ms });
    }

    fn on_position_changed(&self, position_ms: u64) {
        self.emit(PlaybackEvent::PositionChanged { position_ms });
    }

    fn on_state_changed(&self, state: PlaybackState) {
        self.emit(PlaybackEvent::StateChanged { state });
    }

    fn on_loop_changed(&self, region: &LoopRegion, labels: &LoopLabels) {
        self.emit(PlaybackEvent::LoopChanged {
            region: *region,
            labels: labels.clone(),
        });
    }
}
