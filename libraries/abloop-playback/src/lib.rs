//! A/B Loop - Practice Playback Controller
//!
//! Drives playback of a single track for practice sessions.
//!
//! This crate provides:
//! - Transport control (play/pause/stop/seek, ±5s skips clamped to the track)
//! - Tempo control in 5% steps (0.25x to 2.45x)
//! - A/B loops captured from the playback position with a single control
//! - A position poller that keeps the UI in sync and enforces the loop
//!
//! # Architecture
//!
//! Decoding and audio output belong to the platform. The controller wraps a
//! platform [`AudioPrimitive`] (Android `MediaPlayer`, a desktop decoder and
//! output stream, ...) built by a [`PrimitiveFactory`] on every load.
//!
//! - [`PlaybackEngine`] owns the primitive and exposes the transport
//! - [`LoopController`] is the loop capture state machine layered on top
//! - [`Session`] combines both with tick handling; it is the only writer
//! - [`Player`] runs a session on its own thread and feeds it commands and
//!   [`PositionPoller`] ticks over channels
//!
//! Notifications go to a [`PlaybackListener`] injected at construction.
//!
//! # Example
//!
//! ```rust
//! use abloop_playback::{NoopListener, PlayerConfig, Session, SimulatedFactory};
//! use std::sync::Arc;
//!
//! let factory = SimulatedFactory::new().with_track("song.mp3", 180_000);
//! let mut session = Session::new(
//!     Box::new(factory.clone()),
//!     Arc::new(NoopListener),
//!     &PlayerConfig::default(),
//! );
//!
//! session.load(&"song.mp3".into()).unwrap();
//! session.seek_to(30_000).unwrap();
//! session.set_loop().unwrap(); // loop start
//! session.seek_to(45_000).unwrap();
//! let update = session.set_loop().unwrap(); // loop end, armed
//!
//! assert!(update.region.armed);
//! assert_eq!(update.labels.start, "Loop Start: 0:30");
//! ```

mod engine;
mod error;
mod events;
mod looping;
mod player;
mod poller;
mod primitive;
mod session;
mod speed;
mod types;

// Public exports
pub use engine::PlaybackEngine;
pub use error::{PlaybackError, PrimitiveError, Result};
pub use events::{ChannelListener, NoopListener, PlaybackEvent, PlaybackListener};
pub use looping::{LoopController, LoopLabels, LoopRegion, LoopStage, LoopUpdate};
pub use player::Player;
pub use poller::{PollerState, PositionPoller};
pub use primitive::{
    AudioPrimitive, PrimitiveFactory, SimulatedFactory, SimulatedHandle, SimulatedPrimitive,
};
pub use session::{Session, TickOutcome};
pub use speed::{SpeedDirection, SpeedFactor, SpeedOutOfRange};
pub use types::{
    format_time, MediaSource, PlaybackSnapshot, PlaybackState, PlayerConfig, Ready,
};
