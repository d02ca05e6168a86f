//! Core types for the playback controller

use crate::looping::{LoopRegion, LoopStage};
use crate::speed::SpeedFactor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    /// No track loaded (or the engine was released)
    Uninitialized,

    /// Track loaded, not started or stopped at the beginning
    Stopped,

    /// Currently playing
    Playing,

    /// Paused mid-track
    Paused,
}

impl PlaybackState {
    /// Whether a track is loaded
    pub fn is_initialized(self) -> bool {
        self != Self::Uninitialized
    }
}

/// Where a track comes from
///
/// Acquiring the media (file picker, download, decoding a shared link) is up
/// to the host. The controller only hands this to the audio primitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaSource {
    /// Local file
    Path(PathBuf),

    /// Content or network URI understood by the platform primitive
    Uri(String),
}

impl fmt::Display for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaSource::Path(path) => write!(f, "{}", path.display()),
            MediaSource::Uri(uri) => f.write_str(uri),
        }
    }
}

impl From<PathBuf> for MediaSource {
    fn from(path: PathBuf) -> Self {
        MediaSource::Path(path)
    }
}

impl From<&str> for MediaSource {
    fn from(uri: &str) -> Self {
        MediaSource::Uri(uri.to_string())
    }
}

/// Returned by a successful load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ready {
    /// Track duration reported by the primitive after preparing
    pub duration_ms: u64,
}

/// Point-in-time view of the player, for UI refreshes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub speed: SpeedFactor,
    pub loop_region: LoopRegion,
    pub loop_stage: LoopStage,
}

/// Configuration for the player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Position poller period in milliseconds (default: 1000)
    pub poll_interval_ms: u64,

    /// Skip forward/backward offset in milliseconds (default: 5000)
    pub skip_ms: u64,

    /// Distance kept between a loop end and the physical end of the track
    /// (default: 250)
    pub end_guard_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            skip_ms: 5000,
            end_guard_ms: 250,
        }
    }
}

impl PlayerConfig {
    /// Poller period as a [`Duration`]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Check that the configuration is usable
    pub fn validate(&self) -> Result<(), String> {
        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Format milliseconds as `m:ss` for labels
pub fn format_time(ms: u64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1000;
    format!("{}:{:02}", minutes, seconds)
}
