//! Error types for the playback controller

use thiserror::Error;

/// Errors raised by an [`AudioPrimitive`](crate::AudioPrimitive) implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrimitiveError {
    /// The media source could not be bound
    #[error("Cannot bind data source: {0}")]
    DataSource(String),

    /// Preparing the bound source failed
    #[error("Prepare failed: {0}")]
    Prepare(String),

    /// Operation is not valid in the primitive's current state
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// Any other platform failure
    #[error("{0}")]
    Other(String),
}

/// Playback controller errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Binding or preparing a media source failed; engine is left uninitialized
    #[error("Failed to load {media}: {reason}")]
    MediaLoad {
        /// Display form of the media source
        media: String,
        /// Underlying failure
        reason: PrimitiveError,
    },

    /// Transport call on an engine with no track loaded
    #[error("No track loaded")]
    Uninitialized,

    /// The underlying primitive rejected a transport call
    #[error("Audio primitive error: {0}")]
    Primitive(#[from] PrimitiveError),

    /// The owning player thread has shut down
    #[error("Player has been shut down")]
    PlayerStopped,

    /// Configuration rejected at startup
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error (spawning worker threads)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
