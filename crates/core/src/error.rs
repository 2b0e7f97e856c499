/// Result alias that carries the custom [`KeepsakeError`] type.
pub type Result<T> = std::result::Result<T, KeepsakeError>;

/// Outcome of a playback request issued to the host environment.
pub type PlayOutcome = std::result::Result<(), PlaybackRejected>;

/// The host refused to start playback, usually because of an autoplay policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("playback rejected: {reason}")]
pub struct PlaybackRejected {
    pub reason: String,
}

impl PlaybackRejected {
    pub fn new<T: Into<String>>(reason: T) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum KeepsakeError {
    /// Free-form message for conditions without a dedicated variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Configuration or manifest could not be parsed.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    PlaybackRejected(#[from] PlaybackRejected),
    /// A media element failed to load. Contained to the tile that raised it.
    #[error("media `{tile}` failed to load: {reason}")]
    MediaLoad { tile: String, reason: String },
    /// An index outside the feed reached the viewer. Navigation wraps, so
    /// this only happens when a caller opens a tile that does not exist.
    #[error("index {index} is out of range for a feed of {len} items")]
    InvalidNavigationIndex { index: usize, len: usize },
    #[error("unknown tile `{0}`")]
    UnknownTile(String),
}

impl KeepsakeError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for KeepsakeError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for KeepsakeError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
