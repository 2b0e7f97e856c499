//! Core library for the Keepsake media presentation.
//!
//! The crate owns the parts of the presentation with real state: composing
//! the media feed, driving silent autoplay from tile visibility, the modal
//! viewer, and the background track that steps aside while the viewer is
//! open. Rendering, input and audio elements are reached only through the
//! [`PlaybackHost`], [`VisibilityObserver`] and [`AudioSink`] traits.

pub mod ambient;
pub mod assets;
pub mod autoplay;
pub mod config;
pub mod error;
pub mod feed;
pub mod session;
pub mod tile;
pub mod timeline;
pub mod viewer;

pub use ambient::{AmbientAudio, AudioSink};
pub use assets::{AssetClassifier, AssetPool, MediaAsset, MediaKind};
pub use autoplay::{AutoplayController, PlaybackHost, RequestId, VisibilityObserver};
pub use config::{AmbientConfig, AppConfig, AutoplayConfig, FeedConfig};
pub use error::{KeepsakeError, PlayOutcome, PlaybackRejected, Result};
pub use feed::{FeedComposer, FeedSequence};
pub use session::{InputIntent, Session, TileDescriptor};
pub use tile::{MediaEvent, TileId, TileState, TileStatus};
pub use timeline::{LoadDeadline, SettleTimer};
pub use viewer::{Ducking, ModalViewer, ViewerState};
