use std::{
    fmt,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};

use crate::{assets::MediaAsset, timeline::LoadDeadline, KeepsakeError};

/// Identity of a mounted feed tile. Matches the [`MediaAsset::id`] it renders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileId(pub String);

impl TileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&MediaAsset> for TileId {
    fn from(asset: &MediaAsset) -> Self {
        Self(asset.id.clone())
    }
}

impl From<&str> for TileId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Playback lifecycle events reported by the rendering collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event", content = "reason")]
pub enum MediaEvent {
    Loaded,
    Error(String),
    Play,
    Pause,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileStatus {
    Loading,
    /// Still not loaded after the deadline; rendered as if ready.
    TimedOut,
    Ready,
    /// Terminal. The tile shows an inline error affordance.
    Failed(String),
}

/// Load and playback state of one tile as seen by the renderer.
#[derive(Debug, Clone)]
pub struct TileState {
    id: TileId,
    status: TileStatus,
    deadline: LoadDeadline,
    playing: bool,
}

impl TileState {
    pub fn new(id: TileId, now: Instant, load_timeout: Duration) -> Self {
        Self {
            id,
            status: TileStatus::Loading,
            deadline: LoadDeadline::new(now, load_timeout),
            playing: false,
        }
    }

    pub fn id(&self) -> &TileId {
        &self.id
    }

    pub fn status(&self) -> &TileStatus {
        &self.status
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, TileStatus::Failed(_))
    }

    /// Last playing state reported by the host.
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn apply(&mut self, event: &MediaEvent) {
        match event {
            MediaEvent::Loaded => {
                if !self.is_failed() {
                    self.status = TileStatus::Ready;
                }
            }
            MediaEvent::Error(reason) => {
                let err = KeepsakeError::MediaLoad {
                    tile: self.id.to_string(),
                    reason: reason.clone(),
                };
                tracing::error!(%err, "tile failed to load");
                self.status = TileStatus::Failed(reason.clone());
                self.playing = false;
            }
            MediaEvent::Play => self.playing = true,
            MediaEvent::Pause => self.playing = false,
        }
    }

    /// Moves a tile that is still loading past its deadline to
    /// [`TileStatus::TimedOut`]. Returns `true` on that transition only.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.status == TileStatus::Loading && self.deadline.expired(now) {
            tracing::warn!(tile = %self.id, "media load timed out");
            self.status = TileStatus::TimedOut;
            return true;
        }
        false
    }

    pub fn is_loading(&self, now: Instant) -> bool {
        self.status == TileStatus::Loading && !self.deadline.expired(now)
    }

    pub fn shows_play_overlay(&self, now: Instant) -> bool {
        !self.is_loading(now) && !self.is_failed() && !self.playing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn tile(now: Instant) -> TileState {
        TileState::new(TileId::new("clip.mp4"), now, TIMEOUT)
    }

    #[test]
    fn loading_is_bounded_by_deadline() {
        let t0 = Instant::now();
        let mut state = tile(t0);

        assert!(state.is_loading(t0));
        assert!(!state.poll(t0 + Duration::from_secs(1)));
        assert!(!state.is_loading(t0 + TIMEOUT));

        assert!(state.poll(t0 + TIMEOUT));
        assert_eq!(state.status(), &TileStatus::TimedOut);
        assert!(!state.poll(t0 + TIMEOUT * 2));
    }

    #[test]
    fn late_load_after_timeout_becomes_ready() {
        let t0 = Instant::now();
        let mut state = tile(t0);
        state.poll(t0 + TIMEOUT);
        state.apply(&MediaEvent::Loaded);
        assert_eq!(state.status(), &TileStatus::Ready);
    }

    #[test]
    fn failure_is_terminal() {
        let t0 = Instant::now();
        let mut state = tile(t0);
        state.apply(&MediaEvent::Error("decode".into()));
        state.apply(&MediaEvent::Loaded);

        assert!(state.is_failed());
        assert!(!state.is_loading(t0));
        assert!(!state.shows_play_overlay(t0));
    }

    #[test]
    fn play_overlay_tracks_host_events() {
        let t0 = Instant::now();
        let mut state = tile(t0);
        assert!(!state.shows_play_overlay(t0));

        state.apply(&MediaEvent::Loaded);
        assert!(state.shows_play_overlay(t0));

        state.apply(&MediaEvent::Play);
        assert!(state.is_playing());
        assert!(!state.shows_play_overlay(t0));

        state.apply(&MediaEvent::Pause);
        assert!(state.shows_play_overlay(t0));
    }

    #[test]
    fn media_events_parse_from_json() {
        let event: MediaEvent =
            serde_json::from_str(r#"{ "event": "error", "reason": "404" }"#).unwrap();
        assert_eq!(event, MediaEvent::Error("404".into()));
        let event: MediaEvent = serde_json::from_str(r#"{ "event": "loaded" }"#).unwrap();
        assert_eq!(event, MediaEvent::Loaded);
    }
}
