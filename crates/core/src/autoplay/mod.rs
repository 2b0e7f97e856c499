//! Visibility driven autoplay for feed tiles.
//!
//! Feed videos play silently while at least `visibility_threshold` of the
//! tile is on screen and pause otherwise. Play requests complete
//! asynchronously on the host; the controller only remembers the latest
//! desired state per tile and reconciles whenever a request settles.

use std::{
    collections::BTreeMap,
    fmt,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};

use crate::{
    assets::MediaKind,
    config::AutoplayConfig,
    error::PlayOutcome,
    tile::{MediaEvent, TileId, TileState},
    timeline::SettleTimer,
    KeepsakeError,
};

/// Correlates a play request with its eventual outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Media element operations the rendering collaborator exposes for feed
/// tiles. `request_play` must not block; the host reports the outcome later
/// through [`AutoplayController::on_play_settled`] with the same request id.
pub trait PlaybackHost {
    fn set_muted(&mut self, tile: &TileId, muted: bool);
    fn request_play(&mut self, tile: &TileId, request: RequestId);
    fn pause(&mut self, tile: &TileId);
}

/// Subscription side of the renderer's visibility observation primitive.
pub trait VisibilityObserver {
    fn observe(&mut self, tile: &TileId);
    fn unobserve(&mut self, tile: &TileId);
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    request: RequestId,
    attempt: u32,
}

#[derive(Debug)]
struct Entry {
    kind: MediaKind,
    state: TileState,
    observed: bool,
    want_visible: bool,
    pending: Option<Pending>,
    playing: bool,
}

#[derive(Debug)]
pub struct AutoplayController {
    threshold: f32,
    max_retries: u32,
    load_timeout: Duration,
    settle: SettleTimer,
    entries: BTreeMap<TileId, Entry>,
    next_request: u64,
}

impl Default for AutoplayController {
    fn default() -> Self {
        Self::new(&AutoplayConfig::default())
    }
}

impl AutoplayController {
    pub fn new(config: &AutoplayConfig) -> Self {
        Self {
            threshold: config.visibility_threshold,
            max_retries: config.max_play_retries,
            load_timeout: config.load_timeout(),
            settle: SettleTimer::new(config.settle_delay()),
            entries: BTreeMap::new(),
            next_request: 0,
        }
    }

    /// Starts the settle delay. Called once the feed sequence is composed.
    pub fn arm(&mut self, now: Instant) {
        self.settle.start(now);
    }

    pub fn is_observing(&self, now: Instant) -> bool {
        self.settle.is_settled(now)
    }

    /// Registers mounted video tiles with the observer once the settle delay
    /// has elapsed and expires stale load deadlines. Returns the number of
    /// tiles newly registered.
    pub fn poll(&mut self, now: Instant, observer: &mut impl VisibilityObserver) -> usize {
        for entry in self.entries.values_mut() {
            entry.state.poll(now);
        }

        if !self.settle.is_settled(now) {
            return 0;
        }

        let mut registered = 0;
        for (id, entry) in &mut self.entries {
            if entry.kind == MediaKind::Video && !entry.observed {
                observer.observe(id);
                entry.observed = true;
                registered += 1;
            }
        }
        if registered > 0 {
            tracing::debug!(registered, "registered tiles for visibility");
        }
        registered
    }

    pub fn mount(
        &mut self,
        tile: TileId,
        kind: MediaKind,
        now: Instant,
        observer: &mut impl VisibilityObserver,
    ) {
        let observed = kind == MediaKind::Video && self.settle.is_settled(now);
        if observed {
            observer.observe(&tile);
        }
        let entry = Entry {
            kind,
            state: TileState::new(tile.clone(), now, self.load_timeout),
            observed,
            want_visible: false,
            pending: None,
            playing: false,
        };
        if let Some(previous) = self.entries.insert(tile.clone(), entry) {
            if previous.observed && !observed {
                observer.unobserve(&tile);
            }
        }
    }

    pub fn unmount(&mut self, tile: &TileId, observer: &mut impl VisibilityObserver) {
        if let Some(entry) = self.entries.remove(tile) {
            if entry.observed {
                observer.unobserve(tile);
            }
        }
    }

    pub fn on_visibility_change(
        &mut self,
        tile: &TileId,
        intersection_ratio: f32,
        host: &mut impl PlaybackHost,
    ) {
        let Some(entry) = self.entries.get_mut(tile) else {
            tracing::trace!(%tile, "visibility change for unmounted tile");
            return;
        };
        if !entry.observed || entry.kind != MediaKind::Video || entry.state.is_failed() {
            return;
        }

        if intersection_ratio >= self.threshold {
            entry.want_visible = true;
            if entry.pending.is_none() && !entry.playing {
                let request = next_request(&mut self.next_request);
                issue_play(host, tile, entry, request, 0);
            }
        } else {
            entry.want_visible = false;
            if entry.playing || entry.pending.is_some() {
                host.pause(tile);
                entry.playing = false;
            }
        }
    }

    /// Reconciles the outcome of a play request with the latest desired
    /// state. A success for a tile that has since left the viewport is
    /// followed immediately by a pause.
    pub fn on_play_settled(
        &mut self,
        tile: &TileId,
        request: RequestId,
        outcome: PlayOutcome,
        host: &mut impl PlaybackHost,
    ) {
        let Some(entry) = self.entries.get_mut(tile) else {
            return;
        };

        let current = entry.pending.filter(|pending| pending.request == request);
        let Some(pending) = current else {
            if outcome.is_ok() && !entry.want_visible {
                host.pause(tile);
            }
            tracing::trace!(%tile, %request, "superseded play request settled");
            return;
        };
        entry.pending = None;

        match outcome {
            Ok(()) if entry.want_visible => entry.playing = true,
            Ok(()) => {
                host.pause(tile);
                entry.playing = false;
            }
            Err(_) if !entry.want_visible => entry.playing = false,
            Err(rejected) if pending.attempt < self.max_retries => {
                tracing::debug!(%tile, %rejected, "retrying muted playback");
                let request = next_request(&mut self.next_request);
                issue_play(host, tile, entry, request, pending.attempt + 1);
            }
            Err(rejected) => {
                let err = KeepsakeError::from(rejected);
                tracing::warn!(%tile, %err, "autoplay rejected, leaving tile paused");
                entry.playing = false;
            }
        }
    }

    pub fn on_media_event(&mut self, tile: &TileId, event: &MediaEvent) {
        let Some(entry) = self.entries.get_mut(tile) else {
            return;
        };
        entry.state.apply(event);
        match event {
            MediaEvent::Error(_) => {
                entry.pending = None;
                entry.want_visible = false;
                entry.playing = false;
            }
            MediaEvent::Pause => entry.playing = false,
            MediaEvent::Loaded | MediaEvent::Play => {}
        }
    }

    /// Whether the controller believes the tile is currently playing.
    pub fn is_playing(&self, tile: &TileId) -> bool {
        self.entries.get(tile).is_some_and(|entry| entry.playing)
    }

    pub fn desired_visible(&self, tile: &TileId) -> bool {
        self.entries.get(tile).is_some_and(|entry| entry.want_visible)
    }

    pub fn has_pending(&self, tile: &TileId) -> bool {
        self.entries
            .get(tile)
            .is_some_and(|entry| entry.pending.is_some())
    }

    pub fn tile(&self, tile: &TileId) -> Option<&TileState> {
        self.entries.get(tile).map(|entry| &entry.state)
    }

    pub fn mounted(&self) -> impl Iterator<Item = &TileState> {
        self.entries.values().map(|entry| &entry.state)
    }
}

fn next_request(counter: &mut u64) -> RequestId {
    *counter += 1;
    RequestId(*counter)
}

fn issue_play(
    host: &mut impl PlaybackHost,
    tile: &TileId,
    entry: &mut Entry,
    request: RequestId,
    attempt: u32,
) {
    host.set_muted(tile, true);
    host.request_play(tile, request);
    entry.pending = Some(Pending { request, attempt });
}
