//! Session-scoped context tying the feed, autoplay, viewer and background
//! audio together. One `Session` exists per page session; nothing in it is
//! global.

use std::{sync::Arc, time::Instant};

use serde::{Deserialize, Serialize};

use crate::{
    ambient::{AmbientAudio, AudioSink},
    assets::{AssetClassifier, AssetPool, MediaKind},
    autoplay::{AutoplayController, PlaybackHost, RequestId, VisibilityObserver},
    config::AppConfig,
    error::PlayOutcome,
    feed::{FeedComposer, FeedSequence},
    tile::{MediaEvent, TileId},
    viewer::ModalViewer,
    KeepsakeError, Result,
};

/// Discrete user intents reported by the input collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "intent", content = "index")]
pub enum InputIntent {
    OpenViewer(usize),
    CloseViewer,
    Next,
    Prev,
    TogglePlay,
    ToggleMute,
    EscapeKey,
    ToggleAmbient,
    ToggleAmbientMute,
}

/// What the renderer needs to mount a tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileDescriptor {
    pub id: TileId,
    pub kind: MediaKind,
    pub src: String,
    pub caption: String,
}

pub struct Session<H, S, O>
where
    H: PlaybackHost,
    S: AudioSink,
    O: VisibilityObserver,
{
    feed: Arc<FeedSequence>,
    autoplay: AutoplayController,
    viewer: ModalViewer,
    ambient: AmbientAudio<S>,
    host: H,
    observer: O,
}

impl<H, S, O> Session<H, S, O>
where
    H: PlaybackHost,
    S: AudioSink,
    O: VisibilityObserver,
{
    /// Composes the feed from `pool`, starts the background track and arms
    /// the autoplay settle delay.
    pub fn new(
        config: &AppConfig,
        pool: &AssetPool,
        host: H,
        sink: S,
        observer: O,
        now: Instant,
    ) -> Self {
        let classifier = AssetClassifier::from_config(&config.feed);
        let composer = FeedComposer::from_config(&config.feed);
        let feed = Arc::new(composer.compose_pool(&classifier, pool));

        let mut autoplay = AutoplayController::new(&config.autoplay);
        autoplay.arm(now);

        let mut ambient = AmbientAudio::new(sink, config.ambient.clone());
        ambient.start();

        tracing::info!(assets = pool.len(), feed = feed.len(), "session started");

        Self {
            viewer: ModalViewer::new(Arc::clone(&feed)),
            feed,
            autoplay,
            ambient,
            host,
            observer,
        }
    }

    pub fn feed(&self) -> &FeedSequence {
        &self.feed
    }

    pub fn viewer(&self) -> &ModalViewer {
        &self.viewer
    }

    pub fn ambient(&self) -> &AmbientAudio<S> {
        &self.ambient
    }

    pub fn autoplay(&self) -> &AutoplayController {
        &self.autoplay
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Render descriptors, pinned items first.
    pub fn tiles(&self) -> Vec<TileDescriptor> {
        self.feed
            .tiles()
            .map(|asset| TileDescriptor {
                id: TileId::from(asset),
                kind: asset.kind,
                src: asset.src.clone(),
                caption: asset.caption.clone(),
            })
            .collect()
    }

    /// Applies a user intent. Every intent also counts as the user gesture
    /// that may unblock the background track, except the track's own
    /// play/pause control, which starts it directly.
    pub fn dispatch(&mut self, intent: InputIntent) {
        if intent != InputIntent::ToggleAmbient {
            self.ambient.on_user_interaction();
        }

        match intent {
            InputIntent::OpenViewer(index) => {
                if let Err(err) = self.viewer.open(index, &mut self.ambient) {
                    tracing::error!(%err, "viewer open ignored");
                }
            }
            InputIntent::CloseViewer => self.viewer.close(&mut self.ambient),
            InputIntent::EscapeKey => self.viewer.escape(&mut self.ambient),
            InputIntent::Next => self.viewer.next(),
            InputIntent::Prev => self.viewer.prev(),
            InputIntent::TogglePlay => self.viewer.toggle_play(),
            InputIntent::ToggleMute => self.viewer.toggle_mute(),
            InputIntent::ToggleAmbient => self.ambient.toggle(),
            InputIntent::ToggleAmbientMute => self.ambient.toggle_mute(),
        }
    }

    /// Mounts every tile of the feed, as the renderer does after composition.
    pub fn mount_all(&mut self, now: Instant) {
        let tiles: Vec<_> = self
            .feed
            .tiles()
            .map(|asset| (TileId::from(asset), asset.kind))
            .collect();
        for (tile, kind) in tiles {
            self.autoplay.mount(tile, kind, now, &mut self.observer);
        }
    }

    /// Mounts a single tile, e.g. one re-attached after scrolling back.
    pub fn mount(&mut self, tile: &TileId, now: Instant) -> Result<()> {
        let kind = self
            .feed
            .find(tile.as_str())
            .map(|asset| asset.kind)
            .ok_or_else(|| KeepsakeError::UnknownTile(tile.to_string()))?;
        self.autoplay.mount(tile.clone(), kind, now, &mut self.observer);
        Ok(())
    }

    pub fn unmount(&mut self, tile: &TileId) {
        self.autoplay.unmount(tile, &mut self.observer);
    }

    pub fn poll(&mut self, now: Instant) {
        self.autoplay.poll(now, &mut self.observer);
    }

    pub fn on_visibility(&mut self, tile: &TileId, intersection_ratio: f32) {
        self.autoplay
            .on_visibility_change(tile, intersection_ratio, &mut self.host);
    }

    pub fn on_play_settled(&mut self, tile: &TileId, request: RequestId, outcome: PlayOutcome) {
        self.autoplay
            .on_play_settled(tile, request, outcome, &mut self.host);
    }

    pub fn on_media_event(&mut self, tile: &TileId, event: &MediaEvent) {
        self.autoplay.on_media_event(tile, event);
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, time::Duration};

    use super::*;
    use crate::{viewer::ViewerState, PlaybackRejected};

    #[derive(Default)]
    struct QueueHost {
        pending: VecDeque<(TileId, RequestId)>,
        paused: Vec<TileId>,
        muted: Vec<TileId>,
    }

    impl PlaybackHost for QueueHost {
        fn set_muted(&mut self, tile: &TileId, muted: bool) {
            if muted {
                self.muted.push(tile.clone());
            }
        }

        fn request_play(&mut self, tile: &TileId, request: RequestId) {
            self.pending.push_back((tile.clone(), request));
        }

        fn pause(&mut self, tile: &TileId) {
            self.paused.push(tile.clone());
        }
    }

    #[derive(Default)]
    struct Sink {
        blocked: bool,
        playing: bool,
    }

    impl AudioSink for Sink {
        fn play(&mut self) -> PlayOutcome {
            if self.blocked {
                return Err(PlaybackRejected::new("gesture required"));
            }
            self.playing = true;
            Ok(())
        }

        fn pause(&mut self) {
            self.playing = false;
        }

        fn set_muted(&mut self, _muted: bool) {}

        fn set_volume(&mut self, _volume: f32) {}

        fn set_looping(&mut self, _looping: bool) {}
    }

    #[derive(Default)]
    struct Observer {
        observed: Vec<TileId>,
    }

    impl VisibilityObserver for Observer {
        fn observe(&mut self, tile: &TileId) {
            self.observed.push(tile.clone());
        }

        fn unobserve(&mut self, tile: &TileId) {
            self.observed.retain(|t| t != tile);
        }
    }

    fn pool() -> AssetPool {
        let mut pool = AssetPool::new();
        for n in 1..=6 {
            pool.push(format!("/assets/photo-{n}.jpg"), format!("blob:p{n}"));
        }
        pool.push("/assets/dance.mp4", "blob:dance");
        pool.push("/assets/vows.mov", "blob:vows");
        pool
    }

    fn session(sink: Sink) -> (Session<QueueHost, Sink, Observer>, Instant) {
        let t0 = Instant::now();
        let mut session = Session::new(
            &AppConfig::default(),
            &pool(),
            QueueHost::default(),
            sink,
            Observer::default(),
            t0,
        );
        session.mount_all(t0);
        let now = t0 + Duration::from_secs(1);
        session.poll(now);
        (session, now)
    }

    #[test]
    fn tiles_expose_render_descriptors_in_order() {
        let (session, _) = session(Sink::default());
        let tiles = session.tiles();

        assert_eq!(tiles.len(), 8);
        assert_eq!(tiles[0].id, TileId::new("/assets/photo-1.jpg"));
        assert_eq!(tiles[0].caption, "Forever Us");
        assert_eq!(tiles[6].id, TileId::new("/assets/dance.mp4"));
        assert_eq!(tiles[6].kind, MediaKind::Video);
        assert_eq!(tiles[7].caption, "Our Moments");
        assert_eq!(session.observer().observed.len(), 2);
    }

    #[test]
    fn viewer_ducks_and_restores_background_audio() {
        let (mut session, _) = session(Sink::default());
        assert!(session.ambient().is_playing());

        session.dispatch(InputIntent::OpenViewer(4));
        assert!(session.viewer().is_open());
        assert!(!session.ambient().is_playing());
        assert!(!session.ambient().sink().playing);

        session.dispatch(InputIntent::Next);
        session.dispatch(InputIntent::EscapeKey);
        assert_eq!(session.viewer().state(), ViewerState::Closed);
        assert!(session.ambient().is_playing());
    }

    #[test]
    fn opening_viewer_as_first_gesture_keeps_audio_quiet() {
        let (mut session, _) = session(Sink {
            blocked: true,
            ..Sink::default()
        });
        assert!(!session.ambient().is_playing());

        // The tap both unblocks the track and opens the viewer.
        session.ambient.sink_mut().blocked = false;
        session.dispatch(InputIntent::OpenViewer(0));
        assert!(!session.ambient().is_playing());

        session.dispatch(InputIntent::CloseViewer);
        assert!(session.ambient().is_playing());
    }

    #[test]
    fn first_play_tap_after_blocked_start_plays() {
        let (mut session, _) = session(Sink {
            blocked: true,
            ..Sink::default()
        });
        session.ambient.sink_mut().blocked = false;

        session.dispatch(InputIntent::ToggleAmbient);
        assert!(session.ambient().is_playing());
        assert!(session.ambient().sink().playing);

        session.dispatch(InputIntent::ToggleAmbient);
        assert!(!session.ambient().is_playing());
        session.dispatch(InputIntent::Next);
        assert!(!session.ambient().is_playing());
    }

    #[test]
    fn invalid_open_is_contained() {
        let (mut session, _) = session(Sink::default());
        session.dispatch(InputIntent::OpenViewer(99));

        assert!(!session.viewer().is_open());
        assert!(session.ambient().is_playing());
    }

    #[test]
    fn scroll_past_video_ends_paused() {
        let (mut session, _) = session(Sink::default());
        let tile = TileId::new("/assets/dance.mp4");

        session.on_visibility(&tile, 0.8);
        session.on_visibility(&tile, 0.3);
        let (settled_tile, request) = session.host_mut().pending.pop_front().unwrap();
        session.on_play_settled(&settled_tile, request, Ok(()));

        assert!(!session.autoplay().is_playing(&tile));
        assert_eq!(session.host().paused.last(), Some(&tile));
        assert_eq!(session.host().muted, [tile]);
    }

    #[test]
    fn failed_media_does_not_block_siblings() {
        let (mut session, _) = session(Sink::default());
        let broken = TileId::new("/assets/dance.mp4");
        let healthy = TileId::new("/assets/vows.mov");

        session.on_media_event(&broken, &MediaEvent::Error("404".into()));
        session.on_visibility(&broken, 1.0);
        session.on_visibility(&healthy, 1.0);

        let (tile, request) = session.host_mut().pending.pop_front().unwrap();
        assert_eq!(tile, healthy);
        session.on_play_settled(&tile, request, Ok(()));
        assert!(session.autoplay().is_playing(&healthy));
        assert!(session.autoplay().tile(&broken).unwrap().is_failed());
    }

    #[test]
    fn remounting_reobserves_known_tiles_only() {
        let (mut session, now) = session(Sink::default());
        let clip = TileId::new("/assets/vows.mov");

        session.unmount(&clip);
        assert_eq!(session.observer().observed.len(), 1);
        session.mount(&clip, now).unwrap();
        assert_eq!(session.observer().observed.len(), 2);

        let err = session.mount(&TileId::new("nope.mp4"), now).unwrap_err();
        assert!(matches!(err, KeepsakeError::UnknownTile(id) if id == "nope.mp4"));
    }

    #[test]
    fn intents_parse_from_json() {
        let open: InputIntent =
            serde_json::from_str(r#"{ "intent": "open_viewer", "index": 3 }"#).unwrap();
        assert_eq!(open, InputIntent::OpenViewer(3));
        let escape: InputIntent = serde_json::from_str(r#"{ "intent": "escape_key" }"#).unwrap();
        assert_eq!(escape, InputIntent::EscapeKey);
    }
}
