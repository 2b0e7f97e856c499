//! Scripted sessions driven against logging host adapters.

use std::{
    collections::VecDeque,
    path::Path,
    time::{Duration, Instant},
};

use keepsake_core::{
    AppConfig, AssetPool, AudioSink, InputIntent, MediaEvent, PlayOutcome, PlaybackHost,
    PlaybackRejected, RequestId, Session, TileId, TileStatus, ViewerState, VisibilityObserver,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Move the session clock forward.
    Advance { ms: u64 },
    Mount { tile: TileId },
    Unmount { tile: TileId },
    Visibility { tile: TileId, ratio: f32 },
    Media { tile: TileId, event: MediaEvent },
    /// Settle the oldest outstanding play request, optionally rejecting it.
    Settle {
        #[serde(default)]
        reject: Option<String>,
    },
    Intent { intent: InputIntent },
}

pub fn load_script(path: &Path) -> keepsake_core::Result<Vec<Step>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

#[derive(Debug, Serialize)]
pub struct TileReport {
    pub id: TileId,
    pub status: String,
    pub playing: bool,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub viewer: ViewerState,
    pub ambient_playing: bool,
    pub ambient_muted: bool,
    pub tiles: Vec<TileReport>,
    pub unsettled_requests: usize,
}

/// Feed tile host that logs every element operation and queues play
/// requests until the script settles them.
#[derive(Debug, Default)]
pub struct ScriptHost {
    pending: VecDeque<(TileId, RequestId)>,
}

impl PlaybackHost for ScriptHost {
    fn set_muted(&mut self, tile: &TileId, muted: bool) {
        tracing::info!(%tile, muted, "tile muted");
    }

    fn request_play(&mut self, tile: &TileId, request: RequestId) {
        tracing::info!(%tile, %request, "tile play requested");
        self.pending.push_back((tile.clone(), request));
    }

    fn pause(&mut self, tile: &TileId) {
        tracing::info!(%tile, "tile paused");
    }
}

/// Background audio element that optionally refuses playback until the
/// first retry, mimicking a browser autoplay policy.
#[derive(Debug, Default)]
pub struct ScriptSink {
    blocked: bool,
}

impl AudioSink for ScriptSink {
    fn play(&mut self) -> PlayOutcome {
        if std::mem::take(&mut self.blocked) {
            return Err(PlaybackRejected::new("user gesture required"));
        }
        tracing::info!("ambient playing");
        Ok(())
    }

    fn pause(&mut self) {
        tracing::info!("ambient paused");
    }

    fn set_muted(&mut self, muted: bool) {
        tracing::info!(muted, "ambient muted");
    }

    fn set_volume(&mut self, volume: f32) {
        tracing::debug!(volume, "ambient volume");
    }

    fn set_looping(&mut self, looping: bool) {
        tracing::debug!(looping, "ambient looping");
    }
}

#[derive(Debug, Default)]
pub struct LogObserver;

impl VisibilityObserver for LogObserver {
    fn observe(&mut self, tile: &TileId) {
        tracing::debug!(%tile, "observing");
    }

    fn unobserve(&mut self, tile: &TileId) {
        tracing::debug!(%tile, "stopped observing");
    }
}

pub fn run(
    config: &AppConfig,
    pool: &AssetPool,
    steps: Vec<Step>,
    block_autoplay: bool,
) -> Report {
    let mut now = Instant::now();
    let sink = ScriptSink {
        blocked: block_autoplay,
    };
    let mut session = Session::new(config, pool, ScriptHost::default(), sink, LogObserver, now);
    session.mount_all(now);

    for step in steps {
        tracing::debug!(?step, "step");
        match step {
            Step::Advance { ms } => now += Duration::from_millis(ms),
            Step::Mount { tile } => {
                if let Err(err) = session.mount(&tile, now) {
                    tracing::warn!(%err, "mount step skipped");
                }
            }
            Step::Unmount { tile } => session.unmount(&tile),
            Step::Visibility { tile, ratio } => session.on_visibility(&tile, ratio),
            Step::Media { tile, event } => session.on_media_event(&tile, &event),
            Step::Settle { reject } => match session.host_mut().pending.pop_front() {
                Some((tile, request)) => {
                    let outcome = match reject {
                        Some(reason) => Err(PlaybackRejected::new(reason)),
                        None => Ok(()),
                    };
                    session.on_play_settled(&tile, request, outcome);
                }
                None => tracing::warn!("settle step with no outstanding play request"),
            },
            Step::Intent { intent } => session.dispatch(intent),
        }
        session.poll(now);
    }

    report(&session)
}

fn report(session: &Session<ScriptHost, ScriptSink, LogObserver>) -> Report {
    let autoplay = session.autoplay();
    let tiles = autoplay
        .mounted()
        .map(|state| TileReport {
            id: state.id().clone(),
            status: match state.status() {
                TileStatus::Loading => "loading".to_string(),
                TileStatus::TimedOut => "timed_out".to_string(),
                TileStatus::Ready => "ready".to_string(),
                TileStatus::Failed(reason) => format!("failed: {reason}"),
            },
            playing: autoplay.is_playing(state.id()),
        })
        .collect();

    Report {
        viewer: session.viewer().state(),
        ambient_playing: session.ambient().is_playing(),
        ambient_muted: session.ambient().is_muted(),
        tiles,
        unsettled_requests: session.host().pending.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> AssetPool {
        AssetPool::from_pairs([
            ("a.jpg", "blob:a"),
            ("b.jpg", "blob:b"),
            ("c.jpg", "blob:c"),
            ("clip.mp4", "blob:clip"),
        ])
    }

    fn script(json: &str) -> Vec<Step> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn replays_scroll_and_viewer_session() {
        let steps = script(
            r#"[
                { "step": "advance", "ms": 200 },
                { "step": "visibility", "tile": "clip.mp4", "ratio": 0.9 },
                { "step": "settle" },
                { "step": "intent", "intent": { "intent": "open_viewer", "index": 1 } },
                { "step": "intent", "intent": { "intent": "toggle_play" } },
                { "step": "media", "tile": "c.jpg", "event": { "event": "loaded" } }
            ]"#,
        );
        let report = run(&AppConfig::default(), &pool(), steps, false);

        assert_eq!(
            report.viewer,
            ViewerState::Open {
                index: 1,
                is_playing: false,
                is_muted: true
            }
        );
        assert!(!report.ambient_playing);
        let clip = report.tiles.iter().find(|t| t.id.as_str() == "clip.mp4").unwrap();
        assert!(clip.playing);
        let still = report.tiles.iter().find(|t| t.id.as_str() == "c.jpg").unwrap();
        assert_eq!(still.status, "ready");
    }

    #[test]
    fn blocked_ambient_starts_on_first_gesture() {
        let steps =
            script(r#"[{ "step": "intent", "intent": { "intent": "toggle_ambient_mute" } }]"#);
        let report = run(&AppConfig::default(), &pool(), steps, true);

        assert!(report.ambient_playing);
        assert!(report.ambient_muted);
    }

    #[test]
    fn visibility_before_settle_delay_is_ignored() {
        let steps = script(
            r#"[
                { "step": "visibility", "tile": "clip.mp4", "ratio": 1.0 },
                { "step": "settle" }
            ]"#,
        );
        let report = run(&AppConfig::default(), &pool(), steps, false);

        assert_eq!(report.unsettled_requests, 0);
        assert!(report.tiles.iter().all(|t| !t.playing));
    }

    #[test]
    fn slow_tiles_stop_loading_after_timeout() {
        let steps = script(r#"[{ "step": "advance", "ms": 6000 }]"#);
        let report = run(&AppConfig::default(), &pool(), steps, false);

        assert!(report.tiles.iter().all(|t| t.status == "timed_out"));
    }
}
