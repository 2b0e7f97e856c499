//! Full-screen inspection of a single item of the interleaved feed.

use std::sync::Arc;

use serde::Serialize;

use crate::{assets::MediaAsset, feed::FeedSequence, KeepsakeError, Result};

/// Something that can step aside while the viewer is open.
pub trait Ducking {
    fn duck(&mut self);
    fn restore(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ViewerState {
    #[default]
    Closed,
    Open {
        index: usize,
        is_playing: bool,
        is_muted: bool,
    },
}

/// Modal viewer over the session's interleaved feed.
///
/// The feed length is fixed once composed, so every `Open` index stays valid
/// for the lifetime of the viewer. Navigation wraps in both directions.
#[derive(Debug)]
pub struct ModalViewer {
    feed: Arc<FeedSequence>,
    state: ViewerState,
}

impl ModalViewer {
    pub fn new(feed: Arc<FeedSequence>) -> Self {
        Self {
            feed,
            state: ViewerState::Closed,
        }
    }

    pub fn state(&self) -> ViewerState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, ViewerState::Open { .. })
    }

    pub fn active_index(&self) -> Option<usize> {
        match self.state {
            ViewerState::Open { index, .. } => Some(index),
            ViewerState::Closed => None,
        }
    }

    pub fn active_asset(&self) -> Option<&MediaAsset> {
        self.active_index().and_then(|index| self.feed.get(index))
    }

    /// Opens the viewer on `index`, muted and playing.
    ///
    /// Opening while already open retargets the single viewer without
    /// ducking a second time.
    pub fn open(&mut self, index: usize, ducking: &mut impl Ducking) -> Result<()> {
        let len = self.feed.len();
        if index >= len {
            return Err(KeepsakeError::InvalidNavigationIndex { index, len });
        }
        if !self.is_open() {
            ducking.duck();
        }
        self.state = ViewerState::Open {
            index,
            is_playing: true,
            is_muted: true,
        };
        tracing::debug!(index, "viewer opened");
        Ok(())
    }

    /// Closes the viewer. Closing an already closed viewer does nothing.
    pub fn close(&mut self, ducking: &mut impl Ducking) {
        if !self.is_open() {
            return;
        }
        self.state = ViewerState::Closed;
        ducking.restore();
        tracing::debug!("viewer closed");
    }

    pub fn escape(&mut self, ducking: &mut impl Ducking) {
        self.close(ducking);
    }

    pub fn next(&mut self) {
        let len = self.feed.len();
        self.navigate(|index| (index + 1) % len);
    }

    pub fn prev(&mut self) {
        let len = self.feed.len();
        self.navigate(|index| (index + len - 1) % len);
    }

    /// Moving to another item restarts playback and keeps the mute choice.
    fn navigate(&mut self, step: impl FnOnce(usize) -> usize) {
        if let ViewerState::Open {
            index, is_muted, ..
        } = self.state
        {
            let index = step(index);
            debug_assert!(index < self.feed.len());
            self.state = ViewerState::Open {
                index,
                is_playing: true,
                is_muted,
            };
        }
    }

    /// Flips play/pause for a video item. Images have nothing to play.
    pub fn toggle_play(&mut self) {
        let is_video = self.active_asset().is_some_and(MediaAsset::is_video);
        if let ViewerState::Open { is_playing, .. } = &mut self.state {
            if is_video {
                *is_playing = !*is_playing;
            }
        }
    }

    pub fn toggle_mute(&mut self) {
        if let ViewerState::Open { is_muted, .. } = &mut self.state {
            *is_muted = !*is_muted;
        }
    }
}
