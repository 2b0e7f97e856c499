use crate::{config::AmbientConfig, error::PlayOutcome, viewer::Ducking};

/// The single background audio element. Only [`AmbientAudio`] drives it.
pub trait AudioSink {
    fn play(&mut self) -> PlayOutcome;
    fn pause(&mut self);
    fn set_muted(&mut self, muted: bool);
    fn set_volume(&mut self, volume: f32);
    fn set_looping(&mut self, looping: bool);
}

/// Owns the background track and keeps it out of the way of the viewer.
///
/// Ducking is idempotent: a second [`duck`](Ducking::duck) before the matching
/// [`restore`](Ducking::restore) changes nothing, so the pre-duck state is
/// never overwritten by the already-paused state.
#[derive(Debug)]
pub struct AmbientAudio<S: AudioSink> {
    sink: S,
    config: AmbientConfig,
    is_playing: bool,
    is_muted: bool,
    ducked: bool,
    was_playing_before_duck: bool,
    awaiting_interaction: bool,
}

impl<S: AudioSink> AmbientAudio<S> {
    pub fn new(sink: S, config: AmbientConfig) -> Self {
        Self {
            sink,
            config,
            is_playing: false,
            is_muted: false,
            ducked: false,
            was_playing_before_duck: false,
            awaiting_interaction: false,
        }
    }

    /// Prepares the element and makes the first, possibly rejected, attempt
    /// to play. A rejection arms the user-interaction fallback.
    pub fn start(&mut self) {
        self.sink.set_volume(self.config.volume);
        self.sink.set_looping(self.config.looping);
        if !self.config.autostart {
            return;
        }
        match self.sink.play() {
            Ok(()) => {
                self.is_playing = true;
                tracing::debug!("ambient audio started");
            }
            Err(rejected) => {
                tracing::debug!(%rejected, "ambient autoplay blocked, waiting for interaction");
                self.awaiting_interaction = true;
            }
        }
    }

    /// Retries a blocked start after a click or touch. Never starts audio
    /// while ducked. Returns `true` if playback began.
    pub fn on_user_interaction(&mut self) -> bool {
        if !self.awaiting_interaction || self.is_playing || self.ducked {
            return false;
        }
        match self.sink.play() {
            Ok(()) => {
                self.is_playing = true;
                self.awaiting_interaction = false;
                tracing::debug!("ambient audio started after interaction");
                true
            }
            Err(rejected) => {
                tracing::trace!(%rejected, "ambient audio still blocked");
                false
            }
        }
    }

    /// User-initiated play/pause. Leaves the ducking bookkeeping alone.
    pub fn toggle(&mut self) {
        if self.is_playing {
            self.sink.pause();
            self.is_playing = false;
            return;
        }
        match self.sink.play() {
            Ok(()) => {
                self.is_playing = true;
                self.awaiting_interaction = false;
            }
            Err(rejected) => tracing::warn!(%rejected, "ambient audio failed to play"),
        }
    }

    pub fn toggle_mute(&mut self) {
        self.is_muted = !self.is_muted;
        self.sink.set_muted(self.is_muted);
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_muted(&self) -> bool {
        self.is_muted
    }

    pub fn is_ducked(&self) -> bool {
        self.ducked
    }

    pub fn was_playing_before_duck(&self) -> bool {
        self.was_playing_before_duck
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    #[cfg(test)]
    pub(crate) fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

impl<S: AudioSink> Ducking for AmbientAudio<S> {
    fn duck(&mut self) {
        if self.ducked {
            return;
        }
        self.ducked = true;
        self.was_playing_before_duck = self.is_playing;
        if self.is_playing {
            self.sink.pause();
            self.is_playing = false;
        }
        tracing::debug!(was_playing = self.was_playing_before_duck, "ambient audio ducked");
    }

    fn restore(&mut self) {
        self.ducked = false;
        if !std::mem::take(&mut self.was_playing_before_duck) || self.is_playing {
            return;
        }
        match self.sink.play() {
            Ok(()) => {
                self.is_playing = true;
                tracing::debug!("ambient audio restored");
            }
            Err(rejected) => tracing::warn!(%rejected, "ambient audio failed to resume"),
        }
    }
}
