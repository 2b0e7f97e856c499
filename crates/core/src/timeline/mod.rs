//! Small timing helpers. Callers always pass `now` explicitly so the session
//! can be driven deterministically from tests and scripted replays.

use std::time::{Duration, Instant};

/// Gate that opens a fixed delay after it is started.
///
/// Used to hold off visibility registration until freshly composed tiles
/// have had a chance to attach.
#[derive(Debug, Clone)]
pub struct SettleTimer {
    delay: Duration,
    started_at: Option<Instant>,
}

impl SettleTimer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            started_at: None,
        }
    }

    /// Starts (or restarts) the timer.
    pub fn start(&mut self, now: Instant) {
        self.started_at = Some(now);
    }

    /// A timer that was never started is never settled.
    pub fn is_settled(&self, now: Instant) -> bool {
        self.started_at
            .is_some_and(|started| now.saturating_duration_since(started) >= self.delay)
    }
}

/// Upper bound on how long something may keep reporting "loading".
#[derive(Debug, Clone, Copy)]
pub struct LoadDeadline {
    expires_at: Instant,
}

impl LoadDeadline {
    pub fn new(now: Instant, timeout: Duration) -> Self {
        Self {
            expires_at: now + timeout,
        }
    }

    pub fn expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}
