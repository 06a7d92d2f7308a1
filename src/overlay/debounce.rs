// Trailing-edge debounce for render-surface pushes.
//
// Slider drags produce a burst of alpha edits; the render channel should see
// at most one message per quiet period, carrying the final value. Each
// request replaces the pending payload and restarts the quiet window, so the
// last value always wins and nothing is delivered early.
//
// Time is passed in explicitly rather than read from a clock, which keeps the
// timing behavior testable without sleeping.

use std::time::{Duration, Instant};

/// Quiet window between the last configuration edit and the render push.
pub const RENDER_QUIET_WINDOW: Duration = Duration::from_millis(150);

/// One debouncer per overlay window. Holds at most one pending payload.
#[derive(Debug)]
pub struct Debouncer<T> {
    quiet: Duration,
    pending: Option<T>,
    last_request: Option<Instant>,
}

impl<T> Debouncer<T> {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
            last_request: None,
        }
    }

    /// Replace the pending payload and restart the quiet window.
    pub fn request(&mut self, payload: T, now: Instant) {
        self.pending = Some(payload);
        self.last_request = Some(now);
    }

    /// Yield the pending payload once the quiet window has elapsed since the
    /// most recent request, clearing it.
    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        let requested_at = self.last_request?;
        if now.duration_since(requested_at) >= self.quiet {
            self.last_request = None;
            self.pending.take()
        } else {
            None
        }
    }

    /// Yield the pending payload regardless of elapsed time. Used on
    /// teardown so the final value is never dropped.
    pub fn flush(&mut self) -> Option<T> {
        self.last_request = None;
        self.pending.take()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_none()
    }
}
