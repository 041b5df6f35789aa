//! Image capture throttling.

use std::time::Duration;

use tokio::time::Instant;

/// Default minimum spacing between two captures.
pub const DEFAULT_CAPTURE_INTERVAL: Duration = Duration::from_secs(60);

/// Decides when the next image capture is allowed.
///
/// Owned by the acquisition loop. A schedule that never captured is due
/// immediately. Uses the tokio clock so paused-time tests are deterministic.
#[derive(Debug, Clone)]
pub struct CaptureSchedule {
    interval: Duration,
    last_capture_at: Option<Instant>,
}

impl Default for CaptureSchedule {
    fn default() -> Self {
        Self::new(DEFAULT_CAPTURE_INTERVAL)
    }
}

impl CaptureSchedule {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_capture_at: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn last_capture_at(&self) -> Option<Instant> {
        self.last_capture_at
    }

    /// Whether at least one interval has elapsed since the last capture.
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_capture_at {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }

    /// Earliest instant the next capture may happen.
    pub fn next_due(&self) -> Option<Instant> {
        self.last_capture_at.map(|last| last + self.interval)
    }

    /// Record a capture at `now`.
    pub fn mark(&mut self, now: Instant) {
        self.last_capture_at = Some(now);
    }
}
