//! Anti-flood filters for continuous input.
//!
//! DESIGN
//! ======
//! - Zoom and pan are recorded once per view. A view is `(diagram_id,
//!   revision)`, so committing new source re-arms both gestures.
//! - Button zoom and drag pan latch on first contact. Wheel zoom waits for a
//!   quiet period so one scroll burst becomes one event.
//! - Prompt typing is filtered by magnitude, not time: an update is recorded
//!   only when the text moved far enough from the last recorded prompt.
//!
//! All filters take explicit `Instant`s where time matters, so tests can drive
//! them without sleeping.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::session::ViewKey;

pub const DEFAULT_PROMPT_MIN_DELTA: usize = 5;
pub const DEFAULT_ZOOM_QUIET: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureKind {
    Zoom,
    Pan,
}

/// How a zoom was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomInput {
    Wheel,
    Button,
}

impl ZoomInput {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wheel => "wheel",
            Self::Button => "button",
        }
    }
}

// =============================================================================
// GESTURE LATCH
// =============================================================================

/// Remembers which gestures were already recorded on the current view.
///
/// Only live input moves the current view forward. Views never recur, so
/// entering a new one forgets everything latched on the old one.
#[derive(Debug, Default)]
pub struct GestureLatch {
    current: Option<ViewKey>,
    recorded: HashSet<GestureKind>,
}

impl GestureLatch {
    #[must_use]
    pub fn is_latched(&self, kind: GestureKind, view: ViewKey) -> bool {
        self.current == Some(view) && self.recorded.contains(&kind)
    }

    #[must_use]
    pub fn current(&self) -> Option<ViewKey> {
        self.current
    }

    /// Make `view` the current view.
    pub fn enter(&mut self, view: ViewKey) {
        if self.current != Some(view) {
            self.current = Some(view);
            self.recorded.clear();
        }
    }

    /// Latch `kind` for live input on `view`. Returns `true` only the first
    /// time on that view.
    pub fn latch(&mut self, kind: GestureKind, view: ViewKey) -> bool {
        self.enter(view);
        self.recorded.insert(kind)
    }

    /// Latch `kind` for deferred input that arrived on `view`. A view that is
    /// no longer current is stale and never latches.
    pub fn latch_if_current(&mut self, kind: GestureKind, view: ViewKey) -> bool {
        self.current == Some(view) && self.recorded.insert(kind)
    }
}

// =============================================================================
// WHEEL DEBOUNCE
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct PendingWheel {
    view: ViewKey,
    last_activity: Instant,
    epoch: u64,
}

/// Quiet-period debounce for wheel zoom.
#[derive(Debug)]
pub struct WheelDebounce {
    quiet: Duration,
    next_epoch: u64,
    pending: Option<PendingWheel>,
}

impl WheelDebounce {
    #[must_use]
    pub fn new(quiet: Duration) -> Self {
        Self { quiet, next_epoch: 0, pending: None }
    }

    #[must_use]
    pub fn quiet(&self) -> Duration {
        self.quiet
    }

    /// Register wheel activity. Returns the epoch a timer should settle with;
    /// any earlier epoch is superseded.
    pub fn observe_at(&mut self, view: ViewKey, now: Instant) -> u64 {
        self.next_epoch += 1;
        self.pending = Some(PendingWheel { view, last_activity: now, epoch: self.next_epoch });
        self.next_epoch
    }

    /// Settle a timer. Yields the view to record when `epoch` is still the
    /// latest activity and the quiet period has fully elapsed.
    pub fn settle_at(&mut self, epoch: u64, now: Instant) -> Option<ViewKey> {
        let pending = self.pending?;
        if pending.epoch != epoch || now.duration_since(pending.last_activity) < self.quiet {
            return None;
        }
        self.pending = None;
        Some(pending.view)
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl Default for WheelDebounce {
    fn default() -> Self {
        Self::new(DEFAULT_ZOOM_QUIET)
    }
}

// =============================================================================
// PROMPT TRACKER
// =============================================================================

/// Magnitude filter for `prompt_update`.
#[derive(Debug)]
pub struct PromptTracker {
    tracked: String,
    min_delta: usize,
}

impl PromptTracker {
    #[must_use]
    pub fn new(min_delta: usize) -> Self {
        Self { tracked: String::new(), min_delta }
    }

    #[must_use]
    pub fn tracked(&self) -> &str {
        &self.tracked
    }

    /// Observe the current prompt text. When it differs from the tracked prompt
    /// by more than `min_delta`, it becomes the tracked prompt and the previous
    /// one is returned.
    pub fn observe(&mut self, prompt: &str) -> Option<String> {
        if prompt_distance(&self.tracked, prompt) <= self.min_delta {
            return None;
        }
        Some(std::mem::replace(&mut self.tracked, prompt.to_owned()))
    }

    /// Adopt `prompt` without recording, e.g. after a submit.
    pub fn reset_to(&mut self, prompt: &str) {
        prompt.clone_into(&mut self.tracked);
    }
}

impl Default for PromptTracker {
    fn default() -> Self {
        Self::new(DEFAULT_PROMPT_MIN_DELTA)
    }
}

/// Length difference plus mismatched characters over the shared span.
#[must_use]
pub fn prompt_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mismatched = a.iter().zip(&b).filter(|(x, y)| x != y).count();
    a.len().abs_diff(b.len()) + mismatched
}

#[cfg(test)]
#[path = "gesture_test.rs"]
mod tests;
