//! Fire-and-forget telemetry emitter.
//!
//! DESIGN
//! ======
//! `record` stamps the action and hands it to a background dispatcher, which
//! starts one delivery task per event. A slow or hanging delivery never holds
//! up later events. Each event gets exactly one attempt: failures are logged,
//! nothing is retried and nothing is surfaced to the caller. At most
//! `MAX_IN_FLIGHT` deliveries run at once; events beyond that are dropped.
//!
//! Gesture filters (latch, wheel debounce, prompt magnitude) live behind a
//! mutex shared by clones of the emitter and by wheel timers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::event::{Action, ActionType, TelemetryError, TelemetryEvent};
use super::gesture::{
    DEFAULT_PROMPT_MIN_DELTA, DEFAULT_ZOOM_QUIET, GestureKind, GestureLatch, PromptTracker, WheelDebounce,
};
use super::sink::TelemetrySink;
use crate::identity::Identity;
use crate::session::{DiagramId, ViewKey};

pub const MAX_IN_FLIGHT: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub prompt_min_delta: usize,
    pub zoom_quiet: Duration,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { prompt_min_delta: DEFAULT_PROMPT_MIN_DELTA, zoom_quiet: DEFAULT_ZOOM_QUIET }
    }
}

enum WorkerMsg {
    Event(Box<TelemetryEvent>),
    Flush(oneshot::Sender<()>),
}

struct GestureState {
    latch: GestureLatch,
    wheel: WheelDebounce,
    prompts: PromptTracker,
}

#[derive(Clone)]
pub struct TelemetryEmitter {
    identity: Identity,
    tx: mpsc::UnboundedSender<WorkerMsg>,
    gestures: Arc<Mutex<GestureState>>,
}

impl TelemetryEmitter {
    /// Spawn the dispatcher and return an emitter feeding it.
    ///
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn spawn(identity: Identity, sink: Arc<dyn TelemetrySink>, config: TelemetryConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_dispatcher(sink, rx));
        let gestures = GestureState {
            latch: GestureLatch::default(),
            wheel: WheelDebounce::new(config.zoom_quiet),
            prompts: PromptTracker::new(config.prompt_min_delta),
        };
        Self { identity, tx, gestures: Arc::new(Mutex::new(gestures)) }
    }

    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Stamp and queue an action. Never blocks, never fails.
    pub fn record(&self, action: Action) {
        let event = action.stamp(&self.identity, OffsetDateTime::now_utc());
        debug!(action_type = %event.action_type, diagram_id = ?event.diagram_id, "telemetry queued");
        if self.tx.send(WorkerMsg::Event(Box::new(event))).is_err() {
            warn!("telemetry dispatcher stopped; event dropped");
        }
    }

    /// Validate and record a rating. Invalid ratings are returned to the
    /// caller and never queued.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidFeedback`] for a missing or out-of-range rating.
    pub fn record_feedback(
        &self,
        diagram_id: DiagramId,
        source: &str,
        rating: Option<u8>,
        text: &str,
    ) -> Result<(), TelemetryError> {
        let action = Action::feedback(rating, text)?.diagram(diagram_id).code(source);
        self.record(action);
        Ok(())
    }

    /// Record a gesture that latches on first contact (button zoom, drag pan).
    /// Returns `true` when an event was queued.
    pub fn record_gesture(&self, kind: GestureKind, view: ViewKey, action: Action) -> bool {
        let first = self.lock_gestures().latch.latch(kind, view);
        if first {
            self.record(action);
        }
        first
    }

    /// Record a wheel zoom once the wheel has been quiet for the configured
    /// period. Activity on an already-latched view is ignored, and a burst
    /// that settles after the view moved on is dropped.
    pub fn record_wheel_zoom(&self, view: ViewKey, action: Action) {
        let (epoch, quiet) = {
            let mut gestures = self.lock_gestures();
            if gestures.latch.is_latched(GestureKind::Zoom, view) {
                return;
            }
            gestures.latch.enter(view);
            let now = tokio::time::Instant::now().into_std();
            (gestures.wheel.observe_at(view, now), gestures.wheel.quiet())
        };

        let emitter = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            let fire = {
                let mut gestures = emitter.lock_gestures();
                let now = tokio::time::Instant::now().into_std();
                match gestures.wheel.settle_at(epoch, now) {
                    Some(settled) => gestures.latch.latch_if_current(GestureKind::Zoom, settled),
                    None => false,
                }
            };
            if fire {
                emitter.record(action);
            }
        });
    }

    /// Feed the current prompt text through the magnitude filter, recording a
    /// `prompt_update` when it moved far enough. Returns `true` when recorded.
    pub fn observe_prompt(&self, diagram_id: DiagramId, prompt: &str) -> bool {
        let previous = self.lock_gestures().prompts.observe(prompt);
        let Some(previous) = previous else {
            return false;
        };
        let action = Action::new(ActionType::PromptUpdate)
            .diagram(diagram_id)
            .prompt(prompt)
            .previous_prompt(&previous);
        self.record(action);
        true
    }

    /// Adopt a submitted prompt as the tracked prompt without recording.
    pub fn track_submitted_prompt(&self, prompt: &str) {
        self.lock_gestures().prompts.reset_to(prompt);
    }

    /// Wait until every delivery started before this call has finished.
    /// Bounded by one delivery timeout, not by the number of queued events.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(WorkerMsg::Flush(done_tx)).is_err() {
            return;
        }
        let _ = done_rx.await;
    }

    fn lock_gestures(&self) -> std::sync::MutexGuard<'_, GestureState> {
        self.gestures
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

async fn run_dispatcher(sink: Arc<dyn TelemetrySink>, mut rx: mpsc::UnboundedReceiver<WorkerMsg>) {
    let mut in_flight = JoinSet::new();
    while let Some(msg) = rx.recv().await {
        while in_flight.try_join_next().is_some() {}
        match msg {
            WorkerMsg::Event(event) => {
                if in_flight.len() >= MAX_IN_FLIGHT {
                    warn!(action_type = %event.action_type, "telemetry backlog full; event dropped");
                    continue;
                }
                let sink = Arc::clone(&sink);
                in_flight.spawn(async move {
                    if let Err(e) = sink.deliver(&event).await {
                        warn!(action_type = %event.action_type, error = %e, "telemetry delivery failed");
                    }
                });
            }
            WorkerMsg::Flush(done) => {
                let pending = std::mem::take(&mut in_flight);
                tokio::spawn(async move {
                    pending.join_all().await;
                    let _ = done.send(());
                });
            }
        }
    }
    in_flight.detach_all();
    debug!("telemetry dispatcher stopped");
}

#[cfg(test)]
#[path = "emitter_test.rs"]
mod tests;
