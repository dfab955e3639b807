use super::*;
use crate::session::DiagramId;
use crate::telemetry::ZoomInput;
use crate::identity::Identity;
use crate::test_helpers::{RecordingSink, emitter_with};

/// Never completes a delivery for event types in `hang_on`.
struct StallingSink {
    hang_on: Vec<ActionType>,
    attempted: Mutex<Vec<ActionType>>,
    delivered: Mutex<Vec<ActionType>>,
}

impl StallingSink {
    fn new(hang_on: &[ActionType]) -> Arc<Self> {
        Arc::new(Self { hang_on: hang_on.to_vec(), attempted: Mutex::default(), delivered: Mutex::default() })
    }

    fn attempted(&self) -> usize {
        self.attempted.lock().unwrap().len()
    }

    fn delivered(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl TelemetrySink for StallingSink {
    async fn deliver(&self, event: &TelemetryEvent) -> Result<(), TelemetryError> {
        self.attempted.lock().unwrap().push(event.action_type);
        if self.hang_on.contains(&event.action_type) {
            std::future::pending::<()>().await;
        }
        self.delivered.lock().unwrap().push(event.action_type);
        Ok(())
    }
}

fn zoom(diagram_id: DiagramId, input: ZoomInput) -> Action {
    Action::new(ActionType::Zoom).diagram(diagram_id).meta("input", input.as_str())
}

// =========================================================================
// record / flush
// =========================================================================

#[tokio::test]
async fn record_stamps_identity() {
    let sink = RecordingSink::new();
    let emitter = emitter_with(sink.clone());

    emitter.record(Action::new(ActionType::MermaidCopy).code("graph TD"));
    emitter.flush().await;

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].user_id, emitter.identity().user_id);
    assert_eq!(events[0].session_id, emitter.identity().session_id);
    assert_eq!(events[0].mermaid_code.as_deref(), Some("graph TD"));
}

#[tokio::test]
async fn delivery_failures_are_swallowed() {
    let sink = RecordingSink::rejecting();
    let emitter = emitter_with(sink.clone());

    emitter.record(Action::new(ActionType::TabAway));
    emitter.record(Action::new(ActionType::NewButton));
    emitter.flush().await;

    // Each event was attempted exactly once.
    assert_eq!(sink.events().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn hanging_delivery_does_not_hold_up_later_events() {
    let sink = StallingSink::new(&[ActionType::TabAway]);
    let emitter = TelemetryEmitter::spawn(Identity::ephemeral(), sink.clone(), TelemetryConfig::default());

    emitter.record(Action::new(ActionType::TabAway));
    for _ in 0..40 {
        emitter.record(Action::new(ActionType::MermaidCopy));
    }
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(sink.delivered(), 40);
}

#[tokio::test(start_paused = true)]
async fn deliveries_beyond_in_flight_cap_are_dropped() {
    let sink = StallingSink::new(&[ActionType::Zoom]);
    let emitter = TelemetryEmitter::spawn(Identity::ephemeral(), sink.clone(), TelemetryConfig::default());

    for _ in 0..MAX_IN_FLIGHT + 5 {
        emitter.record(Action::new(ActionType::Zoom));
    }
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(sink.attempted(), MAX_IN_FLIGHT);
    assert_eq!(sink.delivered(), 0);
}

#[tokio::test]
async fn clones_share_one_worker() {
    let sink = RecordingSink::new();
    let emitter = emitter_with(sink.clone());
    let clone = emitter.clone();

    clone.record(Action::new(ActionType::ImageCopy));
    emitter.flush().await;

    assert_eq!(sink.of_type(ActionType::ImageCopy).len(), 1);
}

// =========================================================================
// feedback
// =========================================================================

#[tokio::test]
async fn invalid_feedback_is_never_sent() {
    let sink = RecordingSink::new();
    let emitter = emitter_with(sink.clone());
    let id = DiagramId::new();

    assert!(emitter.record_feedback(id, "graph TD", Some(0), "bad").is_err());
    assert!(emitter.record_feedback(id, "graph TD", None, "").is_err());
    assert!(emitter.record_feedback(id, "graph TD", Some(6), "").is_err());
    emitter.flush().await;

    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn valid_feedback_with_empty_text_sent_once() {
    let sink = RecordingSink::new();
    let emitter = emitter_with(sink.clone());

    emitter.record_feedback(DiagramId::new(), "graph TD", Some(3), "").unwrap();
    emitter.flush().await;

    let events = sink.of_type(ActionType::Feedback);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].rating, Some(3));
    assert!(events[0].feedback_text.is_none());
}

// =========================================================================
// gestures
// =========================================================================

#[tokio::test]
async fn button_zoom_recorded_once_per_view() {
    let sink = RecordingSink::new();
    let emitter = emitter_with(sink.clone());
    let id = DiagramId::new();
    let view = ViewKey { diagram_id: id, revision: 1 };

    assert!(emitter.record_gesture(GestureKind::Zoom, view, zoom(id, ZoomInput::Button)));
    assert!(!emitter.record_gesture(GestureKind::Zoom, view, zoom(id, ZoomInput::Button)));

    let next = ViewKey { diagram_id: id, revision: 2 };
    assert!(emitter.record_gesture(GestureKind::Zoom, next, zoom(id, ZoomInput::Button)));
    emitter.flush().await;

    assert_eq!(sink.of_type(ActionType::Zoom).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn wheel_burst_collapses_to_one_event() {
    let sink = RecordingSink::new();
    let emitter = emitter_with(sink.clone());
    let id = DiagramId::new();
    let view = ViewKey { diagram_id: id, revision: 1 };

    for _ in 0..5 {
        emitter.record_wheel_zoom(view, zoom(id, ZoomInput::Wheel));
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    emitter.flush().await;
    assert!(sink.events().is_empty());

    tokio::time::sleep(Duration::from_millis(400)).await;
    emitter.flush().await;

    let events = sink.of_type(ActionType::Zoom);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].metadata["input"], "wheel");
}

#[tokio::test(start_paused = true)]
async fn wheel_after_button_zoom_is_ignored() {
    let sink = RecordingSink::new();
    let emitter = emitter_with(sink.clone());
    let id = DiagramId::new();
    let view = ViewKey { diagram_id: id, revision: 1 };

    emitter.record_gesture(GestureKind::Zoom, view, zoom(id, ZoomInput::Button));
    emitter.record_wheel_zoom(view, zoom(id, ZoomInput::Wheel));
    tokio::time::sleep(Duration::from_millis(500)).await;
    emitter.flush().await;

    assert_eq!(sink.of_type(ActionType::Zoom).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn wheel_settling_on_old_view_does_not_rearm_current() {
    let sink = RecordingSink::new();
    let emitter = emitter_with(sink.clone());
    let id = DiagramId::new();
    let old = ViewKey { diagram_id: id, revision: 1 };
    let current = ViewKey { diagram_id: id, revision: 2 };
    let pan = || Action::new(ActionType::Pan).diagram(id);

    emitter.record_wheel_zoom(old, zoom(id, ZoomInput::Wheel));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(emitter.record_gesture(GestureKind::Pan, current, pan()));

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(!emitter.record_gesture(GestureKind::Pan, current, pan()));
    emitter.flush().await;

    assert_eq!(sink.of_type(ActionType::Pan).len(), 1);
    assert!(sink.of_type(ActionType::Zoom).is_empty());
}

// =========================================================================
// prompt updates
// =========================================================================

#[tokio::test]
async fn prompt_updates_filtered_by_magnitude() {
    let sink = RecordingSink::new();
    let emitter = emitter_with(sink.clone());
    let id = DiagramId::new();

    assert!(!emitter.observe_prompt(id, "user"));
    assert!(emitter.observe_prompt(id, "user login flow"));
    assert!(!emitter.observe_prompt(id, "user login flows"));
    emitter.flush().await;

    let events = sink.of_type(ActionType::PromptUpdate);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].prompt.as_deref(), Some("user login flow"));
    assert!(events[0].previous_prompt.is_none());
}

#[tokio::test]
async fn submitted_prompt_becomes_baseline() {
    let sink = RecordingSink::new();
    let emitter = emitter_with(sink.clone());
    let id = DiagramId::new();

    emitter.track_submitted_prompt("a sequence diagram for checkout");
    assert!(!emitter.observe_prompt(id, "a sequence diagram for checkouts"));
    assert!(emitter.observe_prompt(id, "a sequence diagram for checkout with retries"));
    emitter.flush().await;

    let events = sink.of_type(ActionType::PromptUpdate);
    assert_eq!(events[0].previous_prompt.as_deref(), Some("a sequence diagram for checkout"));
}
