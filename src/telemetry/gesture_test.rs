use super::*;
use crate::session::DiagramId;

fn view(revision: u32) -> ViewKey {
    ViewKey { diagram_id: DiagramId::nil(), revision }
}

// =========================================================================
// GestureLatch
// =========================================================================

#[test]
fn latch_fires_once_per_view() {
    let mut latch = GestureLatch::default();
    assert!(latch.latch(GestureKind::Zoom, view(1)));
    assert!(!latch.latch(GestureKind::Zoom, view(1)));
    assert!(latch.is_latched(GestureKind::Zoom, view(1)));
}

#[test]
fn zoom_and_pan_latch_independently() {
    let mut latch = GestureLatch::default();
    assert!(latch.latch(GestureKind::Zoom, view(1)));
    assert!(latch.latch(GestureKind::Pan, view(1)));
    assert!(!latch.latch(GestureKind::Pan, view(1)));
}

#[test]
fn new_revision_rearms() {
    let mut latch = GestureLatch::default();
    assert!(latch.latch(GestureKind::Zoom, view(1)));
    assert!(latch.latch(GestureKind::Zoom, view(2)));
    assert!(!latch.is_latched(GestureKind::Zoom, view(1)));
}

#[test]
fn new_diagram_rearms() {
    let mut latch = GestureLatch::default();
    let first = ViewKey { diagram_id: DiagramId::new(), revision: 1 };
    let second = ViewKey { diagram_id: DiagramId::new(), revision: 1 };
    assert!(latch.latch(GestureKind::Pan, first));
    assert!(latch.latch(GestureKind::Pan, second));
}

#[test]
fn stale_view_never_latches_or_clears_current() {
    let mut latch = GestureLatch::default();
    assert!(latch.latch(GestureKind::Pan, view(2)));

    assert!(!latch.latch_if_current(GestureKind::Zoom, view(1)));
    assert_eq!(latch.current(), Some(view(2)));
    assert!(latch.is_latched(GestureKind::Pan, view(2)));
    assert!(latch.latch_if_current(GestureKind::Zoom, view(2)));
}

// =========================================================================
// WheelDebounce
// =========================================================================

#[test]
fn wheel_settles_after_quiet_period() {
    let mut debounce = WheelDebounce::new(Duration::from_millis(300));
    let start = Instant::now();
    let epoch = debounce.observe_at(view(1), start);
    assert!(debounce.settle_at(epoch, start + Duration::from_millis(299)).is_none());
    assert_eq!(debounce.settle_at(epoch, start + Duration::from_millis(300)), Some(view(1)));
    assert!(!debounce.is_pending());
}

#[test]
fn later_activity_supersedes_earlier_timer() {
    let mut debounce = WheelDebounce::new(Duration::from_millis(300));
    let start = Instant::now();
    let first = debounce.observe_at(view(1), start);
    let second = debounce.observe_at(view(1), start + Duration::from_millis(100));

    let at = start + Duration::from_millis(400);
    assert!(debounce.settle_at(first, at).is_none());
    assert_eq!(debounce.settle_at(second, at), Some(view(1)));
}

#[test]
fn settle_only_fires_once() {
    let mut debounce = WheelDebounce::new(Duration::from_millis(10));
    let start = Instant::now();
    let epoch = debounce.observe_at(view(1), start);
    let later = start + Duration::from_millis(20);
    assert!(debounce.settle_at(epoch, later).is_some());
    assert!(debounce.settle_at(epoch, later).is_none());
}

// =========================================================================
// PromptTracker
// =========================================================================

#[test]
fn distance_counts_length_and_mismatches() {
    assert_eq!(prompt_distance("", ""), 0);
    assert_eq!(prompt_distance("abc", "abc"), 0);
    assert_eq!(prompt_distance("abc", "abd"), 1);
    assert_eq!(prompt_distance("abc", "abcdef"), 3);
    assert_eq!(prompt_distance("héllo", "hello"), 1);
}

#[test]
fn small_edits_are_filtered() {
    let mut tracker = PromptTracker::new(5);
    assert!(tracker.observe("a").is_none());
    assert!(tracker.observe("abcde").is_none());
}

#[test]
fn large_edit_is_recorded_and_becomes_tracked() {
    let mut tracker = PromptTracker::new(5);
    assert_eq!(tracker.observe("a class diagram").as_deref(), Some(""));
    assert_eq!(tracker.tracked(), "a class diagram");
    assert!(tracker.observe("a class diagramX").is_none());
}

#[test]
fn reset_to_adopts_without_recording() {
    let mut tracker = PromptTracker::new(5);
    tracker.reset_to("submitted prompt");
    assert!(tracker.observe("submitted prompt!").is_none());
}
