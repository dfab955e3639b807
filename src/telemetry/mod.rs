//! Interaction telemetry — shaping, anti-flood policy, and delivery.
//!
//! DESIGN
//! ======
//! Callers describe what happened as an [`Action`]. The emitter stamps it with
//! identity and time, applies the anti-flood filters in [`gesture`], and queues
//! it for a background worker that delivers one event at a time through a
//! [`TelemetrySink`]. Nothing here can fail the calling interaction.

pub mod emitter;
pub mod event;
pub mod gesture;
pub mod sink;

pub use emitter::{TelemetryConfig, TelemetryEmitter};
pub use event::{Action, ActionType, TelemetryError, TelemetryEvent};
pub use gesture::{GestureKind, ZoomInput};
pub use sink::{HttpSink, TelemetrySink, TracingSink};
