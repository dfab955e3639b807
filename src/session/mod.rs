//! Diagram session: the generate/edit/variation lifecycle.
//!
//! DESIGN
//! ======
//! `state` is a pure state machine with no I/O. `controller` wires it to the
//! credential gate, the generation service, the render manager and the
//! telemetry emitter.

pub mod controller;
pub mod state;
pub mod variations;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use controller::SessionController;
pub use state::{Applied, RequestKind, RequestPlan, Session, SessionError};
pub use variations::VariationSet;

/// Identifies one diagram-editing lineage. Stable across edits; replaced on
/// New and Import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiagramId(pub Uuid);

impl DiagramId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for DiagramId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DiagramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What the user is looking at: a diagram at a specific committed revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewKey {
    pub diagram_id: DiagramId,
    pub revision: u32,
}

/// Observable lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Generating,
    VariationPending,
    Ready,
    Editing,
}

impl Phase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Generating => "generating",
            Self::VariationPending => "variation_pending",
            Self::Ready => "ready",
            Self::Editing => "editing",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
