//! uml-agent — prompt-driven Mermaid diagram sessions with interaction telemetry.
//!
//! ARCHITECTURE
//! ============
//! The session controller owns the generate/edit/variation lifecycle and is
//! the only writer of session state. It consults the credential gate before
//! any network call, dispatches to the generation collaborator, hands source
//! text to the render manager, and reports every user action to the
//! telemetry emitter.
//!
//! Leaves first: `store` → `identity`, `credential` → `generation`,
//! `telemetry`, `render` → `session`. `trajectory` consumes recorded actions
//! offline.

pub mod config;
pub mod credential;
pub mod generation;
pub mod identity;
pub mod render;
pub mod session;
pub mod store;
pub mod telemetry;
pub mod trajectory;

pub use config::ClientConfig;
pub use credential::{Credential, CredentialGate, CredentialStatus, StoredCredential};
pub use generation::{DiagramResponse, DiagramService, GenerationError, HttpDiagramService};
pub use identity::{Identity, SessionId, UserId};
pub use render::{DiagramRenderer, RenderManager, Slot, SlotState};
pub use session::{DiagramId, Phase, Session, SessionController, SessionError};
pub use telemetry::{ActionType, TelemetryEmitter, TelemetryEvent};

#[cfg(test)]
pub(crate) mod test_helpers;
