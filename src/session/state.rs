//! Pure session state machine.
//!
//! DESIGN
//! ======
//! The lifecycle is an enum. In-flight requests hold the stable state they
//! interrupted, so a failed request restores it exactly and a second request
//! cannot start while one is outstanding.
//!
//! ```text
//! Idle ──submit──▶ Generating ──1──▶ Ready ──submit──▶ Editing ──▶ Ready
//!                      │                                  │
//!                      └──≥2──▶ VariationPending ◀────≥2──┘
//!                                 │ select (stays) │ confirm ──▶ Ready
//! ```
//!
//! New returns to Idle and Import jumps to Ready, both under a fresh diagram
//! id. Neither is allowed while a request is in flight.
//!
//! ERROR HANDLING
//! ==============
//! Only `CredentialMissing` and `RequestFailed` are meant for the user; the
//! rest describe calls the UI should not have made.

use crate::generation::{Candidates, MAX_VARIATIONS};
use crate::telemetry::TelemetryError;

use super::variations::VariationSet;
use super::{DiagramId, Phase, ViewKey};

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("an API key is required before generating diagrams")]
    CredentialMissing,

    #[error("{0}")]
    RequestFailed(String),

    #[error("a request is already in progress")]
    RequestInFlight,

    #[error("no request is in progress")]
    NoRequestInFlight,

    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("nothing to import")]
    EmptyImport,

    #[error("there are no variations to choose from")]
    NoVariations,

    #[error("variation {index} does not exist ({len} available)")]
    InvalidSelection { index: usize, len: usize },

    #[error(transparent)]
    InvalidFeedback(#[from] TelemetryError),
}

impl SessionError {
    /// Whether this error belongs in the session's visible error slot.
    #[must_use]
    pub fn is_user_visible(&self) -> bool {
        matches!(self, Self::CredentialMissing | Self::RequestFailed(_))
    }
}

// =============================================================================
// STATE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Generate,
    Edit,
}

/// The network call `begin_request` decided on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPlan {
    Generate { prompt: String, num_variations: u32 },
    Edit { prompt: String, existing: String },
}

impl RequestPlan {
    #[must_use]
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Generate { .. } => RequestKind::Generate,
            Self::Edit { .. } => RequestKind::Edit,
        }
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        match self {
            Self::Generate { prompt, .. } | Self::Edit { prompt, .. } => prompt,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Stable {
    Idle,
    Ready,
    VariationPending(VariationSet),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Stable(Stable),
    InFlight { kind: RequestKind, prior: Stable, prompt: String },
}

/// What a successful response changed, for telemetry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub kind: RequestKind,
    pub prompt: String,
    pub previous_prompt: String,
    pub previous_source: String,
    pub candidates: Vec<String>,
}

// =============================================================================
// SESSION
// =============================================================================

#[derive(Debug, Clone)]
pub struct Session {
    diagram_id: DiagramId,
    revision: u32,
    source: String,
    previous_source: String,
    is_editing: bool,
    current_prompt: String,
    error_message: Option<String>,
    state: State,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self {
            diagram_id: DiagramId::new(),
            revision: 0,
            source: String::new(),
            previous_source: String::new(),
            is_editing: false,
            current_prompt: String::new(),
            error_message: None,
            state: State::Stable(Stable::Idle),
        }
    }

    // ---- accessors ----

    #[must_use]
    pub fn phase(&self) -> Phase {
        match &self.state {
            State::Stable(Stable::Idle) => Phase::Idle,
            State::Stable(Stable::Ready) => Phase::Ready,
            State::Stable(Stable::VariationPending(_)) => Phase::VariationPending,
            State::InFlight { kind: RequestKind::Generate, .. } => Phase::Generating,
            State::InFlight { kind: RequestKind::Edit, .. } => Phase::Editing,
        }
    }

    #[must_use]
    pub fn diagram_id(&self) -> DiagramId {
        self.diagram_id
    }

    #[must_use]
    pub fn revision(&self) -> u32 {
        self.revision
    }

    #[must_use]
    pub fn view_key(&self) -> ViewKey {
        ViewKey { diagram_id: self.diagram_id, revision: self.revision }
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn previous_source(&self) -> &str {
        &self.previous_source
    }

    #[must_use]
    pub fn is_editing(&self) -> bool {
        self.is_editing
    }

    #[must_use]
    pub fn current_prompt(&self) -> &str {
        &self.current_prompt
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        matches!(self.state, State::InFlight { .. })
    }

    #[must_use]
    pub fn has_diagram(&self) -> bool {
        !self.source.is_empty()
    }

    #[must_use]
    pub fn variation_set(&self) -> Option<&VariationSet> {
        match &self.state {
            State::Stable(Stable::VariationPending(set)) => Some(set),
            _ => None,
        }
    }

    /// Pending candidates; empty when there is no choice to make.
    #[must_use]
    pub fn variations(&self) -> &[String] {
        self.variation_set().map_or(&[], VariationSet::variations)
    }

    #[must_use]
    pub fn selected_index(&self) -> Option<usize> {
        self.variation_set().map(VariationSet::selected)
    }

    // ---- requests ----

    /// Start a request. Editing an existing diagram sends it along with the
    /// prompt; otherwise fresh candidates are generated.
    ///
    /// # Errors
    ///
    /// `RequestInFlight` while another request is outstanding, `EmptyPrompt`
    /// for a blank prompt. Neither changes state.
    pub fn begin_request(&mut self, prompt: &str, num_variations: u32) -> Result<RequestPlan, SessionError> {
        if self.is_in_flight() {
            return Err(SessionError::RequestInFlight);
        }
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(SessionError::EmptyPrompt);
        }

        let plan = if !self.source.is_empty() && self.is_editing {
            RequestPlan::Edit { prompt: prompt.to_owned(), existing: self.source.clone() }
        } else {
            RequestPlan::Generate {
                prompt: prompt.to_owned(),
                num_variations: num_variations.clamp(1, MAX_VARIATIONS),
            }
        };

        let prior = self.take_stable();
        self.state = State::InFlight { kind: plan.kind(), prior, prompt: prompt.to_owned() };
        self.error_message = None;
        Ok(plan)
    }

    /// Apply a successful response. One candidate is committed; several
    /// become a pending choice and leave the committed source untouched.
    ///
    /// # Errors
    ///
    /// `NoRequestInFlight` if no request was started.
    pub fn apply_response(&mut self, candidates: Candidates) -> Result<Applied, SessionError> {
        let State::InFlight { kind, prompt, .. } = &self.state else {
            return Err(SessionError::NoRequestInFlight);
        };
        let kind = *kind;
        let prompt = prompt.clone();
        let previous_prompt = std::mem::replace(&mut self.current_prompt, prompt.clone());
        let previous_source = self.source.clone();

        let candidates = match candidates {
            Candidates::Single(code) => {
                self.commit(code.clone());
                self.state = State::Stable(Stable::Ready);
                vec![code]
            }
            Candidates::Multiple(variations) => match VariationSet::from_candidates(variations.clone()) {
                Some(set) => {
                    self.state = State::Stable(Stable::VariationPending(set));
                    variations
                }
                None => {
                    let code = variations.into_iter().next().unwrap_or_default();
                    self.commit(code.clone());
                    self.state = State::Stable(Stable::Ready);
                    vec![code]
                }
            },
        };

        Ok(Applied { kind, prompt, previous_prompt, previous_source, candidates })
    }

    /// Abandon the in-flight request, restoring the state it interrupted and
    /// recording `message`. Returns the matching `RequestFailed`.
    pub fn fail_request(&mut self, message: impl Into<String>) -> SessionError {
        let message = message.into();
        if let State::InFlight { prior, .. } = &mut self.state {
            let prior = std::mem::replace(prior, Stable::Idle);
            self.state = State::Stable(prior);
        }
        self.error_message = Some(message.clone());
        SessionError::RequestFailed(message)
    }

    // ---- variations ----

    /// Look at candidate `index` without changing the selection.
    ///
    /// # Errors
    ///
    /// `NoVariations` outside `VariationPending`; `InvalidSelection` when out of range.
    pub fn variation(&self, index: usize) -> Result<&str, SessionError> {
        let set = self.variation_set().ok_or(SessionError::NoVariations)?;
        set.get(index)
            .ok_or(SessionError::InvalidSelection { index, len: set.len() })
    }

    /// # Errors
    ///
    /// `RequestInFlight`, `NoVariations` or `InvalidSelection`.
    pub fn select(&mut self, index: usize) -> Result<&str, SessionError> {
        match &mut self.state {
            State::InFlight { .. } => Err(SessionError::RequestInFlight),
            State::Stable(Stable::VariationPending(set)) => {
                set.select(index)?;
                Ok(set.selected_source())
            }
            State::Stable(_) => Err(SessionError::NoVariations),
        }
    }

    /// Commit the selected candidate and discard the rest.
    ///
    /// # Errors
    ///
    /// `RequestInFlight` or `NoVariations`.
    pub fn confirm(&mut self) -> Result<&str, SessionError> {
        match std::mem::replace(&mut self.state, State::Stable(Stable::Ready)) {
            State::Stable(Stable::VariationPending(set)) => {
                self.commit(set.into_selected());
                Ok(&self.source)
            }
            other => {
                let err = if matches!(other, State::InFlight { .. }) {
                    SessionError::RequestInFlight
                } else {
                    SessionError::NoVariations
                };
                self.state = other;
                Err(err)
            }
        }
    }

    // ---- lifecycle ----

    /// Discard everything and start a new diagram.
    ///
    /// # Errors
    ///
    /// `RequestInFlight`.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        if self.is_in_flight() {
            return Err(SessionError::RequestInFlight);
        }
        *self = Self::new();
        Ok(())
    }

    /// Adopt externally supplied source as a new diagram, ready for editing.
    ///
    /// # Errors
    ///
    /// `RequestInFlight` or `EmptyImport`.
    pub fn import(&mut self, source: &str) -> Result<(), SessionError> {
        if self.is_in_flight() {
            return Err(SessionError::RequestInFlight);
        }
        if source.trim().is_empty() {
            return Err(SessionError::EmptyImport);
        }
        *self = Self::new();
        self.commit(source.to_owned());
        self.state = State::Stable(Stable::Ready);
        Ok(())
    }

    fn commit(&mut self, source: String) {
        self.previous_source = std::mem::replace(&mut self.source, source);
        self.is_editing = true;
        self.revision += 1;
    }

    fn take_stable(&mut self) -> Stable {
        match std::mem::replace(&mut self.state, State::Stable(Stable::Idle)) {
            State::Stable(stable) => stable,
            State::InFlight { prior, .. } => prior,
        }
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
