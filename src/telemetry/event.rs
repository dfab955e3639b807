//! Telemetry event types.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::identity::{Identity, SessionId, UserId};
use crate::session::DiagramId;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("endpoint rejected event: status {status}")]
    Rejected { status: u16, body: String },

    #[error("feedback requires a rating between 1 and 5")]
    InvalidFeedback { rating: Option<u8> },
}

// =============================================================================
// ACTION TYPE
// =============================================================================

/// Closed set of recorded actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    DiagramGenerated,
    DiagramEdited,
    VariationHover,
    VariationSelection,
    MermaidCopy,
    ImageCopy,
    NewButton,
    TabAway,
    PromptUpdate,
    Feedback,
    Zoom,
    Pan,
}

impl ActionType {
    pub const ALL: [ActionType; 12] = [
        Self::DiagramGenerated,
        Self::DiagramEdited,
        Self::VariationHover,
        Self::VariationSelection,
        Self::MermaidCopy,
        Self::ImageCopy,
        Self::NewButton,
        Self::TabAway,
        Self::PromptUpdate,
        Self::Feedback,
        Self::Zoom,
        Self::Pan,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DiagramGenerated => "diagram_generated",
            Self::DiagramEdited => "diagram_edited",
            Self::VariationHover => "variation_hover",
            Self::VariationSelection => "variation_selection",
            Self::MermaidCopy => "mermaid_copy",
            Self::ImageCopy => "image_copy",
            Self::NewButton => "new_button",
            Self::TabAway => "tab_away",
            Self::PromptUpdate => "prompt_update",
            Self::Feedback => "feedback",
            Self::Zoom => "zoom",
            Self::Pan => "pan",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ACTION (unstamped)
// =============================================================================

/// An action as described by the caller, before identity and time stamping.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub action_type: ActionType,
    pub timestamp: Option<OffsetDateTime>,
    pub diagram_id: Option<DiagramId>,
    pub mermaid_code: Option<String>,
    pub metadata: Map<String, Value>,
    pub rating: Option<u8>,
    pub feedback_text: Option<String>,
    pub prompt: Option<String>,
    pub previous_prompt: Option<String>,
    pub variation_index: Option<usize>,
    pub all_variations: Option<Vec<String>>,
}

impl Action {
    #[must_use]
    pub fn new(action_type: ActionType) -> Self {
        Self {
            action_type,
            timestamp: None,
            diagram_id: None,
            mermaid_code: None,
            metadata: Map::new(),
            rating: None,
            feedback_text: None,
            prompt: None,
            previous_prompt: None,
            variation_index: None,
            all_variations: None,
        }
    }

    /// Build a `feedback` action. Ratings outside `1..=5` are rejected here so
    /// they can never reach the wire.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidFeedback`] for a missing or out-of-range rating.
    pub fn feedback(rating: Option<u8>, text: &str) -> Result<Self, TelemetryError> {
        let rating = validate_rating(rating)?;
        let mut action = Self::new(ActionType::Feedback);
        action.rating = Some(rating);
        let text = text.trim();
        if !text.is_empty() {
            action.feedback_text = Some(text.to_owned());
        }
        Ok(action)
    }

    #[must_use]
    pub fn diagram(mut self, diagram_id: DiagramId) -> Self {
        self.diagram_id = Some(diagram_id);
        self
    }

    /// Attach diagram source. Empty source is left off the event.
    #[must_use]
    pub fn code(mut self, code: &str) -> Self {
        if !code.is_empty() {
            self.mermaid_code = Some(code.to_owned());
        }
        self
    }

    #[must_use]
    pub fn prompt(mut self, prompt: &str) -> Self {
        self.prompt = Some(prompt.to_owned());
        self
    }

    #[must_use]
    pub fn previous_prompt(mut self, prompt: &str) -> Self {
        if !prompt.is_empty() {
            self.previous_prompt = Some(prompt.to_owned());
        }
        self
    }

    #[must_use]
    pub fn variation(mut self, index: usize, all: &[String]) -> Self {
        self.variation_index = Some(index);
        self.candidates(all)
    }

    #[must_use]
    pub fn candidates(mut self, all: &[String]) -> Self {
        self.all_variations = Some(all.to_vec());
        self
    }

    #[must_use]
    pub fn meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_owned(), value.into());
        self
    }

    #[must_use]
    pub fn at(mut self, timestamp: OffsetDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Stamp identity and time, producing the immutable wire event.
    #[must_use]
    pub fn stamp(self, identity: &Identity, now: OffsetDateTime) -> TelemetryEvent {
        TelemetryEvent {
            action_type: self.action_type,
            timestamp: self.timestamp.unwrap_or(now),
            user_id: identity.user_id,
            session_id: identity.session_id,
            diagram_id: self.diagram_id,
            mermaid_code: self.mermaid_code,
            metadata: self.metadata,
            rating: self.rating,
            feedback_text: self.feedback_text,
            prompt: self.prompt,
            previous_prompt: self.previous_prompt,
            variation_index: self.variation_index,
            all_variations: self.all_variations,
        }
    }
}

/// Accept only ratings in `1..=5`.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFeedback`] otherwise.
pub fn validate_rating(rating: Option<u8>) -> Result<u8, TelemetryError> {
    match rating {
        Some(r) if (MIN_RATING..=MAX_RATING).contains(&r) => Ok(r),
        other => Err(TelemetryError::InvalidFeedback { rating: other }),
    }
}

// =============================================================================
// TELEMETRY EVENT (wire)
// =============================================================================

/// One immutable, self-describing record of a user action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub action_type: ActionType,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub user_id: UserId,
    pub session_id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagram_id: Option<DiagramId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mermaid_code: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_variations: Option<Vec<String>>,
}

#[cfg(test)]
#[path = "event_test.rs"]
mod tests;
