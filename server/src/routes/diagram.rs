//! Diagram generation routes.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::Json;
use tracing::error;
use uml_agent::generation::{DiagramResponse, EditRequest, GenerateRequest};

use super::ApiError;
use crate::llm::LlmChat;
use crate::services::diagram::{self, DiagramError};
use crate::state::AppState;

/// `POST /diagram/generate` — one or more diagrams from a prompt.
pub async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<DiagramResponse>, ApiError> {
    let llm = require_llm(&state)?;
    let Json(body) = payload?;
    diagram::generate(llm.as_ref(), &body.prompt, body.num_variations)
        .await
        .map(Json)
        .map_err(|e| diagram_error_to_api(e, "Failed to generate diagram"))
}

/// `POST /diagram/edit` — apply an instruction to existing source.
pub async fn edit(
    State(state): State<AppState>,
    payload: Result<Json<EditRequest>, JsonRejection>,
) -> Result<Json<DiagramResponse>, ApiError> {
    let llm = require_llm(&state)?;
    let Json(body) = payload?;
    diagram::edit(llm.as_ref(), &body.prompt, &body.existing_mermaid_code)
        .await
        .map(Json)
        .map_err(|e| diagram_error_to_api(e, "Failed to edit diagram"))
}

fn require_llm(state: &AppState) -> Result<Arc<dyn LlmChat>, ApiError> {
    state
        .llm
        .clone()
        .ok_or_else(|| ApiError::unavailable("Diagram generation is not configured on this server"))
}

pub(crate) fn diagram_error_to_api(err: DiagramError, failure: &str) -> ApiError {
    match err {
        DiagramError::EmptyPrompt | DiagramError::EmptyExisting => ApiError::bad_request(err.to_string()),
        DiagramError::EmptyOutput => ApiError::internal(err.to_string()),
        DiagramError::Llm(e) => {
            error!(error = %e, "diagram: {failure}");
            ApiError::internal(failure)
        }
    }
}

#[cfg(test)]
#[path = "diagram_test.rs"]
mod tests;
