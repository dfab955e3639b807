//! Action-recording routes.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::Json;
use serde::Serialize;
use tracing::error;
use uml_agent::trajectory::ActionRecord;

use super::ApiError;
use crate::services::actions::ActionLogError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RecordActionResponse {
    pub success: bool,
    pub message: String,
    pub action_id: String,
}

#[derive(Debug, Serialize)]
pub struct ActionsResponse {
    pub actions: Vec<ActionRecord>,
    pub count: usize,
}

/// `POST /rl/action` — append one interaction event.
pub async fn record_action(
    State(state): State<AppState>,
    payload: Result<Json<ActionRecord>, JsonRejection>,
) -> Result<Json<RecordActionResponse>, ApiError> {
    let Json(record) = payload?;
    let stored = state.actions.record(record).await.map_err(|e| match e {
        ActionLogError::MissingActionType => ApiError::bad_request(e.to_string()),
        other => {
            error!(error = %other, "rl: record failed");
            ApiError::internal(format!("Failed to record action: {other}"))
        }
    })?;
    Ok(Json(RecordActionResponse {
        success: true,
        message: format!("Action '{}' recorded successfully", stored.action_type),
        action_id: stored.action_id.unwrap_or_default(),
    }))
}

/// `GET /rl/actions` — every recorded event.
pub async fn list_actions(State(state): State<AppState>) -> Result<Json<ActionsResponse>, ApiError> {
    let actions = state.actions.list().await.map_err(|e| {
        error!(error = %e, "rl: list failed");
        ApiError::internal(format!("Failed to load actions: {e}"))
    })?;
    Ok(Json(ActionsResponse { count: actions.len(), actions }))
}

#[cfg(test)]
#[path = "rl_test.rs"]
mod tests;
