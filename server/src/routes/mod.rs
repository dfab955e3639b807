//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the diagram generation endpoints and the action-recording
//! endpoints under one Axum router. Every error answers with a JSON
//! `{"detail": ...}` body, the shape the client surfaces verbatim.

pub mod diagram;
pub mod rl;

use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use uml_agent::generation::ErrorDetail;

use crate::config::Environment;
use crate::state::AppState;

/// Full application router.
pub fn app(state: AppState, environment: Environment) -> Router {
    Router::new()
        .route("/diagram/generate", post(diagram::generate))
        .route("/diagram/edit", post(diagram::edit))
        .route("/rl/action", post(rl::record_action))
        .route("/rl/actions", get(rl::list_actions))
        .route("/healthz", get(healthz))
        .layer(cors_layer(environment))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(environment: Environment) -> CorsLayer {
    let origins: Vec<HeaderValue> = environment
        .allowed_origins()
        .iter()
        .map(|o| HeaderValue::from_static(*o))
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static("x-api-key")])
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

// =============================================================================
// ERRORS
// =============================================================================

/// Status plus the `detail` text sent to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self { status, detail: detail.into() }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }

    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, detail)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorDetail { detail: self.detail })).into_response()
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
