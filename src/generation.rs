//! Client for the prompt-to-diagram generation service.
//!
//! DESIGN
//! ======
//! Two calls, `generate` and `edit`, behind the [`DiagramService`] trait so the
//! session controller can be driven by a mock in tests. Both take a
//! [`Credential`]; a request cannot be built without one.
//!
//! Wire types are shared with the `server` crate.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::credential::Credential;

pub const CREDENTIAL_HEADER: &str = "X-API-Key";
pub const MAX_VARIATIONS: u32 = 3;

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default)]
    pub num_variations: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRequest {
    pub prompt: String,
    pub existing_mermaid_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mermaid_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variations: Option<Vec<String>>,
}

/// Error body returned by the service on non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

/// What a response means for the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidates {
    Single(String),
    Multiple(Vec<String>),
}

impl DiagramResponse {
    #[must_use]
    pub fn single(code: impl Into<String>) -> Self {
        Self { mermaid_code: Some(code.into()), variations: None }
    }

    /// Multi-candidate response; `mermaid_code` mirrors the first candidate.
    #[must_use]
    pub fn multiple(variations: Vec<String>) -> Self {
        Self { mermaid_code: variations.first().cloned(), variations: Some(variations) }
    }

    /// Classify the response. More than one variation wins over
    /// `mermaid_code`; blank candidates are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::EmptyResponse`] when no usable source is present.
    pub fn into_candidates(self) -> Result<Candidates, GenerationError> {
        let mut variations: Vec<String> = self
            .variations
            .unwrap_or_default()
            .into_iter()
            .filter(|v| !v.trim().is_empty())
            .collect();
        if variations.len() > 1 {
            return Ok(Candidates::Multiple(variations));
        }
        if let Some(only) = variations.pop() {
            return Ok(Candidates::Single(only));
        }
        match self.mermaid_code {
            Some(code) if !code.trim().is_empty() => Ok(Candidates::Single(code)),
            _ => Err(GenerationError::EmptyResponse),
        }
    }
}

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("request failed: {0}")]
    Transport(String),

    /// Non-2xx status. `detail` is the human-readable message from the body.
    #[error("{detail}")]
    Api { status: u16, detail: String },

    #[error("response parse failed: {0}")]
    Parse(String),

    #[error("service returned no diagram")]
    EmptyResponse,

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl GenerationError {
    /// Message shown to the user. Service-provided details pass through verbatim.
    #[must_use]
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

// =============================================================================
// SERVICE TRAIT
// =============================================================================

/// The generation collaborator. Enables mocking in tests.
#[async_trait::async_trait]
pub trait DiagramService: Send + Sync {
    /// Generate fresh source for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError`] on transport failure or non-2xx status.
    async fn generate(
        &self,
        credential: &Credential,
        prompt: &str,
        num_variations: u32,
    ) -> Result<DiagramResponse, GenerationError>;

    /// Apply `prompt` as an edit to `existing`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError`] on transport failure or non-2xx status.
    async fn edit(
        &self,
        credential: &Credential,
        prompt: &str,
        existing: &str,
    ) -> Result<DiagramResponse, GenerationError>;
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

pub struct HttpDiagramService {
    http: reqwest::Client,
    base_url: String,
}

impl HttpDiagramService {
    /// # Errors
    ///
    /// Returns [`GenerationError::HttpClientBuild`] if reqwest cannot build a client.
    pub fn new(base_url: &str, request_timeout: Duration, connect_timeout: Duration) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| GenerationError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    async fn send_json(
        &self,
        path: &str,
        credential: &Credential,
        body: &impl Serialize,
    ) -> Result<DiagramResponse, GenerationError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "generation request");
        let response = self
            .http
            .post(url)
            .header(CREDENTIAL_HEADER, credential.expose())
            .json(body)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;
        if !status.is_success() {
            let detail = error_detail(status.as_u16(), &text);
            warn!(status = status.as_u16(), %detail, "generation service error");
            return Err(GenerationError::Api { status: status.as_u16(), detail });
        }
        serde_json::from_str(&text).map_err(|e| GenerationError::Parse(e.to_string()))
    }
}

/// Extract `detail` from an error body, falling back to the raw body or status.
pub(crate) fn error_detail(status: u16, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorDetail>(body) {
        return parsed.detail;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() { format!("request failed with status {status}") } else { trimmed.to_owned() }
}

#[async_trait::async_trait]
impl DiagramService for HttpDiagramService {
    async fn generate(
        &self,
        credential: &Credential,
        prompt: &str,
        num_variations: u32,
    ) -> Result<DiagramResponse, GenerationError> {
        let body = GenerateRequest { prompt: prompt.to_owned(), num_variations: Some(num_variations) };
        self.send_json("/diagram/generate", credential, &body).await
    }

    async fn edit(
        &self,
        credential: &Credential,
        prompt: &str,
        existing: &str,
    ) -> Result<DiagramResponse, GenerationError> {
        let body = EditRequest { prompt: prompt.to_owned(), existing_mermaid_code: existing.to_owned() };
        self.send_json("/diagram/edit", credential, &body).await
    }
}

#[cfg(test)]
#[path = "generation_test.rs"]
mod tests;
