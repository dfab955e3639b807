//! Delivery endpoints for telemetry events.

use std::time::Duration;

use tracing::debug;

use super::event::{TelemetryError, TelemetryEvent};

pub const ACTION_PATH: &str = "/rl/action";

/// Accepts one event at a time. Enables mocking in tests.
#[async_trait::async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Deliver a single event.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError`] when the event was not accepted. Callers
    /// log and drop; there is no retry.
    async fn deliver(&self, event: &TelemetryEvent) -> Result<(), TelemetryError>;
}

/// Posts events to the action-recording endpoint.
pub struct HttpSink {
    http: reqwest::Client,
    url: String,
}

impl HttpSink {
    /// # Errors
    ///
    /// Returns [`TelemetryError::Delivery`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TelemetryError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TelemetryError::Delivery(e.to_string()))?;
        Ok(Self { http, url: format!("{}{ACTION_PATH}", base_url.trim_end_matches('/')) })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl TelemetrySink for HttpSink {
    async fn deliver(&self, event: &TelemetryEvent) -> Result<(), TelemetryError> {
        let response = self
            .http
            .post(&self.url)
            .json(event)
            .send()
            .await
            .map_err(|e| TelemetryError::Delivery(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TelemetryError::Rejected { status: status.as_u16(), body });
        }
        Ok(())
    }
}

/// Logs events instead of sending them. Used when telemetry is disabled.
pub struct TracingSink;

#[async_trait::async_trait]
impl TelemetrySink for TracingSink {
    async fn deliver(&self, event: &TelemetryEvent) -> Result<(), TelemetryError> {
        debug!(
            action_type = %event.action_type,
            diagram_id = ?event.diagram_id,
            "telemetry (not sent)"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "sink_test.rs"]
mod tests;
