//! Renderer backed by the mermaid.ink HTTP service.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tracing::debug;

use super::{DiagramRenderer, RenderFailure, RenderId, RenderedImage, Scaffold};

pub const DEFAULT_INK_URL: &str = "https://mermaid.ink";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Svg,
    Png,
}

impl ImageFormat {
    fn endpoint(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "img",
        }
    }

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
        }
    }
}

/// Build the mermaid.ink URL for `source`.
#[must_use]
pub fn ink_url(base_url: &str, format: ImageFormat, source: &str) -> String {
    let encoded = URL_SAFE_NO_PAD.encode(source.as_bytes());
    format!("{}/{}/{encoded}", base_url.trim_end_matches('/'), format.endpoint())
}

pub struct MermaidInkRenderer {
    http: reqwest::Client,
    base_url: String,
    format: ImageFormat,
}

impl MermaidInkRenderer {
    /// # Errors
    ///
    /// Returns [`RenderFailure::Engine`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, format: ImageFormat, timeout: Duration) -> Result<Self, RenderFailure> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RenderFailure::Engine(e.to_string()))?;
        Ok(Self { http, base_url: base_url.to_owned(), format })
    }
}

#[async_trait::async_trait]
impl DiagramRenderer for MermaidInkRenderer {
    async fn render(&self, render_id: RenderId, source: &str, scaffold: &Scaffold) -> Result<(), RenderFailure> {
        let url = ink_url(&self.base_url, self.format, source);
        debug!(render_id = %render_id, format = ?self.format, "requesting mermaid.ink render");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| RenderFailure::Engine(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(RenderFailure::Engine(format!("status {}: {snippet}", status.as_u16())));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        if !content_type.starts_with("image/") {
            return Err(RenderFailure::UnsupportedContentType(content_type));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RenderFailure::Engine(e.to_string()))?;
        debug!(render_id = %render_id, size = bytes.len(), "mermaid.ink render complete");

        scaffold.deposit(RenderedImage { render_id, content_type, bytes: bytes.to_vec() });
        Ok(())
    }
}

#[cfg(test)]
#[path = "ink_test.rs"]
mod tests;
