//! Client configuration parsed from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::render::RenderConfig;
use crate::render::ink::DEFAULT_INK_URL;
use crate::telemetry::TelemetryConfig;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_NUM_VARIATIONS: u32 = 3;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const STATE_DIR_NAME: &str = "uml-agent";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub telemetry_url: String,
    pub telemetry_enabled: bool,
    pub state_dir: PathBuf,
    pub num_variations: u32,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub ink_url: String,
    pub render: RenderConfig,
    pub telemetry: TelemetryConfig,
}

impl ClientConfig {
    /// Build typed client config from environment variables. Every setting
    /// has a default; unparsable values fall back to it.
    ///
    /// - `UML_AGENT_API_URL`: default `http://127.0.0.1:8000`
    /// - `UML_AGENT_TELEMETRY_URL`: default the API URL
    /// - `UML_AGENT_TELEMETRY_ENABLED`: default true
    /// - `UML_AGENT_STATE_DIR`: default `<data_local_dir>/uml-agent`
    /// - `UML_AGENT_NUM_VARIATIONS`: default 3
    /// - `UML_AGENT_REQUEST_TIMEOUT_SECS` / `UML_AGENT_CONNECT_TIMEOUT_SECS`: 120 / 10
    /// - `MERMAID_INK_URL`: default `https://mermaid.ink`
    /// - `RENDER_STAGGER_MS`, `RENDER_POLL_ATTEMPTS`, `RENDER_POLL_BACKOFF_MS`,
    ///   `RENDER_CLEANUP_GRACE_MS`, `RENDER_TIMEOUT_MS`
    /// - `PROMPT_UPDATE_MIN_DELTA`, `ZOOM_QUIET_MS`
    #[must_use]
    pub fn from_env() -> Self {
        let api_url = env_url("UML_AGENT_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_owned());
        let telemetry_url = env_url("UML_AGENT_TELEMETRY_URL").unwrap_or_else(|| api_url.clone());
        let state_dir = std::env::var("UML_AGENT_STATE_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map_or_else(default_state_dir, PathBuf::from);

        let render_defaults = RenderConfig::default();
        let render = RenderConfig {
            stagger: env_millis("RENDER_STAGGER_MS", render_defaults.stagger),
            poll_attempts: env_parse("RENDER_POLL_ATTEMPTS", render_defaults.poll_attempts).max(1),
            poll_backoff: env_millis("RENDER_POLL_BACKOFF_MS", render_defaults.poll_backoff),
            cleanup_grace: env_millis("RENDER_CLEANUP_GRACE_MS", render_defaults.cleanup_grace),
            render_timeout: env_millis("RENDER_TIMEOUT_MS", render_defaults.render_timeout),
        };

        let telemetry_defaults = TelemetryConfig::default();
        let telemetry = TelemetryConfig {
            prompt_min_delta: env_parse("PROMPT_UPDATE_MIN_DELTA", telemetry_defaults.prompt_min_delta),
            zoom_quiet: env_millis("ZOOM_QUIET_MS", telemetry_defaults.zoom_quiet),
        };

        Self {
            api_url,
            telemetry_url,
            telemetry_enabled: env_bool("UML_AGENT_TELEMETRY_ENABLED", true),
            state_dir,
            num_variations: env_parse("UML_AGENT_NUM_VARIATIONS", DEFAULT_NUM_VARIATIONS),
            request_timeout: Duration::from_secs(env_parse(
                "UML_AGENT_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
            connect_timeout: Duration::from_secs(env_parse(
                "UML_AGENT_CONNECT_TIMEOUT_SECS",
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )),
            ink_url: env_url("MERMAID_INK_URL").unwrap_or_else(|| DEFAULT_INK_URL.to_owned()),
            render,
            telemetry,
        }
    }
}

fn default_state_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(STATE_DIR_NAME)
}

fn env_url(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().trim_end_matches('/').to_owned())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn env_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().as_deref().map(str::trim) {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
