//! Server configuration parsed from environment variables.

use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_ACTIONS_FILE: &str = "rl_actions.json";

const PRODUCTION_ORIGINS: [&str; 2] = ["https://uml-agent.vercel.app", "https://uml-agent-back.vercel.app"];
const DEVELOPMENT_ORIGINS: [&str; 3] =
    ["http://localhost:3000", "http://127.0.0.1:3000", "https://uml-agent.vercel.app"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("production") => Self::Production,
            _ => Self::Development,
        }
    }

    /// Browser origins allowed by CORS.
    #[must_use]
    pub fn allowed_origins(self) -> &'static [&'static str] {
        match self {
            Self::Production => &PRODUCTION_ORIGINS,
            Self::Development => &DEVELOPMENT_ORIGINS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub actions_file: PathBuf,
    pub environment: Environment,
}

impl ServerConfig {
    /// Build typed server config from environment variables.
    ///
    /// - `PORT`: default 8000
    /// - `RL_ACTIONS_FILE`: default `rl_actions.json`
    /// - `ENVIRONMENT`: `production` restricts CORS; anything else is development
    #[must_use]
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let actions_file = std::env::var("RL_ACTIONS_FILE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_ACTIONS_FILE), PathBuf::from);
        let environment = Environment::parse(std::env::var("ENVIRONMENT").ok().as_deref());
        Self { port, actions_file, environment }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
