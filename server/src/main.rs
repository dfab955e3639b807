mod config;
mod llm;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::llm::LlmChat;
use crate::services::actions::ActionLog;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env();

    // Non-fatal: diagram routes answer 503 until the key is configured.
    let llm: Option<Arc<dyn LlmChat>> = match llm::from_env() {
        Ok(client) => {
            tracing::info!(model = client.model(), "LLM client initialized");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "LLM client not configured; diagram routes disabled");
            None
        }
    };

    let actions = ActionLog::new(&config.actions_file);
    tracing::info!(path = %actions.path().display(), "recording actions");
    let state = state::AppState::new(llm, actions);

    let app = routes::app(state, config.environment);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind");

    tracing::info!(port = config.port, environment = ?config.environment, "uml-agent-server listening");
    axum::serve(listener, app).await.expect("server failed");
}
