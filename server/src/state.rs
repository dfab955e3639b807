//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the optional LLM client and the action log. Both are `Arc`-wrapped
//! so cloning per request is cheap.

use std::sync::Arc;

use crate::llm::LlmChat;
use crate::services::actions::ActionLog;

#[derive(Clone)]
pub struct AppState {
    /// Optional LLM client. `None` if LLM env vars are not configured.
    pub llm: Option<Arc<dyn LlmChat>>,
    pub actions: Arc<ActionLog>,
}

impl AppState {
    #[must_use]
    pub fn new(llm: Option<Arc<dyn LlmChat>>, actions: ActionLog) -> Self {
        Self { llm, actions: Arc::new(actions) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::Mutex;

    use super::*;
    use crate::llm::{ChatResponse, LlmError, Message};

    /// Serializes tests that mutate process environment variables.
    pub static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Scripted LLM: answers calls in order from a queue and records
    /// `(system, user text)` for each call.
    pub struct MockLlm {
        responses: Mutex<VecDeque<Result<String, LlmError>>>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl MockLlm {
        pub fn new(responses: Vec<Result<String, LlmError>>) -> Self {
            Self { responses: Mutex::new(responses.into()), calls: Mutex::new(Vec::new()) }
        }

        pub fn with_texts(texts: &[&str]) -> Self {
            Self::new(texts.iter().map(|t| Ok((*t).to_owned())).collect())
        }

        pub fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl LlmChat for MockLlm {
        async fn chat(&self, system: &str, messages: &[Message]) -> Result<ChatResponse, LlmError> {
            let user = messages.iter().map(|m| m.content.as_str()).collect::<Vec<_>>().join("\n");
            self.calls.lock().unwrap().push((system.to_owned(), user));
            let next = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::ApiRequest("mock exhausted".into())));
            next.map(|text| ChatResponse {
                text,
                model: "mock".into(),
                finish_reason: "stop".into(),
                input_tokens: 0,
                output_tokens: 0,
            })
        }

        fn model(&self) -> &str {
            "mock"
        }
    }

    /// State without an LLM, logging actions under `dir`.
    #[must_use]
    pub fn test_app_state(dir: &Path) -> AppState {
        AppState::new(None, ActionLog::new(dir.join("rl_actions.json")))
    }

    /// State with a mock LLM, logging actions under `dir`.
    #[must_use]
    pub fn test_app_state_with_llm(dir: &Path, llm: Arc<dyn LlmChat>) -> AppState {
        AppState::new(Some(llm), ActionLog::new(dir.join("rl_actions.json")))
    }
}
