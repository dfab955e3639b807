//! LLM — chat adapter used by the diagram service.
//!
//! DESIGN
//! ======
//! Environment variables configure a single OpenAI-compatible
//! chat-completions client. Callers depend on the `LlmChat` trait so routes
//! and services can be tested against in-memory mocks.

pub mod config;
pub mod openai;
pub mod types;

use config::LlmConfig;
pub use openai::OpenAiClient;
pub use types::{ChatResponse, LlmChat, LlmError, Message};

/// Build the LLM client from environment variables.
///
/// # Errors
///
/// Returns an error if the API key is missing, a setting is out of range,
/// or the HTTP client fails to build.
pub fn from_env() -> Result<OpenAiClient, LlmError> {
    OpenAiClient::new(LlmConfig::from_env()?)
}
