//! Diagram service — prompt → LLM → cleaned Mermaid source.
//!
//! DESIGN
//! ======
//! Generation asks the model once per requested variation; the calls run
//! concurrently and results keep request order. Editing sends the existing
//! source together with the instruction under the edit system prompt and
//! expects the complete updated diagram back.
//!
//! Model output is cleaned before it leaves the server: a fenced code block
//! is unwrapped, a JSON-quoted string is decoded, and literal escape
//! sequences are turned into the characters they name.

use futures::future::try_join_all;
use tracing::{info, warn};
use uml_agent::generation::{DiagramResponse, MAX_VARIATIONS};

use crate::llm::{LlmChat, LlmError, Message};

pub const GENERATE_SYSTEM_PROMPT: &str = "You are a Mermaid diagram generator. Your task is to generate ONLY Mermaid code for UML diagrams based on user prompts.

Rules:
1. Output ONLY the Mermaid code, nothing else
2. Do not include markdown code blocks (no ```mermaid or ```)
3. Do not include any explanations or comments
4. Generate valid Mermaid UML syntax (classDiagram, sequenceDiagram, etc.)
5. Make the diagram comprehensive and well-structured based on the user's requirements

Example output format:
classDiagram
    class User {
        +String name
        +String email
        +login()
    }
    class Admin {
        +String role
        +manageUsers()
    }
    User <|-- Admin";

pub const EDIT_SYSTEM_PROMPT: &str = "You are a Mermaid diagram editor. Your task is to modify existing Mermaid diagram code based on user instructions.

Rules:
1. Output ONLY the complete, updated Mermaid code, nothing else
2. Do not include markdown code blocks (no ```mermaid or ```)
3. Do not include any explanations or comments
4. Preserve the structure and style of the existing diagram unless the user explicitly asks to change it
5. Apply the requested changes while maintaining valid Mermaid UML syntax
6. If the user wants to add elements, add them appropriately
7. If the user wants to remove elements, remove them completely
8. If the user wants to modify elements, update them accordingly
9. Return the COMPLETE updated diagram, not just the changes

Important: Always return the full, complete Mermaid code with all changes applied, not a diff or partial code.";

const FENCE: &str = "```";

#[derive(Debug, thiserror::Error)]
pub enum DiagramError {
    #[error("Prompt cannot be empty")]
    EmptyPrompt,

    #[error("Existing mermaid code cannot be empty")]
    EmptyExisting,

    #[error("model returned no diagram source")]
    EmptyOutput,

    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// Requested variation count limited to `1..=3`; absent means one.
#[must_use]
pub fn clamp_variations(requested: Option<u32>) -> u32 {
    requested.unwrap_or(1).clamp(1, MAX_VARIATIONS)
}

/// Generate one diagram per requested variation.
///
/// One result answers with `mermaid_code` only; several answer with
/// `variations` and mirror the first into `mermaid_code`.
///
/// # Errors
///
/// Returns [`DiagramError::EmptyPrompt`] for a blank prompt, or the first
/// LLM or empty-output failure among the calls.
pub async fn generate(llm: &dyn LlmChat, prompt: &str, requested: Option<u32>) -> Result<DiagramResponse, DiagramError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(DiagramError::EmptyPrompt);
    }
    let count = clamp_variations(requested);
    info!(model = llm.model(), prompt_len = prompt.len(), count, "diagram: generate");

    let calls = (0..count).map(|_| complete(llm, GENERATE_SYSTEM_PROMPT, prompt.to_owned()));
    let mut variations = try_join_all(calls).await?;

    if variations.len() == 1 {
        let only = variations.pop().unwrap_or_default();
        Ok(DiagramResponse::single(only))
    } else {
        Ok(DiagramResponse::multiple(variations))
    }
}

/// Apply an instruction to existing source and return the full result.
///
/// # Errors
///
/// Returns [`DiagramError::EmptyPrompt`] / [`DiagramError::EmptyExisting`]
/// for blank input, or an LLM or empty-output failure.
pub async fn edit(llm: &dyn LlmChat, prompt: &str, existing: &str) -> Result<DiagramResponse, DiagramError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(DiagramError::EmptyPrompt);
    }
    if existing.trim().is_empty() {
        return Err(DiagramError::EmptyExisting);
    }
    info!(model = llm.model(), prompt_len = prompt.len(), existing_len = existing.len(), "diagram: edit");

    let code = complete(llm, EDIT_SYSTEM_PROMPT, edit_message(prompt, existing)).await?;
    Ok(DiagramResponse::single(code))
}

fn edit_message(prompt: &str, existing: &str) -> String {
    format!(
        "Existing Mermaid diagram code:\n{existing}\n\nUser's edit request: {prompt}\n\n\
         Return the complete updated Mermaid code."
    )
}

async fn complete(llm: &dyn LlmChat, system: &str, user: String) -> Result<String, DiagramError> {
    let response = llm.chat(system, &[Message::user(user)]).await.map_err(|e| {
        warn!(error = %e, model = llm.model(), "diagram: llm call failed");
        e
    })?;
    info!(
        model = %response.model,
        finish_reason = %response.finish_reason,
        input_tokens = response.input_tokens,
        output_tokens = response.output_tokens,
        "diagram: llm call complete"
    );

    let code = clean_output(&response.text);
    if code.trim().is_empty() {
        return Err(DiagramError::EmptyOutput);
    }
    Ok(code)
}

// =============================================================================
// OUTPUT CLEANING
// =============================================================================

/// Unwrap fences, then unescape.
#[must_use]
pub fn clean_output(raw: &str) -> String {
    unescape_mermaid_code(&extract_mermaid_code(raw))
}

/// Return the body of the first fenced block (an optional `mermaid` tag is
/// dropped), or the trimmed text when there is no complete fence.
#[must_use]
pub fn extract_mermaid_code(text: &str) -> String {
    let text = text.trim();
    let Some(start) = text.find(FENCE) else {
        return text.to_owned();
    };
    let after = &text[start + FENCE.len()..];
    let Some(end) = after.find(FENCE) else {
        return text.to_owned();
    };
    let body = &after[..end];
    body.strip_prefix("mermaid").unwrap_or(body).trim().to_owned()
}

/// Decode a JSON-quoted string, then turn literal `\n`, `\t`, `\r`, `\"`,
/// `\'` and `\\` into the characters they name. Other backslashes are kept.
#[must_use]
pub fn unescape_mermaid_code(code: &str) -> String {
    let decoded;
    let code = if code.len() >= 2 && code.starts_with('"') && code.ends_with('"') {
        match serde_json::from_str::<String>(code) {
            Ok(inner) => {
                decoded = inner;
                decoded.as_str()
            }
            Err(_) => code,
        }
    } else {
        code
    };

    let mut out = String::with_capacity(code.len());
    let mut chars = code.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
#[path = "diagram_test.rs"]
mod tests;
