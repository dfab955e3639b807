use super::*;

#[test]
fn missing_key_names_the_variable() {
    let err = LlmError::MissingApiKey { var: "OPENAI_API_KEY".into() };
    assert_eq!(err.to_string(), "missing API key: env var OPENAI_API_KEY not set");
}

#[test]
fn api_response_hides_body_in_display() {
    let err = LlmError::ApiResponse { status: 429, body: "rate limited".into() };
    assert_eq!(err.to_string(), "API response error: status 429");
}

#[test]
fn user_message_sets_role() {
    let msg = Message::user("draw a class diagram");
    assert_eq!(msg.role, "user");
    assert_eq!(msg.content, "draw a class diagram");
}
