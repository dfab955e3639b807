use super::*;

#[test]
fn multiple_variations_win_over_mermaid_code() {
    let response = DiagramResponse::multiple(vec!["A".into(), "B".into()]);
    assert_eq!(
        response.into_candidates().unwrap(),
        Candidates::Multiple(vec!["A".into(), "B".into()])
    );
}

#[test]
fn single_variation_collapses_to_single() {
    let response = DiagramResponse { mermaid_code: None, variations: Some(vec!["A".into()]) };
    assert_eq!(response.into_candidates().unwrap(), Candidates::Single("A".into()));
}

#[test]
fn blank_variations_are_dropped() {
    let response = DiagramResponse { mermaid_code: Some("A".into()), variations: Some(vec!["A".into(), "  ".into()]) };
    assert_eq!(response.into_candidates().unwrap(), Candidates::Single("A".into()));
}

#[test]
fn mermaid_code_only_is_single() {
    let response = DiagramResponse::single("graph TD\n A-->B");
    assert_eq!(response.into_candidates().unwrap(), Candidates::Single("graph TD\n A-->B".into()));
}

#[test]
fn empty_response_is_error() {
    let err = DiagramResponse::default().into_candidates().unwrap_err();
    assert!(matches!(err, GenerationError::EmptyResponse));
}

#[test]
fn response_deserializes_without_variations() {
    let response: DiagramResponse = serde_json::from_str(r#"{"mermaid_code":"graph TD"}"#).unwrap();
    assert_eq!(response.mermaid_code.as_deref(), Some("graph TD"));
    assert!(response.variations.is_none());
}

#[test]
fn generate_request_serializes_num_variations() {
    let body = GenerateRequest { prompt: "p".into(), num_variations: Some(3) };
    let json = serde_json::to_value(&body).unwrap();
    assert_eq!(json["num_variations"], 3);
}

#[test]
fn error_detail_prefers_detail_field() {
    assert_eq!(error_detail(400, r#"{"detail":"Prompt cannot be empty"}"#), "Prompt cannot be empty");
}

#[test]
fn error_detail_falls_back_to_body_then_status() {
    assert_eq!(error_detail(502, "bad gateway"), "bad gateway");
    assert_eq!(error_detail(502, ""), "request failed with status 502");
}

#[test]
fn api_error_message_is_detail_verbatim() {
    let err = GenerationError::Api { status: 500, detail: "Failed to generate diagram".into() };
    assert_eq!(err.user_message(), "Failed to generate diagram");
}

#[test]
fn http_service_trims_trailing_slash() {
    let svc = HttpDiagramService::new("http://localhost:8000/", Duration::from_secs(1), Duration::from_secs(1)).unwrap();
    assert_eq!(svc.base_url, "http://localhost:8000");
}
