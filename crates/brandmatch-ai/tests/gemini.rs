//! Integration tests for `GeminiClient` against a wiremock server.

use brandmatch_ai::{AiError, GeminiClient, GeminiSettings, GenerationParams, TextGenerator};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(base_url: &str) -> GeminiSettings {
    GeminiSettings {
        api_key: "test-key".to_string(),
        base_url: base_url.to_string(),
        model: "gemini-1.5-flash".to_string(),
        timeout_secs: 5,
        top_p: 0.95,
        top_k: 40,
    }
}

fn client(base_url: &str) -> GeminiClient {
    GeminiClient::new(settings(base_url)).expect("client construction should not fail")
}

#[tokio::test]
async fn generate_text_sends_prompt_and_config() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(serde_json::json!({
            "contents": [{ "parts": [{ "text": "Ringkas performa @rara" }] }],
            "generationConfig": { "maxOutputTokens": 2048, "topK": 40 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [
                { "content": { "parts": [{ "text": "\n## Analisis Kecocokan\nCocok.\n" }] } }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let text = client(&server.uri())
        .generate_text("Ringkas performa @rara", GenerationParams::STRATEGY)
        .await
        .expect("generation should succeed");

    assert_eq!(text, "## Analisis Kecocokan\nCocok.");
}

#[tokio::test]
async fn trailing_slash_in_base_url_is_tolerated() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "ok" }] } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let base = format!("{}/", server.uri());
    let text = client(&base)
        .generate_text("halo", GenerationParams::INSIGHT)
        .await
        .unwrap();
    assert_eq!(text, "ok");
}

#[tokio::test]
async fn empty_candidate_text_is_invalid_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "  \n " }] } }]
        })))
        .mount(&server)
        .await;

    let err = client(&server.uri())
        .generate_text("halo", GenerationParams::INSIGHT)
        .await
        .unwrap_err();
    assert!(matches!(err, AiError::InvalidResponse(_)), "got {err:?}");
}

#[tokio::test]
async fn upstream_error_keeps_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(429).set_body_string("RESOURCE_EXHAUSTED"))
        .mount(&server)
        .await;

    let err = client(&server.uri())
        .generate_text("halo", GenerationParams::INSIGHT)
        .await
        .unwrap_err();
    match err {
        AiError::Upstream { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "RESOURCE_EXHAUSTED");
        }
        other => panic!("expected Upstream, got {other:?}"),
    }
}

#[tokio::test]
async fn non_json_success_body_is_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .mount(&server)
        .await;

    let err = client(&server.uri())
        .generate_text("halo", GenerationParams::INSIGHT)
        .await
        .unwrap_err();
    assert!(matches!(err, AiError::Deserialize { .. }), "got {err:?}");
}

#[tokio::test]
async fn unreachable_endpoint_is_connect_error() {
    let err = client("http://127.0.0.1:1")
        .generate_text("halo", GenerationParams::INSIGHT)
        .await
        .unwrap_err();
    assert!(matches!(err, AiError::Connect(_)), "got {err:?}");
}
