//! Review Generator Contract Tests
//!
//! Verifies the HTTP format of the Anthropic Messages API adapter: request
//! headers and body, response text extraction, and error mapping.

use autopress::config::GeneratorConfig;
use autopress::content::{AnthropicGenerator, GenerateError, ReviewGenerator};
use autopress::queue::PaperMeta;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn generator(server: &MockServer) -> AnthropicGenerator {
    AnthropicGenerator::new(&GeneratorConfig {
        api_url: server.uri(),
        api_key: "sk-test-key".to_owned(),
        api_model: "claude-sonnet-4-20250514".to_owned(),
        max_tokens: 2048,
    })
    .expect("generator builds")
}

fn paper() -> PaperMeta {
    PaperMeta {
        title: "Attention Is All You Need".to_owned(),
        authors: vec!["Vaswani".to_owned()],
        year: Some(2017),
        ..PaperMeta::default()
    }
}

#[tokio::test]
async fn request_carries_model_key_and_version() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "model": "claude-sonnet-4-20250514",
            "max_tokens": 2048,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{ "type": "text", "text": "## 핵심 요약\n\n어텐션만으로 충분하다." }],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let review = generator(&server).generate(&paper(), 7).await.expect("generated");
    assert_eq!(review.title, "Attention Is All You Need");
    assert!(review.markdown.contains("핵심 요약"));
    assert_eq!(review.summary, "어텐션만으로 충분하다.");
}

#[tokio::test]
async fn multiple_text_blocks_are_joined() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [
                { "type": "text", "text": "첫 번째 " },
                { "type": "text", "text": "두 번째" },
            ],
        })))
        .mount(&server)
        .await;

    let review = generator(&server).generate(&paper(), 1).await.expect("generated");
    assert_eq!(review.markdown, "첫 번째 두 번째");
}

#[tokio::test]
async fn api_error_status_maps_to_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(529).set_body_json(json!({
            "error": { "type": "overloaded_error", "message": "Overloaded" },
        })))
        .mount(&server)
        .await;

    let err = generator(&server).generate(&paper(), 1).await.unwrap_err();
    match err {
        GenerateError::Api(msg) => assert!(msg.contains("529"), "message was: {msg}"),
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_content_maps_to_empty_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "content": [] })))
        .mount(&server)
        .await;

    let err = generator(&server).generate(&paper(), 1).await.unwrap_err();
    assert!(matches!(err, GenerateError::Empty), "got: {err:?}");
}

#[tokio::test]
async fn non_json_response_maps_to_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_string("proxy error"))
        .mount(&server)
        .await;

    let err = generator(&server).generate(&paper(), 1).await.unwrap_err();
    assert!(matches!(err, GenerateError::Api(_)), "got: {err:?}");
}
