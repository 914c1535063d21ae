//! Publish Surface Contract Tests
//!
//! These tests verify the HTTP contract of the Tistory manage surface
//! client: request format, receipt parsing, the error taxonomy, and the
//! retry behaviors (transient backoff, daily-limit private fallback).

use autopress::publish::{CategoryId, PostDraft, PublishError, TistoryClient, Visibility};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COOKIE: &str = "TSSESSION=abc; _T_ANO=def";

fn client(server: &MockServer) -> TistoryClient {
    TistoryClient::new("example", Some("99"))
        .expect("client builds")
        .with_blog_base(server.uri())
}

fn draft() -> PostDraft {
    PostDraft {
        title: "[Transformer] Attention Is All You Need".to_owned(),
        html: "<h1>리뷰</h1><p>본문</p>".to_owned(),
        category: CategoryId("1187390".to_owned()),
        tags: vec!["ai".to_owned()],
        visibility: Visibility::Public,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Submission
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn submit_sends_cookie_and_reads_back_receipt() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/manage/post.json"))
        .and(header("cookie", COOKIE))
        .and(body_partial_json(json!({
            "id": "0",
            "title": "[Transformer] Attention Is All You Need",
            "category": 1187390,
            "visibility": 20,
            "published": 1,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 321,
            "entryUrl": "https://example.tistory.com/321",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = client(&server).submit_post(&draft(), COOKIE).await.expect("accepted");
    assert_eq!(receipt.post_id.as_deref(), Some("321"));
    assert_eq!(receipt.url.as_deref(), Some("https://example.tistory.com/321"));
}

#[tokio::test]
async fn unauthorized_status_maps_to_auth_expired() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/manage/post.json"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client(&server).submit_post(&draft(), COOKIE).await.unwrap_err();
    assert!(matches!(err, PublishError::AuthExpired), "got: {err:?}");
}

#[tokio::test]
async fn login_redirect_maps_to_auth_expired() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/manage/post.json"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "/auth/login?next=write"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let err = client(&server).submit_post(&draft(), COOKIE).await.unwrap_err();
    assert!(matches!(err, PublishError::AuthExpired), "got: {err:?}");
}

#[tokio::test]
async fn bad_request_maps_to_validation_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/manage/post.json"))
        .respond_with(ResponseTemplate::new(400).set_body_string("title required"))
        .mount(&server)
        .await;

    let err = client(&server).submit_post(&draft(), COOKIE).await.unwrap_err();
    match err {
        PublishError::ValidationRejected(msg) => assert!(msg.contains("title required")),
        other => panic!("expected ValidationRejected, got: {other:?}"),
    }
}

#[tokio::test]
async fn accepted_but_non_json_response_signals_contract_drift() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/manage/post.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>editor moved</html>"))
        .mount(&server)
        .await;

    let err = client(&server).submit_post(&draft(), COOKIE).await.unwrap_err();
    assert!(matches!(err, PublishError::EndpointChanged(_)), "got: {err:?}");
}

#[tokio::test]
async fn unexpected_status_signals_contract_drift() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/manage/post.json"))
        .respond_with(ResponseTemplate::new(418))
        .mount(&server)
        .await;

    let err = client(&server).submit_post(&draft(), COOKIE).await.unwrap_err();
    assert!(matches!(err, PublishError::EndpointChanged(_)), "got: {err:?}");
}

#[tokio::test]
async fn server_errors_are_retried_then_succeed() {
    let server = MockServer::start().await;

    // Two 5xx responses, then the endpoint recovers.
    Mock::given(method("POST"))
        .and(path("/manage/post.json"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/manage/post.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = client(&server).submit_post(&draft(), COOKIE).await.expect("recovered");
    assert_eq!(receipt.post_id.as_deref(), Some("1"));
}

#[tokio::test]
async fn persistent_server_errors_exhaust_retries() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/manage/post.json"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3) // initial attempt + two retries
        .mount(&server)
        .await;

    let err = client(&server).submit_post(&draft(), COOKIE).await.unwrap_err();
    assert!(matches!(err, PublishError::TransientNetwork(_)), "got: {err:?}");
}

#[tokio::test]
async fn daily_limit_rejection_retries_as_private_post() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/manage/post.json"))
        .and(body_partial_json(json!({ "visibility": 20 })))
        .respond_with(
            ResponseTemplate::new(403).set_body_string("하루에 발행 가능한 글은 15개입니다."),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/manage/post.json"))
        .and(body_partial_json(json!({ "visibility": 10, "published": 0 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 9 })))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = client(&server).submit_post(&draft(), COOKIE).await.expect("private retry");
    assert_eq!(receipt.post_id.as_deref(), Some("9"));
}

#[tokio::test]
async fn plain_forbidden_maps_to_auth_expired_without_private_retry() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/manage/post.json"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).submit_post(&draft(), COOKIE).await.unwrap_err();
    assert!(matches!(err, PublishError::AuthExpired), "got: {err:?}");
}

// ────────────────────────────────────────────────────────────────────────────
// Category resolution
// ────────────────────────────────────────────────────────────────────────────

const EDITOR_PAGE: &str = r#"<html><body>
<select id="categoryId" name="categoryId">
  <option value="0">미분류</option>
  <option value="1187390">PaperReview</option>
</select>
</body></html>"#;

#[tokio::test]
async fn category_is_resolved_by_name() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/manage/newpost/99"))
        .and(header("cookie", COOKIE))
        .respond_with(ResponseTemplate::new(200).set_body_string(EDITOR_PAGE))
        .mount(&server)
        .await;

    let resolved = client(&server)
        .resolve_category("PaperReview", COOKIE)
        .await
        .expect("editor page fetched");
    assert_eq!(resolved, Some(CategoryId("1187390".to_owned())));
}

#[tokio::test]
async fn unknown_category_name_resolves_to_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/manage/newpost/99"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EDITOR_PAGE))
        .mount(&server)
        .await;

    let resolved = client(&server)
        .resolve_category("NoSuchCategory", COOKIE)
        .await
        .expect("editor page fetched");
    assert_eq!(resolved, None);
}

#[tokio::test]
async fn category_lookup_detects_expired_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/manage/newpost/99"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/auth/login"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let err = client(&server)
        .resolve_category("PaperReview", COOKIE)
        .await
        .unwrap_err();
    assert!(matches!(err, PublishError::AuthExpired), "got: {err:?}");
}
