//! Publisher behaviour against a mock platform API.

use serde_json::json;
use shared::{BotError, Publisher, TwitterCredentials};
use wiremock::matchers::{body_json, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credentials() -> TwitterCredentials {
    TwitterCredentials {
        api_key: "consumer".to_string(),
        api_secret: "consumer-secret".to_string(),
        access_token: "token".to_string(),
        access_secret: "token-secret".to_string(),
    }
}

fn publisher(server: &MockServer, dry_run: bool) -> Publisher {
    Publisher::new(credentials(), dry_run)
        .unwrap()
        .with_api_base(server.uri())
}

/// Fails the test on drop if anything reaches the server.
async fn forbid_requests(server: &MockServer) {
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_too_long_content_is_rejected_before_network() {
    let server = MockServer::start().await;
    forbid_requests(&server).await;

    let err = publisher(&server, false)
        .publish(&"x".repeat(281), false)
        .await
        .unwrap_err();

    assert!(matches!(err, BotError::InvalidContent(_)));
}

#[tokio::test]
async fn test_empty_content_is_rejected() {
    let server = MockServer::start().await;
    forbid_requests(&server).await;

    let err = publisher(&server, false).publish("", false).await.unwrap_err();

    assert!(matches!(err, BotError::InvalidContent(_)));
}

#[tokio::test]
async fn test_dry_run_argument_skips_network() {
    let server = MockServer::start().await;
    forbid_requests(&server).await;

    let url = publisher(&server, false).publish("hello", true).await.unwrap();

    assert!(url.is_none());
}

#[tokio::test]
async fn test_global_dry_run_skips_network() {
    let server = MockServer::start().await;
    forbid_requests(&server).await;

    let url = publisher(&server, true).publish("hello", false).await.unwrap();

    assert!(url.is_none());
}

#[tokio::test]
async fn test_exactly_280_characters_is_allowed() {
    let server = MockServer::start().await;
    forbid_requests(&server).await;

    let url = publisher(&server, false)
        .publish(&"é".repeat(280), true)
        .await
        .unwrap();

    assert!(url.is_none());
}

#[tokio::test]
async fn test_publish_returns_post_url() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .and(header_exists("authorization"))
        .and(body_json(json!({"text": "hello world"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": {"id": "1234567890", "text": "hello world"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let url = publisher(&server, false)
        .publish("hello world", false)
        .await
        .unwrap();

    assert_eq!(
        url.as_deref(),
        Some("https://twitter.com/i/web/status/1234567890")
    );
}

#[tokio::test]
async fn test_rejected_post_is_a_publish_error_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "detail": "You are not allowed to create a Tweet with duplicate content.",
            "status": 403
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = publisher(&server, false)
        .publish("hello again", false)
        .await
        .unwrap_err();

    match err {
        BotError::Publish(message) => assert!(message.contains("duplicate")),
        other => panic!("expected Publish error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_verify_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/2/users/me"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"id": "42", "name": "Bot", "username": "headline_bot"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    assert!(publisher(&server, false).verify_credentials().await);
}

#[tokio::test]
async fn test_verify_credentials_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/2/users/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    assert!(!publisher(&server, false).verify_credentials().await);
}
