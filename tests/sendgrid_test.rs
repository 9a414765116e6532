//! Delivery tests against a mocked Mail Send endpoint.

use gridmail::{Mailer, Message, SendGridBackend};
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helper Functions
// ============================================================================

fn valid_message() -> Message {
    Message::new()
        .from("tony.stark@example.com")
        .to("steve.rogers@example.com")
        .subject("Hello, Avengers!")
        .html_body("<h1>Hello</h1>")
        .text_body("Hello")
}

fn default_settings_json() -> (serde_json::Value, serde_json::Value) {
    (
        json!({"sandbox_mode": {"enable": false}}),
        json!({
            "open_tracking": {"enable": true},
            "click_tracking": {"enable": true, "enable_text": true},
        }),
    )
}

fn accepted_response() -> ResponseTemplate {
    ResponseTemplate::new(202).insert_header("X-Message-Id", "123-xyz")
}

// ============================================================================
// Basic Delivery Tests
// ============================================================================

#[tokio::test]
async fn successful_delivery_returns_status_and_message_id() {
    let server = MockServer::start().await;
    let backend = SendGridBackend::new("SG.test-api-key").base_url(server.uri());

    let (mail_settings, tracking_settings) = default_settings_json();
    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .and(header("Authorization", "Bearer SG.test-api-key"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({
            "from": {"email": "tony.stark@example.com"},
            "personalizations": [{
                "to": [{"email": "steve.rogers@example.com"}],
                "subject": "Hello, Avengers!"
            }],
            "content": [
                {"type": "text/plain", "value": "Hello"},
                {"type": "text/html", "value": "<h1>Hello</h1>"}
            ],
            "subject": "Hello, Avengers!",
            "mail_settings": mail_settings,
            "tracking_settings": tracking_settings,
        })))
        .respond_with(accepted_response())
        .expect(1)
        .mount(&server)
        .await;

    let result = backend.deliver(&valid_message()).await;
    assert!(result.is_ok(), "Expected Ok, got: {:?}", result);
    let delivery = result.unwrap();
    assert_eq!(delivery.status, 202);
    assert_eq!(delivery.message_id, Some("123-xyz".to_string()));
}

#[tokio::test]
async fn delivery_without_message_id_header_returns_none() {
    let server = MockServer::start().await;
    let backend = SendGridBackend::new("SG.test-api-key").base_url(server.uri());

    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let delivery = backend.deliver(&valid_message()).await.unwrap();
    assert_eq!(delivery.status, 202);
    assert_eq!(delivery.message_id, None);
}

#[tokio::test]
async fn named_addresses_are_serialized() {
    let server = MockServer::start().await;
    let backend = SendGridBackend::new("SG.test-api-key").base_url(server.uri());

    let message = Message::new()
        .from(("T Stark", "tony.stark@example.com"))
        .to("Steve Rogers <steve.rogers@example.com>")
        .subject("Hello, Avengers!")
        .text_body("Hello");

    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .and(body_partial_json(json!({
            "from": {"name": "T Stark", "email": "tony.stark@example.com"},
            "personalizations": [{
                "to": [{"name": "Steve Rogers", "email": "steve.rogers@example.com"}]
            }],
        })))
        .respond_with(accepted_response())
        .expect(1)
        .mount(&server)
        .await;

    assert!(backend.deliver(&message).await.is_ok());
}

#[tokio::test]
async fn gzip_compression_sets_content_encoding() {
    let server = MockServer::start().await;
    let backend = SendGridBackend::new("SG.test-api-key")
        .base_url(server.uri())
        .compress(true);

    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .and(header("Content-Encoding", "gzip"))
        .and(header_exists("Authorization"))
        .respond_with(accepted_response())
        .expect(1)
        .mount(&server)
        .await;

    assert!(backend.deliver(&valid_message()).await.is_ok());
}

// ============================================================================
// Error Response Tests
// ============================================================================

#[tokio::test]
async fn deliver_with_429_response() {
    let server = MockServer::start().await;
    let backend = SendGridBackend::new("SG.test-api-key").base_url(server.uri());

    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "errors": [{"field": null, "message": "too many requests"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = backend.deliver(&valid_message()).await.unwrap_err();
    assert!(err.to_string().contains("too many requests"));
}

#[tokio::test]
async fn deliver_with_400_response_joins_error_messages() {
    let server = MockServer::start().await;
    let backend = SendGridBackend::new("SG.test-api-key").base_url(server.uri());

    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": [
                {"field": "identifier1", "message": "error message explained"},
                {"field": null, "message": "second problem"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = backend.deliver(&valid_message()).await.unwrap_err();
    let text = err.to_string();
    assert!(text.contains("error message explained"));
    assert!(text.contains("second problem"));
}

#[tokio::test]
async fn deliver_with_500_empty_body() {
    let server = MockServer::start().await;
    let backend = SendGridBackend::new("SG.test-api-key").base_url(server.uri());

    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(500).set_body_string(""))
        .expect(1)
        .mount(&server)
        .await;

    let err = backend.deliver(&valid_message()).await.unwrap_err();
    match err {
        gridmail::MailError::Api { status, .. } => assert_eq!(status, Some(500)),
        other => panic!("expected Api error, got {:?}", other),
    }
}

// ============================================================================
// Validation Tests
// ============================================================================

#[tokio::test]
async fn deliver_without_from_returns_error() {
    let backend = SendGridBackend::new("SG.test-api-key");

    let message = Message::new()
        .to("steve.rogers@example.com")
        .subject("Hello!")
        .text_body("Hi");

    let err = backend.deliver(&message).await.unwrap_err();
    assert!(err.to_string().contains("from"));
}

#[tokio::test]
async fn deliver_without_recipients_returns_error() {
    let backend = SendGridBackend::new("SG.test-api-key");

    let message = Message::new()
        .from("tony.stark@example.com")
        .subject("Hello!")
        .text_body("Hi");

    let err = backend.deliver(&message).await.unwrap_err();
    assert!(err.to_string().contains("recipients"));
}

// ============================================================================
// Batch Send Tests
// ============================================================================

fn batch() -> Vec<Message> {
    vec![
        valid_message().subject("first"),
        valid_message().subject("boom"),
        valid_message().subject("third"),
    ]
}

#[tokio::test]
async fn send_messages_counts_successes() {
    let server = MockServer::start().await;
    let backend = SendGridBackend::new("SG.test-api-key").base_url(server.uri());

    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(accepted_response())
        .expect(3)
        .mount(&server)
        .await;

    let sent = backend.send_messages(&batch()).await.unwrap();
    assert_eq!(sent, 3);
}

#[tokio::test]
async fn send_messages_fail_silently_skips_failures() {
    let server = MockServer::start().await;
    let backend = SendGridBackend::new("SG.test-api-key")
        .base_url(server.uri())
        .fail_silently(true);

    // The "boom" message is refused; the others are accepted.
    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .and(body_partial_json(json!({"subject": "boom"})))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": [{"field": null, "message": "no"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(accepted_response())
        .expect(2)
        .mount(&server)
        .await;

    let sent = backend.send_messages(&batch()).await.unwrap();
    assert_eq!(sent, 2);
}

#[tokio::test]
async fn send_messages_propagates_errors_by_default() {
    let server = MockServer::start().await;
    let backend = SendGridBackend::new("SG.test-api-key").base_url(server.uri());

    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .and(body_partial_json(json!({"subject": "boom"})))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": [{"field": null, "message": "no"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(accepted_response())
        .mount(&server)
        .await;

    let result = backend.send_messages(&batch()).await;
    assert!(result.is_err());
}

// ============================================================================
// Global Mailer Tests
// ============================================================================

#[tokio::test]
async fn configured_global_mailer_delivers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(accepted_response())
        .expect(1)
        .mount(&server)
        .await;

    gridmail::configure(SendGridBackend::new("SG.test-api-key").base_url(server.uri()));

    let result = gridmail::deliver(&valid_message()).await;
    gridmail::reset();

    assert!(result.is_ok(), "Expected Ok, got: {:?}", result);
}

// ============================================================================
// Provider Name Test
// ============================================================================

#[test]
fn provider_name_returns_sendgrid() {
    let backend = SendGridBackend::new("SG.test-api-key");
    assert_eq!(backend.provider_name(), "sendgrid");
}
