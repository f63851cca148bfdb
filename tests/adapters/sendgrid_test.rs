//! SendGrid adapter tests.

use pipeline_alerts::providers::SendGridMailer;
use pipeline_alerts::{Email, Mailer, NotifyError, SecretValue};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helper Functions
// ============================================================================

fn key() -> SecretValue {
    SecretValue::new("SG.test-api-key")
}

fn alert_email() -> Email {
    Email::new()
        .from(("Deployment Alerts", "no-reply@example.com"))
        .to("developer@example.com")
        .subject("api FAILED failed")
        .html_body("<strong>State:</strong> FAILED<br/>\r\n")
}

fn accepted_response() -> ResponseTemplate {
    ResponseTemplate::new(202).insert_header("X-Message-Id", "123-xyz")
}

// ============================================================================
// Delivery Tests
// ============================================================================

#[tokio::test]
async fn successful_delivery_returns_message_id() {
    let server = MockServer::start().await;
    let mailer = SendGridMailer::new().base_url(server.uri());

    Mock::given(method("POST"))
        .and(path("/mail/send"))
        .and(header("Authorization", "Bearer SG.test-api-key"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({
            "from": {"email": "no-reply@example.com", "name": "Deployment Alerts"},
            "personalizations": [{"to": [{"email": "developer@example.com"}]}],
            "content": [
                {"type": "text/html", "value": "<strong>State:</strong> FAILED<br/>\r\n"}
            ],
            "subject": "api FAILED failed"
        })))
        .respond_with(accepted_response())
        .expect(1)
        .mount(&server)
        .await;

    let delivery = mailer.deliver(&alert_email(), &key()).await.unwrap();
    assert_eq!(delivery.message_id, "123-xyz");
}

#[tokio::test]
async fn text_only_delivery_returns_ok() {
    let server = MockServer::start().await;
    let mailer = SendGridMailer::new().base_url(server.uri());

    let email = Email::new()
        .from("no-reply@example.com")
        .to("developer@example.com")
        .subject("demo-pipeline STARTED started")
        .text_body("State: STARTED\r\n");

    Mock::given(method("POST"))
        .and(path("/mail/send"))
        .and(body_json(json!({
            "from": {"email": "no-reply@example.com"},
            "personalizations": [{"to": [{"email": "developer@example.com"}]}],
            "content": [{"type": "text/plain", "value": "State: STARTED\r\n"}],
            "subject": "demo-pipeline STARTED started"
        })))
        .respond_with(accepted_response())
        .expect(1)
        .mount(&server)
        .await;

    assert!(mailer.deliver(&email, &key()).await.is_ok());
}

#[tokio::test]
async fn each_delivery_uses_the_key_it_is_given() {
    let server = MockServer::start().await;
    let mailer = SendGridMailer::new().base_url(server.uri());

    Mock::given(method("POST"))
        .and(header("Authorization", "Bearer SG.first"))
        .respond_with(accepted_response())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header("Authorization", "Bearer SG.rotated"))
        .respond_with(accepted_response())
        .expect(1)
        .mount(&server)
        .await;

    mailer
        .deliver(&alert_email(), &SecretValue::new("SG.first"))
        .await
        .unwrap();
    mailer
        .deliver(&alert_email(), &SecretValue::new("SG.rotated"))
        .await
        .unwrap();
}

#[tokio::test]
async fn missing_message_id_header_gets_generated_id() {
    let server = MockServer::start().await;
    let mailer = SendGridMailer::new().base_url(server.uri());

    Mock::given(method("POST"))
        .and(path("/mail/send"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let delivery = mailer.deliver(&alert_email(), &key()).await.unwrap();
    assert!(!delivery.message_id.is_empty());
}

#[tokio::test]
async fn compressed_delivery_sets_content_encoding() {
    let server = MockServer::start().await;
    let mailer = SendGridMailer::new().base_url(server.uri()).compress(true);

    Mock::given(method("POST"))
        .and(path("/mail/send"))
        .and(header("Content-Encoding", "gzip"))
        .respond_with(accepted_response())
        .expect(1)
        .mount(&server)
        .await;

    assert!(mailer.deliver(&alert_email(), &key()).await.is_ok());
}

// ============================================================================
// Error Response Tests
// ============================================================================

#[tokio::test]
async fn deliver_with_401_reports_status_and_message() {
    let server = MockServer::start().await;
    let mailer = SendGridMailer::new().base_url(server.uri());

    Mock::given(method("POST"))
        .and(path("/mail/send"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "errors": [{"field": null, "message": "The provided authorization grant is invalid, expired, or revoked"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = mailer.deliver(&alert_email(), &key()).await.unwrap_err();
    match err {
        NotifyError::ProviderError {
            provider,
            message,
            status,
        } => {
            assert_eq!(provider, "sendgrid");
            assert_eq!(status, Some(401));
            assert!(message.contains("authorization grant is invalid"));
        }
        other => panic!("expected provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn deliver_with_400_includes_field() {
    let server = MockServer::start().await;
    let mailer = SendGridMailer::new().base_url(server.uri());

    Mock::given(method("POST"))
        .and(path("/mail/send"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": [{"field": "from.email", "message": "does not contain a valid address"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = mailer.deliver(&alert_email(), &key()).await.unwrap_err();
    assert!(err
        .to_string()
        .contains("does not contain a valid address (field: from.email)"));
}

#[tokio::test]
async fn deliver_with_500_and_empty_body() {
    let server = MockServer::start().await;
    let mailer = SendGridMailer::new().base_url(server.uri());

    Mock::given(method("POST"))
        .and(path("/mail/send"))
        .respond_with(ResponseTemplate::new(500).set_body_string(""))
        .expect(1)
        .mount(&server)
        .await;

    let err = mailer.deliver(&alert_email(), &key()).await.unwrap_err();
    assert!(err.to_string().contains("Unknown error"));
}

// ============================================================================
// Validation Tests
// ============================================================================

#[tokio::test]
async fn deliver_without_to_returns_error() {
    let server = MockServer::start().await;
    let mailer = SendGridMailer::new().base_url(server.uri());

    let email = Email::new()
        .from("no-reply@example.com")
        .subject("Hello!")
        .text_body("Hi");

    let err = mailer.deliver(&email, &key()).await.unwrap_err();
    assert!(matches!(err, NotifyError::MissingField("to")));
}
