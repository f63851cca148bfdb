//! SSM Parameter Store resolver tests.

use pipeline_alerts::secrets::{AwsCredentials, SsmParameterStore};
use pipeline_alerts::{NotifyError, ParameterRef, SecretResolver};
use serde_json::json;
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helper Functions
// ============================================================================

fn store(server: &MockServer) -> SsmParameterStore {
    let credentials = AwsCredentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY")
        .session_token("session-token");
    SsmParameterStore::new("us-east-1", credentials).host(server.uri())
}

fn parameter_response(value: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "Parameter": {
            "ARN": "arn:aws:ssm:us-east-1:111111111111:parameter/SENDGRID_KEY",
            "Name": "SENDGRID_KEY",
            "Type": "SecureString",
            "Value": value,
            "Version": 1
        }
    }))
}

// ============================================================================
// Resolve Tests
// ============================================================================

#[tokio::test]
async fn resolve_sends_signed_get_parameter() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("X-Amz-Target", "AmazonSSM.GetParameter"))
        .and(header("Content-Type", "application/x-amz-json-1.1"))
        .and(header("X-Amz-Security-Token", "session-token"))
        .and(header_exists("X-Amz-Date"))
        .and(header_exists("Authorization"))
        .and(body_json(json!({"Name": "SENDGRID_KEY:1", "WithDecryption": true})))
        .respond_with(parameter_response("SG.from-ssm"))
        .expect(1)
        .mount(&server)
        .await;

    let value = store(&server)
        .resolve(&ParameterRef::default())
        .await
        .unwrap();
    assert_eq!(value.expose(), "SG.from-ssm");
}

#[tokio::test]
async fn resolve_is_not_cached() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(parameter_response("SG.from-ssm"))
        .expect(2)
        .mount(&server)
        .await;

    let store = store(&server);
    store.resolve(&ParameterRef::default()).await.unwrap();
    store.resolve(&ParameterRef::default()).await.unwrap();
}

// ============================================================================
// Error Response Tests
// ============================================================================

#[tokio::test]
async fn parameter_not_found_reports_error_type() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "__type": "ParameterNotFound",
            "message": ""
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = store(&server)
        .resolve(&ParameterRef::new("MISSING").version(2))
        .await
        .unwrap_err();
    match err {
        NotifyError::Secret { parameter, message } => {
            assert_eq!(parameter, "MISSING:2");
            assert!(message.contains("[ParameterNotFound]"));
            assert!(message.contains("HTTP 400"));
        }
        other => panic!("expected secret error, got {other:?}"),
    }
}

#[tokio::test]
async fn access_denied_uses_namespaced_type_and_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "__type": "com.amazon.coral.service#AccessDeniedException",
            "Message": "User is not authorized to perform ssm:GetParameter"
        })))
        .mount(&server)
        .await;

    let err = store(&server)
        .resolve(&ParameterRef::default())
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("[AccessDeniedException]"));
    assert!(message.contains("not authorized"));
}

#[tokio::test]
async fn missing_value_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Parameter": {"Name": "SENDGRID_KEY"}})))
        .mount(&server)
        .await;

    let err = store(&server)
        .resolve(&ParameterRef::default())
        .await
        .unwrap_err();
    assert!(matches!(err, NotifyError::Secret { .. }));
}
