//! Parameters and Secrets extension resolver tests.

use pipeline_alerts::secrets::{ParametersExtension, DEFAULT_EXTENSION_PORT};
use pipeline_alerts::{NotifyError, ParameterRef, SecretResolver};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn extension(server: &MockServer) -> ParametersExtension {
    ParametersExtension::new(DEFAULT_EXTENSION_PORT, "session-token").base_url(server.uri())
}

#[tokio::test]
async fn resolve_queries_extension_with_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/systemsmanager/parameters/get"))
        .and(query_param("name", "SENDGRID_KEY"))
        .and(query_param("version", "1"))
        .and(query_param("withDecryption", "true"))
        .and(header("X-Aws-Parameters-Secrets-Token", "session-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Parameter": {"Name": "SENDGRID_KEY", "Value": "SG.from-extension", "Version": 1}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let value = extension(&server)
        .resolve(&ParameterRef::default())
        .await
        .unwrap();
    assert_eq!(value.expose(), "SG.from-extension");
}

#[tokio::test]
async fn path_style_names_are_decoded_by_server() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("name", "/alerts/sendgrid"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Parameter": {"Value": "SG.path"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let value = extension(&server)
        .resolve(&ParameterRef::new("/alerts/sendgrid"))
        .await
        .unwrap();
    assert_eq!(value.expose(), "SG.path");
}

#[tokio::test]
async fn server_error_becomes_secret_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("not ready for requests"))
        .expect(1)
        .mount(&server)
        .await;

    let err = extension(&server)
        .resolve(&ParameterRef::default())
        .await
        .unwrap_err();
    match err {
        NotifyError::Secret { parameter, message } => {
            assert_eq!(parameter, "SENDGRID_KEY:1");
            assert_eq!(message, "HTTP 500: not ready for requests");
        }
        other => panic!("expected secret error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_extension_becomes_secret_error() {
    // Nothing listens on the discard port.
    let ext = ParametersExtension::new(DEFAULT_EXTENSION_PORT, "t").base_url("http://127.0.0.1:9");

    let err = ext.resolve(&ParameterRef::default()).await.unwrap_err();
    assert!(matches!(err, NotifyError::Secret { ref message, .. } if message.contains("Extension unreachable")));
}
