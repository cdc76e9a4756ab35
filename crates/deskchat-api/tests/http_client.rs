use std::time::Duration;

use deskchat_api::{BackendClient, BackendError, HttpBackendClient};
use deskchat_types::BackendQuery;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpBackendClient {
    HttpBackendClient::new(&server.uri(), Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn predict_posts_query_and_decodes_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .and(body_json(json!({ "query": "Where is my order?", "order_number": null })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "intent": "track_order",
            "category": "ORDER",
            "response": "Your order ships tomorrow.",
            "confidence": 0.92,
            "template_flags": "B"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client_for(&server)
        .predict(&BackendQuery::new("Where is my order?"))
        .await
        .unwrap();

    assert_eq!(reply.response, "Your order ships tomorrow.");
    assert_eq!(reply.intent.as_deref(), Some("track_order"));
    assert_eq!(reply.confidence, Some(0.92));
    assert_eq!(reply.category.as_deref(), Some("ORDER"));
}

#[tokio::test]
async fn predict_sends_order_number_when_present() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .and(body_json(json!({ "query": "order #12345?", "order_number": "12345" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let query = BackendQuery::new("order #12345?").with_order_number(Some("12345".into()));
    let reply = client_for(&server).predict(&query).await.unwrap();
    assert_eq!(reply.response, "ok");
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error: boom"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .predict(&BackendQuery::new("Hi"))
        .await
        .unwrap_err();
    match err {
        BackendError::Status { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("boom"));
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn malformed_reply_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .predict(&BackendQuery::new("Hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Decode(_)), "got {:?}", err);
}

#[tokio::test]
async fn slow_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "response": "too late" }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = HttpBackendClient::new(&server.uri(), Duration::from_millis(200)).unwrap();
    let err = client.predict(&BackendQuery::new("Hi")).await.unwrap_err();
    assert!(matches!(err, BackendError::Timeout), "got {:?}", err);
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    // Nothing listens on port 9 (discard) in the test environment
    let client = HttpBackendClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
    let err = client.predict(&BackendQuery::new("Hi")).await.unwrap_err();
    assert!(
        matches!(err, BackendError::Transport(_) | BackendError::Timeout),
        "got {:?}",
        err
    );
}

#[tokio::test]
async fn catalogue_endpoints() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/intents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["password_reset", "hours_inquiry"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["account", "general"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/templates/password_reset"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "flags": "password reset",
            "instruction": "How to reset password",
            "category": "account",
            "intent": "password_reset",
            "response": "Click on the \"Forgot Password\" link."
        }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/templates/unknown"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "detail": "No templates found for intent: unknown"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy",
            "model_loaded": true,
            "templates_count": 2
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(client.intents().await.unwrap(), vec!["password_reset", "hours_inquiry"]);
    assert_eq!(client.categories().await.unwrap(), vec!["account", "general"]);

    let templates = client.templates("password_reset").await.unwrap();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].category, "account");

    assert!(client.templates("unknown").await.unwrap().is_empty());

    let health = client.health().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert!(health.model_loaded);
    assert_eq!(health.templates_count, 2);
}

#[tokio::test]
async fn base_url_with_predict_suffix_still_works() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let client =
        HttpBackendClient::new(&format!("{}/predict/", server.uri()), Duration::from_secs(2)).unwrap();
    assert_eq!(client.predict(&BackendQuery::new("Hi")).await.unwrap().response, "ok");
}
