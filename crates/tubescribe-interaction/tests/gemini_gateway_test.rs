use std::time::Duration;

use serde_json::json;
use tubescribe_core::ScribeError;
use tubescribe_core::config::GatewayConfig;
use tubescribe_core::gateway::{AiGateway, AiRequest};
use tubescribe_interaction::GeminiGateway;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "AIza-test-key";

fn gateway(server: &MockServer) -> GeminiGateway {
    GeminiGateway::new(GatewayConfig::default())
        .with_base_url(format!("{}/v1beta/models", server.uri()))
}

fn request(model: Option<&str>) -> AiRequest {
    AiRequest {
        action: "summarize".to_string(),
        prompt: "Summarize: hello world".to_string(),
        model: model.map(str::to_string),
    }
}

fn text_response(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{"content": {"parts": [{"text": text}], "role": "model"}}]
    }))
}

#[tokio::test]
async fn test_generate_posts_prompt_to_normalized_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .and(query_param("key", API_KEY))
        .respond_with(text_response("A short summary"))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway(&server);
    gateway.set_credential(Some(API_KEY.to_string())).await;

    let response = gateway.generate(request(Some("gemini-pro"))).await.unwrap();
    assert_eq!(response.text, "A short summary");
    assert_eq!(response.model, "gemini-2.0-flash");

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["contents"][0]["parts"][0]["text"], "Summarize: hello world");
    assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
}

#[tokio::test]
async fn test_missing_credential_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(text_response("unused"))
        .expect(0)
        .mount(&server)
        .await;

    let gateway = gateway(&server);
    let err = gateway.generate(request(None)).await.unwrap_err();
    assert_eq!(err, ScribeError::MissingCredential);
}

#[tokio::test]
async fn test_rate_limit_is_reported_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway(&server);
    gateway.set_credential(Some(API_KEY.to_string())).await;

    let err = gateway.generate(request(None)).await.unwrap_err();
    assert!(matches!(err, ScribeError::RateLimited { .. }));
    assert!(err.to_string().contains("try again later"));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_server_error_keeps_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let gateway = gateway(&server);
    gateway.set_credential(Some(API_KEY.to_string())).await;

    let err = gateway.generate(request(None)).await.unwrap_err();
    assert_eq!(err, ScribeError::upstream(503, "overloaded"));
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(text_response("late").set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let gateway = gateway(&server).with_timeout(Duration::from_secs(1));
    gateway.set_credential(Some(API_KEY.to_string())).await;

    let err = gateway.generate(request(None)).await.unwrap_err();
    assert_eq!(err, ScribeError::Timeout { seconds: 1 });
}

#[tokio::test]
async fn test_success_without_text_is_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .mount(&server)
        .await;

    let gateway = gateway(&server);
    gateway.set_credential(Some(API_KEY.to_string())).await;

    let err = gateway.generate(request(None)).await.unwrap_err();
    assert_eq!(err, ScribeError::upstream(200, "no text in response"));
}

#[tokio::test]
async fn test_unparseable_success_body_is_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway(&server);
    gateway.set_credential(Some(API_KEY.to_string())).await;

    let err = gateway.generate(request(None)).await.unwrap_err();
    match err {
        ScribeError::UpstreamError { status, message } => {
            assert_eq!(status, 200);
            assert!(message.starts_with("Failed to parse Gemini response"), "{message}");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_validate_credential_sends_tiny_request_without_storing_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("key", "candidate-key"))
        .respond_with(text_response("API key is valid"))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway(&server);
    let message = gateway.validate_credential("candidate-key").await.unwrap();
    assert!(message.contains("valid"));
    assert_eq!(gateway.credential().await, None);

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["generationConfig"]["maxOutputTokens"], 20);
}

#[tokio::test]
async fn test_validate_rejected_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}
        })))
        .mount(&server)
        .await;

    let err = gateway(&server).validate_credential("bad").await.unwrap_err();
    assert_eq!(
        err,
        ScribeError::InvalidRequest {
            message: "INVALID_ARGUMENT: API key not valid.".into()
        }
    );
}
