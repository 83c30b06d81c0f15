//! OpenAI provider against a local stub of the chat completions endpoint.

mod common;

use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
use common::{reading_json, TEST_IMAGE};
use palm_service::services::providers::openai::{OpenAiConfig, OpenAiVisionProvider};
use palm_service::services::providers::{
    FinishReason, ProviderError, VisionProvider, VisionRequest,
};
use palm_service::services::{PalmReader, ReadingError};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

#[derive(Clone)]
struct Stub {
    status: StatusCode,
    reply: Value,
    seen: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

async fn chat_completions(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    stub.seen.lock().unwrap().push((auth, body));
    (stub.status, Json(stub.reply.clone()))
}

/// Serve `reply` with `status` and return the base URL plus captured requests.
async fn spawn_stub(
    status: StatusCode,
    reply: Value,
) -> (String, Arc<Mutex<Vec<(Option<String>, Value)>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(Stub {
            status,
            reply,
            seen: seen.clone(),
        });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://127.0.0.1:{}/v1", port), seen)
}

fn provider(base_url: &str) -> OpenAiVisionProvider {
    OpenAiVisionProvider::new(OpenAiConfig {
        api_key: SecretString::new("sk-test-key".to_string()),
        model: "gpt-4o".to_string(),
        base_url: base_url.to_string(),
    })
    .unwrap()
}

fn completion(content: Value, finish_reason: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": finish_reason
        }],
        "usage": { "prompt_tokens": 812, "completion_tokens": 245, "total_tokens": 1057 }
    })
}

fn request() -> VisionRequest {
    VisionRequest {
        system_prompt: "system".to_string(),
        user_text: "look at this palm".to_string(),
        image_url: "data:image/jpeg;base64,AAAA".to_string(),
        max_tokens: 2000,
        json_output: true,
    }
}

#[tokio::test]
async fn sends_bearer_auth_and_multimodal_body() {
    let (base_url, seen) = spawn_stub(StatusCode::OK, completion(json!("{}"), "stop")).await;

    let response = provider(&base_url).complete(&request()).await.unwrap();
    assert_eq!(response.text.as_deref(), Some("{}"));
    assert_eq!(response.input_tokens, 812);
    assert_eq!(response.output_tokens, 245);
    assert_eq!(response.finish_reason, FinishReason::Complete);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (auth, body) = &seen[0];
    assert_eq!(auth.as_deref(), Some("Bearer sk-test-key"));
    assert_eq!(body["model"], "gpt-4o");
    assert_eq!(body["response_format"]["type"], "json_object");
    assert_eq!(
        body["messages"][1]["content"][1]["image_url"]["url"],
        "data:image/jpeg;base64,AAAA"
    );
}

#[tokio::test]
async fn rate_limit_is_reported() {
    let (base_url, _) = spawn_stub(
        StatusCode::TOO_MANY_REQUESTS,
        json!({ "error": { "message": "Rate limit reached" } }),
    )
    .await;

    let err = provider(&base_url).complete(&request()).await.unwrap_err();
    assert_eq!(err, ProviderError::RateLimited);
}

#[tokio::test]
async fn server_error_becomes_api_error() {
    let (base_url, _) = spawn_stub(
        StatusCode::UNAUTHORIZED,
        json!({ "error": { "message": "Incorrect API key provided" } }),
    )
    .await;

    match provider(&base_url).complete(&request()).await {
        Err(ProviderError::ApiError(msg)) => {
            assert!(msg.contains("401"));
            assert!(msg.contains("Incorrect API key provided"));
        }
        other => panic!("expected ApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn content_filter_is_reported() {
    let (base_url, _) =
        spawn_stub(StatusCode::OK, completion(Value::Null, "content_filter")).await;

    let err = provider(&base_url).complete(&request()).await.unwrap_err();
    assert_eq!(err, ProviderError::ContentFiltered);
}

#[tokio::test]
async fn unreachable_endpoint_is_a_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = provider(&format!("http://127.0.0.1:{}/v1", port))
        .complete(&request())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::NetworkError(_)));
}

#[tokio::test]
async fn reader_parses_reading_from_openai() {
    let (base_url, seen) = spawn_stub(
        StatusCode::OK,
        completion(json!(reading_json().to_string()), "stop"),
    )
    .await;

    let reader = PalmReader::new(Arc::new(provider(&base_url)), 2000);
    let reading = reader.analyze(TEST_IMAGE).await.unwrap();
    assert_eq!(reading.love_score, 85);
    assert_eq!(reading.career_score, 90);
    assert!(reading.life_line.starts_with("생명선"));

    let seen = seen.lock().unwrap();
    let (_, body) = &seen[0];
    assert_eq!(body["max_tokens"], 2000);
    assert!(body["messages"][1]["content"][1]["image_url"]["url"]
        .as_str()
        .unwrap()
        .starts_with("data:image/jpeg;base64,"));
}

#[tokio::test]
async fn reader_rejects_null_content() {
    let (base_url, _) = spawn_stub(StatusCode::OK, completion(Value::Null, "stop")).await;

    let reader = PalmReader::new(Arc::new(provider(&base_url)), 2000);
    let err = reader.analyze(TEST_IMAGE).await.unwrap_err();
    assert_eq!(err, ReadingError::EmptyResponse);
}
