use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use study_aid::{FallbackPolicy, LLMProviderFactory, LLMProviderType, ModelClient};

const GOOD_CONTENT: &str = "Q1: What pigment absorbs light in plants?\nA) Chlorophyll\nB) Melanin\nCorrect Answer: A";

#[derive(Clone, Default)]
struct MockLog {
    models: Arc<Mutex<Vec<String>>>,
    auth_headers: Arc<Mutex<Vec<Option<String>>>>,
}

fn reply_for(model: &str, envelope: bool) -> Response {
    let content = match model {
        "limited" => return (StatusCode::TOO_MANY_REQUESTS, "slow down").into_response(),
        "broken" => return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response(),
        "short" => "OK",
        _ => GOOD_CONTENT,
    };
    if envelope {
        Json(json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })).into_response()
    } else {
        content.to_string().into_response()
    }
}

fn record(log: &MockLog, headers: &HeaderMap, body: &Value) -> String {
    let model = body["model"].as_str().unwrap_or_default().to_string();
    log.models.lock().unwrap().push(model.clone());
    log.auth_headers.lock().unwrap().push(
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );
    model
}

async fn chat_completions(State(log): State<MockLog>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["role"], "user");
    let model = record(&log, &headers, &body);
    reply_for(&model, true)
}

async fn raw_text(State(log): State<MockLog>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let model = record(&log, &headers, &body);
    reply_for(&model, false)
}

/// Serves both endpoint shapes on an ephemeral port
async fn spawn_mock_endpoint() -> (String, MockLog) {
    let log = MockLog::default();
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/raw", post(raw_text))
        .with_state(log.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), log)
}

fn instant_policy() -> FallbackPolicy {
    FallbackPolicy {
        inter_attempt_delay: Duration::ZERO,
        rate_limit_backoff: Duration::ZERO,
        min_response_chars: 50,
    }
}

fn client(provider_type: LLMProviderType, base_url: String, api_key: Option<&str>, models: &[&str]) -> ModelClient {
    let provider = LLMProviderFactory::create_provider(
        provider_type,
        api_key.map(str::to_string),
        Some(base_url),
        Duration::from_secs(5),
        None,
    )
    .unwrap();
    ModelClient::new(
        Arc::new(provider),
        models.iter().map(|m| m.to_string()).collect(),
        instant_policy(),
    )
}

#[tokio::test]
async fn test_envelope_endpoint_falls_back_to_last_model() {
    let (base, log) = spawn_mock_endpoint().await;
    let models = ["limited", "broken", "short", "good"];
    let client = client(LLMProviderType::OpenAI, format!("{}/v1", base), Some("sk-test"), &models);

    let reply = client.complete("system", "prompt").await.unwrap();
    assert_eq!(reply.model, "good");
    assert_eq!(reply.content, GOOD_CONTENT);
    assert_eq!(reply.attempts, 4);
    assert_eq!(*log.models.lock().unwrap(), models.to_vec());
}

#[tokio::test]
async fn test_bearer_header_only_when_key_is_set() {
    let (base, log) = spawn_mock_endpoint().await;

    let with_key = client(LLMProviderType::OpenAI, format!("{}/v1", base), Some("sk-test"), &["good"]);
    with_key.complete("system", "prompt").await.unwrap();

    let without_key = client(LLMProviderType::OpenAI, format!("{}/v1", base), None, &["good"]);
    without_key.complete("system", "prompt").await.unwrap();

    let headers = log.auth_headers.lock().unwrap().clone();
    assert_eq!(headers, vec![Some("Bearer sk-test".to_string()), None]);
}

#[tokio::test]
async fn test_raw_text_endpoint() {
    let (base, log) = spawn_mock_endpoint().await;
    let client = client(LLMProviderType::Pollinations, format!("{}/raw", base), None, &["short", "good"]);

    let reply = client.complete("system", "prompt").await.unwrap();
    assert_eq!(reply.model, "good");
    assert_eq!(reply.content, GOOD_CONTENT);
    assert_eq!(log.models.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_all_failures_exhaust_chain() {
    let (base, log) = spawn_mock_endpoint().await;
    let client = client(LLMProviderType::OpenAI, format!("{}/v1", base), None, &["limited", "broken", "short"]);

    assert!(client.complete("system", "prompt").await.is_none());
    assert_eq!(log.models.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_unreachable_endpoint_is_a_failed_attempt() {
    // Nothing listens on the discard port
    let client = client(LLMProviderType::OpenAI, "http://127.0.0.1:9".to_string(), None, &["a", "b"]);
    assert!(client.complete("system", "prompt").await.is_none());
}
