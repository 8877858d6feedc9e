use super::mocks::MockLlmClient;
use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use foodscan_rust::{
    analysis::AnalysisService,
    config::LlmConfig,
    server::{self, handlers::AppState},
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

pub const TEST_MAX_BODY_BYTES: usize = 64 * 1024;

/// Create a test LLM configuration with sensible defaults
pub fn create_test_llm_config() -> LlmConfig {
    LlmConfig {
        provider: "openai".to_string(),
        base_url: "http://localhost:0/v1".to_string(),
        api_key: "test-api-key".to_string(),
        model: "gpt-4o".to_string(),
        max_tokens: 1000,
        system_prompt: None,
    }
}

/// Build the full router around a mock provider
pub fn create_test_app(llm: Arc<MockLlmClient>) -> Router {
    let analysis = AnalysisService::new(llm, &create_test_llm_config());
    let state = AppState {
        analysis: Arc::new(analysis),
    };
    server::router(state, TEST_MAX_BODY_BYTES)
}

pub async fn post_analyze(app: Router, body: impl Into<Body>) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri("/api/analyze")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();

    app.oneshot(request).await.unwrap()
}

pub async fn get_status(app: Router) -> Response<Body> {
    let request = Request::builder()
        .method("GET")
        .uri("/api/analyze")
        .body(Body::empty())
        .unwrap();

    app.oneshot(request).await.unwrap()
}

pub async fn read_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

/// Collect a finished SSE body into its events, skipping comments
pub async fn read_sse(response: Response<Body>) -> Vec<SseEvent> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    parse_sse(&String::from_utf8(bytes.to_vec()).unwrap())
}

pub fn parse_sse(body: &str) -> Vec<SseEvent> {
    let mut events = Vec::new();

    for block in body.split("\n\n") {
        let mut event = String::from("message");
        let mut data: Vec<&str> = Vec::new();
        let mut has_field = false;

        for line in block.lines() {
            if line.starts_with(':') {
                continue;
            }
            let (name, value) = line.split_once(':').unwrap_or((line, ""));
            let value = value.strip_prefix(' ').unwrap_or(value);
            match name {
                "event" => {
                    event = value.to_string();
                    has_field = true;
                }
                "data" => {
                    data.push(value);
                    has_field = true;
                }
                _ => {}
            }
        }

        if has_field {
            events.push(SseEvent {
                event,
                data: data.join("\n"),
            });
        }
    }

    events
}

/// Concatenate every `text` event, as a client rendering the stream would
pub fn collect_text(events: &[SseEvent]) -> String {
    events
        .iter()
        .filter(|e| e.event == "text")
        .map(|e| e.data.as_str())
        .collect()
}
