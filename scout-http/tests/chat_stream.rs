use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::stream::{self, StreamExt};
use http_body_util::BodyExt;
use scout_core::{
    AgentEngine, EngineError, EventStream, ExecutionEvent, InMemorySessionStore, RunRequest,
    ToolCallRequest, ToolOutput, WireEvent,
};
use scout_http::{router, ServerConfig, ServerState};
use serde_json::{json, Value};
use tower::ServiceExt;

/// Replays a fixed event script for every run and records what it was asked
struct ScriptedEngine {
    script: Vec<Result<ExecutionEvent, String>>,
    requests: Mutex<Vec<RunRequest>>,
}

impl ScriptedEngine {
    fn new(script: Vec<Result<ExecutionEvent, String>>) -> Arc<Self> {
        Arc::new(Self {
            script,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn thread_ids(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.thread_id.clone())
            .collect()
    }
}

impl AgentEngine for ScriptedEngine {
    fn run(&self, request: RunRequest) -> EventStream {
        self.requests.lock().unwrap().push(request);
        let events: Vec<Result<ExecutionEvent, EngineError>> = self
            .script
            .iter()
            .cloned()
            .map(|e| e.map_err(EngineError::Other))
            .collect();
        stream::iter(events).boxed()
    }
}

fn token(text: &str) -> Result<ExecutionEvent, String> {
    Ok(ExecutionEvent::ModelTokenDelta { text: text.into() })
}

fn app(engine: Arc<ScriptedEngine>) -> axum::Router {
    app_with(engine, ServerConfig::new("127.0.0.1:0".into()))
}

fn app_with(engine: Arc<ScriptedEngine>, config: ServerConfig) -> axum::Router {
    let store = Arc::new(InMemorySessionStore::new());
    router(ServerState::new(&config, engine, store))
}

fn chat_request(body: Value) -> Request<Body> {
    Request::post("/chat")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request should build")
}

/// Split an SSE body into its `data:` payloads
fn parse_frames(body: &[u8]) -> Vec<WireEvent> {
    let text = std::str::from_utf8(body).expect("body should be utf-8");
    text.split("\n\n")
        .filter(|frame| !frame.trim().is_empty())
        .map(|frame| {
            let data = frame
                .lines()
                .find_map(|line| line.strip_prefix("data:"))
                .expect("frame should carry data");
            serde_json::from_str(data.trim()).expect("frame should be a wire event")
        })
        .collect()
}

async fn stream_chat(app: axum::Router, body: Value) -> Vec<WireEvent> {
    let response = app
        .oneshot(chat_request(body))
        .await
        .expect("response should be ok");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );
    let body = response
        .into_body()
        .collect()
        .await
        .expect("body should read")
        .to_bytes();
    parse_frames(&body)
}

#[tokio::test]
async fn new_conversation_announces_thread_first() {
    let engine = ScriptedEngine::new(vec![token("Hello"), token(" world")]);
    let events = stream_chat(app(engine.clone()), json!({"query": "hi", "thread_id": "new"})).await;

    assert_eq!(events.len(), 4);
    let WireEvent::Session { thread_id } = &events[0] else {
        panic!("expected checkpoint first, got {:?}", events[0]);
    };
    assert_eq!(engine.thread_ids(), vec![thread_id.clone()]);
    assert_eq!(events[1], WireEvent::Token { text: "Hello".into() });
    assert_eq!(events[2], WireEvent::Token { text: " world".into() });
    assert_eq!(events[3], WireEvent::End);
}

#[tokio::test]
async fn missing_thread_id_is_treated_as_new() {
    let engine = ScriptedEngine::new(vec![token("x")]);
    let events = stream_chat(app(engine), json!({"query": "hi"})).await;
    assert!(matches!(events[0], WireEvent::Session { .. }));
}

#[tokio::test]
async fn existing_thread_is_not_announced() {
    let engine = ScriptedEngine::new(vec![token("again")]);
    let events = stream_chat(
        app(engine.clone()),
        json!({"query": "more", "thread_id": "thread-7"}),
    )
    .await;

    assert_eq!(
        events,
        vec![WireEvent::Token { text: "again".into() }, WireEvent::End]
    );
    assert_eq!(engine.thread_ids(), vec!["thread-7".to_string()]);
}

#[tokio::test]
async fn engine_failure_keeps_tokens_then_errors_and_ends() {
    let engine = ScriptedEngine::new(vec![
        token("one"),
        token("two"),
        Err("model backend returned 502 with api key sk-123".into()),
    ]);
    let events = stream_chat(app(engine), json!({"query": "hi", "thread_id": "t1"})).await;

    assert_eq!(
        events,
        vec![
            WireEvent::Token { text: "one".into() },
            WireEvent::Token { text: "two".into() },
            WireEvent::Error { message: "An error occurred".into() },
            WireEvent::End,
        ]
    );
}

#[tokio::test]
async fn search_lifecycle_is_streamed() {
    let engine = ScriptedEngine::new(vec![
        Ok(ExecutionEvent::ModelRunEnd {
            tool_calls: vec![ToolCallRequest::new(
                "call_1",
                "tavily_search",
                json!({"query": "rust vs go"}),
            )],
        }),
        Ok(ExecutionEvent::ToolRunEnd {
            call_id: "call_1".into(),
            tool_name: "tavily_search".into(),
            output: ToolOutput::Text(
                r#"[{"url":"https://a"},{"url":"https://b"},{"url":"https://c"}]"#.into(),
            ),
        }),
        token("Summary"),
        Ok(ExecutionEvent::ModelRunEnd { tool_calls: vec![] }),
    ]);
    let events = stream_chat(app(engine), json!({"query": "compare", "thread_id": "t1"})).await;

    assert_eq!(
        events,
        vec![
            WireEvent::SearchStart { query: "rust vs go".into() },
            WireEvent::SearchResults {
                urls: vec!["https://a".into(), "https://b".into(), "https://c".into()],
                query: Some("rust vs go".into()),
            },
            WireEvent::Token { text: "Summary".into() },
            WireEvent::End,
        ]
    );
}

#[tokio::test]
async fn custom_search_tool_name_is_honoured() {
    let engine = ScriptedEngine::new(vec![Ok(ExecutionEvent::ModelRunEnd {
        tool_calls: vec![ToolCallRequest::new("c1", "web_search", json!({"query": "q"}))],
    })]);
    let config = ServerConfig::new("127.0.0.1:0".into()).with_search_tool("web_search");
    let events = stream_chat(app_with(engine, config), json!({"query": "hi", "thread_id": "t1"})).await;
    assert_eq!(events[0], WireEvent::SearchStart { query: "q".into() });
}

#[tokio::test]
async fn blank_query_is_rejected() {
    let engine = ScriptedEngine::new(vec![]);
    let response = app(engine.clone())
        .oneshot(chat_request(json!({"query": "   "})))
        .await
        .expect("response should be ok");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(engine.thread_ids().is_empty());
}

#[tokio::test]
async fn malformed_json_is_rejected_with_error_body() {
    let engine = ScriptedEngine::new(vec![]);
    let response = app(engine)
        .oneshot(
            Request::post("/chat")
                .header("content-type", "application/json")
                .body(Body::from("not valid json"))
                .expect("request should build"),
        )
        .await
        .expect("response should be ok");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let value: Value = serde_json::from_slice(&body).expect("error body should be JSON");
    assert_eq!(value["error"]["type"], "invalid_request");
}

#[tokio::test]
async fn thread_limit_rejects_new_threads() {
    let engine = ScriptedEngine::new(vec![]);
    let config = ServerConfig::new("127.0.0.1:0".into()).with_max_threads(Some(0));
    let response = app_with(engine, config)
        .oneshot(chat_request(json!({"query": "hi"})))
        .await
        .expect("response should be ok");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn health_reports_thread_count() {
    let engine = ScriptedEngine::new(vec![]);
    let response = app(engine)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .expect("response should be ok");

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value, json!({"status": "ok", "threads": 0}));
}
