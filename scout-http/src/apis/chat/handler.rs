use axum::{
    extract::State,
    response::{IntoResponse, Json, Response, Sse},
};
use scout_core::{relay_events, RunRequest};
use scout_llm::message;
use tracing::info;
use uuid::Uuid;

use super::types::{ChatRequest, HealthResponse};
use crate::session::RunSession;
use crate::{wire_to_sse_stream, ApiJson, ErrorResponse, ServerState};

/// Handle a chat query - streams the run as server-sent events
pub async fn handle_chat_stream(
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<ChatRequest>,
) -> Result<Response, ErrorResponse> {
    let request_id = Uuid::new_v4().to_string();
    info!("[{}] POST /chat thread_id={}", request_id, payload.thread_id);

    if payload.query.trim().is_empty() {
        return Err(ErrorResponse::invalid_request(
            "query must not be empty".to_string(),
        ));
    }

    let RunSession { thread, lifecycle } = state
        .session_manager
        .begin_run(&request_id, &payload.thread_id)
        .await?;

    let events = state.engine.run(RunRequest::new(
        thread.thread_id.clone(),
        message::user(payload.query),
    ));
    let wire = relay_events(&state.relay, thread.announcement(), events);

    Ok(Sse::new(wire_to_sse_stream(wire, lifecycle)).into_response())
}

/// Liveness plus the number of known threads
pub async fn handle_health(
    State(state): State<ServerState>,
) -> Result<Json<HealthResponse>, ErrorResponse> {
    let threads = state.session_manager.thread_count().await?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        threads,
    }))
}
