//! Axum route handlers for the capability host.
//!
//! # Routes
//!
//! - `GET  /health`       — Returns `{"status": "ok", "version": ..., "service": ...}`
//! - `GET  {card_path}`   — The agent card
//! - `POST {rpc_path}`    — JSON-RPC 2.0: `message/send`, `message/stream` (SSE)

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::host::{AgentHost, PreparedCall};
use crate::a2a::errors::{A2AError, A2AErrorCode};
use crate::a2a::transport::VERSION_HEADER;
use crate::a2a::types::{
    JsonRpcRequest, JsonRpcResponse, SendMessageResult, StreamEvent, TaskArtifactUpdateEvent,
    TaskState, TaskStatus, TaskStatusUpdateEvent, METHOD_MESSAGE_SEND, METHOD_MESSAGE_STREAM,
};

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub host: Arc<AgentHost>,
}

impl AppState {
    pub fn new(host: AgentHost) -> Self {
        Self {
            host: Arc::new(host),
        }
    }
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    let card_path = state.host.card_path.clone();
    let rpc_path = state.host.rpc_path.clone();
    Router::new()
        .route("/health", get(health_handler))
        .route(&card_path, get(agent_card_handler))
        .route(&rpc_path, post(rpc_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// GET /health — liveness check.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
        "service": state.host.name,
    }))
}

/// GET {card_path} — the agent card.
async fn agent_card_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.host.agent_card())
}

/// POST {rpc_path} — JSON-RPC dispatch.
///
/// Protocol errors are reported as JSON-RPC error responses with HTTP 200.
async fn rpc_handler(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let raw: Value = match serde_json::from_slice(&body) {
        Ok(raw) => raw,
        Err(e) => {
            return rpc_error(
                Value::Null,
                A2AError::new(A2AErrorCode::JsonParseError, format!("invalid JSON: {}", e)),
            )
        }
    };
    let id = raw.get("id").cloned().unwrap_or(Value::Null);
    let request = match serde_json::from_value::<JsonRpcRequest>(raw) {
        Ok(request) if request.jsonrpc == "2.0" => request,
        Ok(_) => {
            return rpc_error(
                id,
                A2AError::new(A2AErrorCode::InvalidRequest, "jsonrpc must be \"2.0\""),
            )
        }
        Err(e) => {
            return rpc_error(
                id,
                A2AError::new(A2AErrorCode::InvalidRequest, format!("invalid request: {}", e)),
            )
        }
    };

    if let Some(version) = headers.get(VERSION_HEADER).and_then(|v| v.to_str().ok()) {
        if !same_major(version, &state.host.protocol_version) {
            return rpc_error(
                request.id,
                A2AError::new(
                    A2AErrorCode::UnsupportedVersion,
                    format!(
                        "protocol version {} is not supported (agent speaks {})",
                        version, state.host.protocol_version
                    ),
                ),
            );
        }
    }

    log::debug!(
        "A2A request received: method='{}', id={}",
        request.method,
        request.id
    );

    match request.method.as_str() {
        METHOD_MESSAGE_SEND => match state.host.handle_send(request.params).await {
            Ok(task) => match serde_json::to_value(SendMessageResult::Task(task)) {
                Ok(result) => Json(JsonRpcResponse::success(request.id, result)).into_response(),
                Err(e) => rpc_error(
                    request.id,
                    A2AError::new(A2AErrorCode::InternalError, e.to_string()),
                ),
            },
            Err(error) => rpc_error(request.id, error),
        },
        METHOD_MESSAGE_STREAM if state.host.streaming => {
            match state.host.prepare(request.params) {
                Ok(call) => Sse::new(task_events(request.id, call))
                    .keep_alive(KeepAlive::default())
                    .into_response(),
                Err(error) => rpc_error(request.id, error),
            }
        }
        METHOD_MESSAGE_STREAM => rpc_error(
            request.id,
            A2AError::new(A2AErrorCode::UnsupportedOperation, "streaming is not enabled"),
        ),
        other => rpc_error(
            request.id,
            A2AError::new(
                A2AErrorCode::MethodNotFound,
                format!("method '{}' not found", other),
            ),
        ),
    }
}

/// SSE events for one streamed call: the submitted task, a working status,
/// each result artifact, then the final status.
fn task_events(id: Value, call: PreparedCall) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        let task_id = call.task_id.clone();
        let context_id = call.context_id.clone();

        yield Ok(rpc_event(&id, StreamEvent::Task(call.submitted())));
        yield Ok(rpc_event(&id, StreamEvent::StatusUpdate(TaskStatusUpdateEvent {
            task_id: task_id.clone(),
            context_id: context_id.clone(),
            status: TaskStatus {
                state: TaskState::Working,
                message: None,
                timestamp: Some(chrono::Utc::now().to_rfc3339()),
            },
            is_final: false,
        })));

        let task = call.run().await;
        let count = task.artifacts.len();
        for (i, artifact) in task.artifacts.into_iter().enumerate() {
            yield Ok(rpc_event(&id, StreamEvent::ArtifactUpdate(TaskArtifactUpdateEvent {
                task_id: task_id.clone(),
                context_id: context_id.clone(),
                artifact,
                append: false,
                last_chunk: i + 1 == count,
            })));
        }
        yield Ok(rpc_event(&id, StreamEvent::StatusUpdate(TaskStatusUpdateEvent {
            task_id,
            context_id,
            status: task.status,
            is_final: true,
        })));
    }
}

fn rpc_event(id: &Value, event: StreamEvent) -> Event {
    let response = match serde_json::to_value(&event) {
        Ok(result) => JsonRpcResponse::success(id.clone(), result),
        Err(e) => JsonRpcResponse::failure(
            id.clone(),
            A2AError::new(A2AErrorCode::InternalError, e.to_string()),
        ),
    };
    Event::default()
        .json_data(&response)
        .unwrap_or_else(|_| Event::default().data("{}"))
}

fn rpc_error(id: Value, error: A2AError) -> Response {
    log::debug!("A2A request rejected: id={}, error='{}'", id, error);
    Json(JsonRpcResponse::failure(id, error)).into_response()
}

fn same_major(a: &str, b: &str) -> bool {
    a.split('.').next() == b.split('.').next()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
