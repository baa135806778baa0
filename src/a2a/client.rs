//! Transport client: carries capability invocations to remote agents.
//!
//! Wraps an [`A2ATransport`] with the per-call policy of the endpoint:
//! one deadline for the whole call, bounded exponential backoff between
//! attempts, retries only for retryable transport faults, and prompt
//! cancellation. Responses are mapped onto [`InvocationResult`].

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Map, Value};

use crate::a2a::config::RemoteAgentEndpoint;
use crate::a2a::errors::TransportError;
use crate::a2a::transport::{A2ATransport, HttpTransport};
use crate::a2a::types::{
    payload_of, AgentCard, JsonRpcRequest, JsonRpcResponse, Message, Part, Role,
    SendMessageResult, StreamEvent, Task, TaskState, TaskStatus, METHOD_MESSAGE_SEND,
    METHOD_MESSAGE_STREAM, SKILL_ID_METADATA_KEY,
};
use crate::tools::context::{CancelSignal, InvocationContext};
use crate::tools::invocation::{
    FailureKind, InvocationFailure, InvocationRequest, InvocationResult,
};
use crate::tools::streaming::{InvocationEvent, InvocationStream};

/// Client for invoking capabilities on remote A2A agents.
///
/// Cheap to clone; clones share the transport and its connection pool.
#[derive(Clone)]
pub struct TransportClient {
    transport: Arc<dyn A2ATransport>,
}

impl std::fmt::Debug for TransportClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportClient").finish_non_exhaustive()
    }
}

impl TransportClient {
    pub fn new(transport: Arc<dyn A2ATransport>) -> Self {
        Self { transport }
    }

    /// Client over a fresh pooled HTTP transport.
    pub fn http() -> Result<Self, TransportError> {
        Ok(Self::new(Arc::new(HttpTransport::new()?)))
    }

    // -----------------------------------------------------------------------
    // Discovery
    // -----------------------------------------------------------------------

    /// Fetch the agent card, with the endpoint's retry policy.
    pub async fn discover(
        &self,
        endpoint: &RemoteAgentEndpoint,
        cancel: &CancelSignal,
    ) -> Result<AgentCard, TransportError> {
        let deadline = Instant::now() + endpoint.timeout_policy.timeout();
        let transport = &self.transport;
        with_retries("discovery", endpoint, deadline, cancel, |_| async move {
            transport.fetch_agent_card(endpoint).await
        })
        .await
    }

    // -----------------------------------------------------------------------
    // Unary invocation
    // -----------------------------------------------------------------------

    /// Invoke a capability and wait for its result.
    pub async fn invoke(
        &self,
        endpoint: &RemoteAgentEndpoint,
        request: &InvocationRequest,
        ctx: &InvocationContext,
    ) -> InvocationResult {
        let started_at = Instant::now();
        let deadline = started_at + endpoint.timeout_policy.timeout();
        log::info!(
            "A2A invocation started: capability='{}', endpoint='{}', correlation_id='{}'",
            request.capability_name,
            endpoint.display_name(),
            request.correlation_id
        );

        let rpc = build_rpc_request(METHOD_MESSAGE_SEND, request);
        let transport = &self.transport;
        let rpc_ref = &rpc;
        let outcome = with_retries("invocation", endpoint, deadline, &ctx.cancel, |_| async move {
            let resp = transport.send(endpoint, rpc_ref).await?;
            check_response_id(&endpoint.rpc_url(), rpc_ref, &resp)?;
            Ok::<_, TransportError>(resp)
        })
        .await;

        let result = match outcome {
            Ok(resp) => map_unary_response(resp),
            Err(err) => failure_from_transport(err),
        };

        let duration_ms = started_at.elapsed().as_millis();
        match &result {
            InvocationResult::Success(_) => log::info!(
                "A2A invocation completed: capability='{}', correlation_id='{}' ({}ms)",
                request.capability_name,
                request.correlation_id,
                duration_ms
            ),
            InvocationResult::Failure(failure) => log::warn!(
                "A2A invocation failed: capability='{}', correlation_id='{}', kind='{}', error='{}' ({}ms)",
                request.capability_name,
                request.correlation_id,
                failure.kind,
                failure.message,
                duration_ms
            ),
        }
        result
    }

    // -----------------------------------------------------------------------
    // Streaming invocation
    // -----------------------------------------------------------------------

    /// Invoke a capability over `message/stream`.
    ///
    /// Nothing is sent until the stream is polled. Faults before the first
    /// partial result are retried like a unary call; after that they end
    /// the stream with a transport failure.
    pub fn invoke_streaming(
        &self,
        endpoint: Arc<RemoteAgentEndpoint>,
        request: InvocationRequest,
        ctx: InvocationContext,
    ) -> InvocationStream {
        let transport = self.transport.clone();

        Box::pin(async_stream::stream! {
            let started_at = Instant::now();
            let deadline = started_at + endpoint.timeout_policy.timeout();
            let policy = &endpoint.timeout_policy;
            let rpc = build_rpc_request(METHOD_MESSAGE_STREAM, &request);
            let url = endpoint.rpc_url();
            let mut delivered = 0usize;
            let mut attempt = 0u32;

            log::info!(
                "A2A stream started: capability='{}', endpoint='{}', correlation_id='{}'",
                request.capability_name,
                endpoint.display_name(),
                request.correlation_id
            );

            let terminal = 'attempts: loop {
                attempt += 1;
                let remaining = deadline.saturating_duration_since(Instant::now());
                let opened = tokio::select! {
                    biased;
                    _ = ctx.cancel.cancelled() => {
                        break 'attempts failure_from_transport(TransportError::Cancelled);
                    }
                    opened = tokio::time::timeout(remaining, transport.send_streaming(&endpoint, &rpc)) => opened,
                };

                let fault = match opened {
                    Err(_) => TransportError::Timeout {
                        url: url.clone(),
                        elapsed: started_at.elapsed(),
                    },
                    Ok(Err(err)) => err,
                    Ok(Ok(mut events)) => {
                        let mut tracker = StreamTracker::default();
                        loop {
                            let remaining = deadline.saturating_duration_since(Instant::now());
                            let next = tokio::select! {
                                biased;
                                _ = ctx.cancel.cancelled() => {
                                    break 'attempts failure_from_transport(TransportError::Cancelled);
                                }
                                next = tokio::time::timeout(remaining, futures::StreamExt::next(&mut events)) => next,
                            };
                            let resp = match next {
                                Err(_) => break TransportError::Timeout {
                                    url: url.clone(),
                                    elapsed: started_at.elapsed(),
                                },
                                Ok(None) => break TransportError::malformed(
                                    &url,
                                    "event stream closed before a final event",
                                ),
                                Ok(Some(Err(err))) => break err,
                                Ok(Some(Ok(resp))) => resp,
                            };
                            if let Err(err) = check_response_id(&url, &rpc, &resp) {
                                break err;
                            }
                            match tracker.apply(resp) {
                                StreamStep::Partial(value) => {
                                    delivered += 1;
                                    yield InvocationEvent::Partial(value);
                                }
                                StreamStep::Continue => {}
                                StreamStep::Done(result) => break 'attempts result,
                            }
                        }
                    }
                };

                let retry_delay = policy.backoff.delay(attempt - 1);
                let can_retry = delivered == 0
                    && fault.is_retryable()
                    && attempt < policy.max_attempts()
                    && retry_delay < deadline.saturating_duration_since(Instant::now());
                if !can_retry {
                    break 'attempts failure_from_transport(fault);
                }
                log::info!(
                    "A2A stream failed before any result, retrying: endpoint='{}', attempt={}/{}, error='{}'",
                    endpoint.display_name(),
                    attempt,
                    policy.max_attempts(),
                    fault
                );
                tokio::select! {
                    biased;
                    _ = ctx.cancel.cancelled() => {
                        break 'attempts failure_from_transport(TransportError::Cancelled);
                    }
                    _ = tokio::time::sleep(retry_delay) => {}
                }
            };

            log::info!(
                "A2A stream finished: capability='{}', correlation_id='{}', partials={}, success={} ({}ms)",
                request.capability_name,
                request.correlation_id,
                delivered,
                terminal.is_success(),
                started_at.elapsed().as_millis()
            );
            yield InvocationEvent::Final(terminal);
        })
    }
}

// ---------------------------------------------------------------------------
// Retry loop
// ---------------------------------------------------------------------------

/// Run `op` until it succeeds, fails for good, the deadline passes or the
/// call is cancelled. `op` receives the 1-based attempt number.
async fn with_retries<T, F, Fut>(
    label: &str,
    endpoint: &RemoteAgentEndpoint,
    deadline: Instant,
    cancel: &CancelSignal,
    mut op: F,
) -> Result<T, TransportError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let policy = &endpoint.timeout_policy;
    let max_attempts = policy.max_attempts();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let remaining = deadline.saturating_duration_since(Instant::now());
        let outcome = if remaining.is_zero() {
            Err(TransportError::Timeout {
                url: endpoint.base_address.clone(),
                elapsed: policy.timeout(),
            })
        } else {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TransportError::Cancelled),
                timed = tokio::time::timeout(remaining, op(attempt)) => {
                    timed.unwrap_or_else(|_| Err(TransportError::Timeout {
                        url: endpoint.base_address.clone(),
                        elapsed: policy.timeout(),
                    }))
                }
            }
        };

        let err = match outcome {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_retryable() {
            return Err(err);
        }
        if attempt >= max_attempts {
            log::warn!(
                "A2A {} gave up: endpoint='{}', attempts={}, error='{}'",
                label,
                endpoint.display_name(),
                attempt,
                err
            );
            return Err(err);
        }

        let delay = policy.backoff.delay(attempt - 1);
        if delay >= deadline.saturating_duration_since(Instant::now()) {
            log::warn!(
                "A2A {} deadline exhausted: endpoint='{}', attempts={}, error='{}'",
                label,
                endpoint.display_name(),
                attempt,
                err
            );
            return Err(err);
        }

        log::info!(
            "A2A {} failed, retrying: endpoint='{}', attempt={}/{}, delay_ms={}, error='{}'",
            label,
            endpoint.display_name(),
            attempt,
            max_attempts,
            delay.as_millis(),
            err
        );
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransportError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Request building
// ---------------------------------------------------------------------------

/// Wrap an invocation in a JSON-RPC request whose id is the correlation id.
pub(crate) fn build_rpc_request(method: &str, request: &InvocationRequest) -> JsonRpcRequest {
    let mut metadata = Map::new();
    metadata.insert(
        SKILL_ID_METADATA_KEY.to_string(),
        Value::String(request.capability_name.clone()),
    );
    let message = Message {
        role: Role::User,
        parts: vec![Part::Data {
            data: Value::Object(request.arguments.clone()),
        }],
        message_id: request.correlation_id.clone(),
        context_id: request.context_id.clone(),
        task_id: None,
        metadata: Some(metadata),
    };
    JsonRpcRequest::new(
        request.correlation_id.clone(),
        method,
        json!({ "message": message }),
    )
}

fn check_response_id(
    url: &str,
    request: &JsonRpcRequest,
    response: &JsonRpcResponse,
) -> Result<(), TransportError> {
    if response.id == request.id {
        Ok(())
    } else {
        Err(TransportError::malformed(
            url,
            format!(
                "response id {} does not match request id {}",
                response.id, request.id
            ),
        ))
    }
}

// ---------------------------------------------------------------------------
// Response mapping
// ---------------------------------------------------------------------------

/// Map a transport fault that survived the retry policy.
pub(crate) fn failure_from_transport(err: TransportError) -> InvocationResult {
    let failure = match err {
        TransportError::Cancelled => {
            InvocationFailure::new(FailureKind::Cancelled, "invocation cancelled")
        }
        TransportError::Http { status, ref body, .. } if !err.is_retryable() => {
            InvocationFailure::new(
                FailureKind::Remote,
                format!("remote agent rejected the request with HTTP {}: {}", status, body),
            )
        }
        TransportError::Auth(_) => {
            InvocationFailure::new(FailureKind::Transport, err.to_string()).with_retryable(false)
        }
        other => InvocationFailure::new(FailureKind::Transport, other.to_string()),
    };
    InvocationResult::Failure(failure)
}

fn map_unary_response(resp: JsonRpcResponse) -> InvocationResult {
    if let Some(error) = resp.error {
        return InvocationResult::failure(
            FailureKind::Remote,
            format!("remote agent error {}", error),
        );
    }
    let Some(result) = resp.result else {
        return InvocationResult::failure(FailureKind::ProtocolMismatch, "response carried no result");
    };
    match serde_json::from_value::<SendMessageResult>(result) {
        Ok(SendMessageResult::Task(task)) => map_task(&task, None),
        Ok(SendMessageResult::Message(message)) => map_message(&message),
        Err(e) => InvocationResult::failure(
            FailureKind::ProtocolMismatch,
            format!("unrecognized result: {}", e),
        ),
    }
}

fn map_message(message: &Message) -> InvocationResult {
    match payload_of(&message.parts) {
        Some(payload) => InvocationResult::success(payload),
        None => InvocationResult::failure(
            FailureKind::ProtocolMismatch,
            "reply message carried no payload",
        ),
    }
}

/// Map a task in a terminal state. `streamed` is the last artifact payload
/// seen on a stream, used when the final task carries no artifacts.
fn map_task(task: &Task, streamed: Option<&Value>) -> InvocationResult {
    map_status(&task.id, &task.status, task.payload().or_else(|| streamed.cloned()))
}

fn map_status(task_id: &str, status: &TaskStatus, payload: Option<Value>) -> InvocationResult {
    match status.state {
        TaskState::Completed => {
            let payload = payload.or_else(|| {
                status
                    .message
                    .as_ref()
                    .and_then(|m| payload_of(&m.parts))
            });
            match payload {
                Some(payload) => InvocationResult::success(payload),
                None => InvocationResult::failure(
                    FailureKind::ProtocolMismatch,
                    format!("task {} completed without a result payload", task_id),
                ),
            }
        }
        TaskState::Failed
        | TaskState::Rejected
        | TaskState::Canceled
        | TaskState::InputRequired
        | TaskState::AuthRequired => {
            let state = serde_json::to_value(status.state)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            let detail = status
                .message
                .as_ref()
                .and_then(Message::text)
                .unwrap_or_else(|| "no detail given".to_string());
            InvocationResult::failure(
                FailureKind::Remote,
                format!("task {} ended in state '{}': {}", task_id, state, detail),
            )
        }
        TaskState::Submitted | TaskState::Working | TaskState::Unknown => {
            InvocationResult::failure(
                FailureKind::ProtocolMismatch,
                format!("task {} returned in non-terminal state {:?}", task_id, status.state),
            )
        }
    }
}

// ---------------------------------------------------------------------------
// Stream tracking
// ---------------------------------------------------------------------------

enum StreamStep {
    Partial(Value),
    Continue,
    Done(InvocationResult),
}

/// Folds streamed JSON-RPC responses into partials and a terminal result.
#[derive(Default)]
struct StreamTracker {
    last_payload: Option<Value>,
}

impl StreamTracker {
    fn apply(&mut self, resp: JsonRpcResponse) -> StreamStep {
        if let Some(error) = resp.error {
            return StreamStep::Done(InvocationResult::failure(
                FailureKind::Remote,
                format!("remote agent error {}", error),
            ));
        }
        let Some(result) = resp.result else {
            return StreamStep::Done(InvocationResult::failure(
                FailureKind::ProtocolMismatch,
                "stream event carried no result",
            ));
        };
        let event = match serde_json::from_value::<StreamEvent>(result) {
            Ok(event) => event,
            Err(e) => {
                return StreamStep::Done(InvocationResult::failure(
                    FailureKind::ProtocolMismatch,
                    format!("unrecognized stream event: {}", e),
                ))
            }
        };

        match event {
            StreamEvent::ArtifactUpdate(update) => match payload_of(&update.artifact.parts) {
                Some(payload) => {
                    self.last_payload = Some(payload.clone());
                    StreamStep::Partial(payload)
                }
                None => StreamStep::Continue,
            },
            StreamEvent::StatusUpdate(update) => {
                if update.is_final || update.status.state.is_terminal() {
                    StreamStep::Done(map_status(
                        &update.task_id,
                        &update.status,
                        self.last_payload.take(),
                    ))
                } else {
                    StreamStep::Continue
                }
            }
            StreamEvent::Task(task) => {
                if task.status.state.is_terminal() {
                    StreamStep::Done(map_task(&task, self.last_payload.as_ref()))
                } else {
                    if let Some(payload) = task.payload() {
                        self.last_payload = Some(payload);
                    }
                    StreamStep::Continue
                }
            }
            StreamEvent::Message(message) => StreamStep::Done(map_message(&message)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::a2a::config::BackoffPolicy;
    use crate::a2a::errors::{A2AError, A2AErrorCode};
    use crate::a2a::transport::RpcEventStream;
    use crate::tools::streaming::drain;
    use async_trait::async_trait;
    use futures::stream;
    use futures::StreamExt;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// What a [`StubTransport`] does on each call.
    #[derive(Clone)]
    pub(crate) enum StubBehavior {
        /// Answer with this result payload inside a completed task.
        Complete(Value),
        /// Answer with a JSON-RPC error.
        RemoteError,
        /// Fail every attempt at the transport level.
        Unreachable,
        /// Fail the first `n` attempts, then complete.
        FlakyThen(usize, Value),
        /// Never answer.
        Hang,
        /// Answer with a mismatched id.
        WrongId,
        /// Stream these results (each a `StreamEvent` JSON), then end.
        Stream(Vec<Value>),
    }

    /// Transport double that counts attempts.
    pub(crate) struct StubTransport {
        pub behavior: StubBehavior,
        pub calls: AtomicUsize,
        pub card: Mutex<Option<AgentCard>>,
    }

    impl StubTransport {
        pub fn new(behavior: StubBehavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: AtomicUsize::new(0),
                card: Mutex::new(None),
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn completed_task(payload: Value) -> Value {
        json!({
            "kind": "task",
            "id": "task-1",
            "status": {"state": "completed"},
            "artifacts": [{"artifactId": "a1", "parts": [{"kind": "data", "data": payload}]}]
        })
    }

    fn unreachable() -> TransportError {
        TransportError::Connect {
            url: "http://stub".into(),
            reason: "connection refused".into(),
        }
    }

    #[async_trait]
    impl A2ATransport for StubTransport {
        async fn fetch_agent_card(
            &self,
            _endpoint: &RemoteAgentEndpoint,
        ) -> Result<AgentCard, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.card.lock().clone().ok_or_else(unreachable)
        }

        async fn send(
            &self,
            _endpoint: &RemoteAgentEndpoint,
            request: &JsonRpcRequest,
        ) -> Result<JsonRpcResponse, TransportError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                StubBehavior::Complete(payload) => Ok(JsonRpcResponse::success(
                    request.id.clone(),
                    completed_task(payload.clone()),
                )),
                StubBehavior::RemoteError => Ok(JsonRpcResponse::failure(
                    request.id.clone(),
                    A2AError::new(A2AErrorCode::InvalidParams, "unsupported currency"),
                )),
                StubBehavior::Unreachable => Err(unreachable()),
                StubBehavior::FlakyThen(n, payload) => {
                    if call < *n {
                        Err(unreachable())
                    } else {
                        Ok(JsonRpcResponse::success(
                            request.id.clone(),
                            completed_task(payload.clone()),
                        ))
                    }
                }
                StubBehavior::Hang => {
                    futures::future::pending::<()>().await;
                    Err(unreachable())
                }
                StubBehavior::WrongId => Ok(JsonRpcResponse::success(
                    json!("someone-else"),
                    completed_task(json!({})),
                )),
                StubBehavior::Stream(_) => Err(unreachable()),
            }
        }

        async fn send_streaming(
            &self,
            endpoint: &RemoteAgentEndpoint,
            request: &JsonRpcRequest,
        ) -> Result<RpcEventStream, TransportError> {
            match &self.behavior {
                StubBehavior::Stream(events) => {
                    self.calls.fetch_add(1, Ordering::SeqCst);
                    let id = request.id.clone();
                    let items: Vec<Result<JsonRpcResponse, TransportError>> = events
                        .iter()
                        .map(|e| Ok(JsonRpcResponse::success(id.clone(), e.clone())))
                        .collect();
                    Ok(stream::iter(items).boxed())
                }
                _ => {
                    let single = self.send(endpoint, request).await?;
                    Ok(stream::once(async move { Ok(single) }).boxed())
                }
            }
        }
    }

    pub(crate) fn fast_endpoint(retry_count: u32) -> RemoteAgentEndpoint {
        RemoteAgentEndpoint::new("http://stub")
            .with_retry_count(retry_count)
            .with_backoff(BackoffPolicy::none())
            .with_timeout(Duration::from_secs(5))
    }

    fn request() -> InvocationRequest {
        let mut args = Map::new();
        args.insert("amount".into(), json!(100));
        InvocationRequest::new("convertCurrency", args)
    }

    #[test]
    fn test_rpc_request_shape() {
        let req = request().with_context_id(Some("conv-1".into()));
        let rpc = build_rpc_request(METHOD_MESSAGE_SEND, &req);
        assert_eq!(rpc.id, json!(req.correlation_id));
        assert_eq!(rpc.method, "message/send");
        let message = &rpc.params["message"];
        assert_eq!(message["role"], "user");
        assert_eq!(message["messageId"], json!(req.correlation_id));
        assert_eq!(message["contextId"], "conv-1");
        assert_eq!(message["metadata"]["skillId"], "convertCurrency");
        assert_eq!(message["parts"][0], json!({"kind": "data", "data": {"amount": 100}}));
    }

    #[tokio::test]
    async fn test_success_maps_task_payload() {
        let stub = StubTransport::new(StubBehavior::Complete(json!({"amount": 91.5})));
        let client = TransportClient::new(stub.clone());
        let result = client
            .invoke(&fast_endpoint(3), &request(), &InvocationContext::new())
            .await;
        assert_eq!(result, InvocationResult::success(json!({"amount": 91.5})));
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_retried_exactly_retry_count_times() {
        for retry_count in [0, 1, 3] {
            let stub = StubTransport::new(StubBehavior::Unreachable);
            let client = TransportClient::new(stub.clone());
            let result = client
                .invoke(&fast_endpoint(retry_count), &request(), &InvocationContext::new())
                .await;
            match result {
                InvocationResult::Failure(f) => {
                    assert_eq!(f.kind, FailureKind::Transport);
                    assert!(f.retryable);
                }
                other => panic!("unexpected result: {:?}", other),
            }
            assert_eq!(stub.calls(), retry_count as usize + 1);
        }
    }

    #[tokio::test]
    async fn test_remote_error_is_not_retried() {
        let stub = StubTransport::new(StubBehavior::RemoteError);
        let client = TransportClient::new(stub.clone());
        let result = client
            .invoke(&fast_endpoint(3), &request(), &InvocationContext::new())
            .await;
        match result {
            InvocationResult::Failure(f) => {
                assert_eq!(f.kind, FailureKind::Remote);
                assert!(!f.retryable);
                assert!(f.message.contains("unsupported currency"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn test_flaky_transport_recovers() {
        let stub = StubTransport::new(StubBehavior::FlakyThen(2, json!({"ok": 1})));
        let client = TransportClient::new(stub.clone());
        let result = client
            .invoke(&fast_endpoint(3), &request(), &InvocationContext::new())
            .await;
        assert!(result.is_success());
        assert_eq!(stub.calls(), 3);
    }

    #[tokio::test]
    async fn test_mismatched_id_is_transport_failure() {
        let stub = StubTransport::new(StubBehavior::WrongId);
        let client = TransportClient::new(stub.clone());
        let result = client
            .invoke(&fast_endpoint(1), &request(), &InvocationContext::new())
            .await;
        assert_eq!(result.failure_kind(), Some(FailureKind::Transport));
        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn test_cancellation_is_prompt() {
        let stub = StubTransport::new(StubBehavior::Hang);
        let client = TransportClient::new(stub.clone());
        let cancel = CancelSignal::new();
        let ctx = InvocationContext::new().with_cancel(cancel.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });
        let started = Instant::now();
        let result = client.invoke(&fast_endpoint(3), &request(), &ctx).await;
        canceller.await.unwrap();

        assert_eq!(result.failure_kind(), Some(FailureKind::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn test_deadline_bounds_whole_call() {
        let stub = StubTransport::new(StubBehavior::Hang);
        let client = TransportClient::new(stub.clone());
        let endpoint = fast_endpoint(5).with_timeout(Duration::from_millis(50));
        let started = Instant::now();
        let result = client.invoke(&endpoint, &request(), &InvocationContext::new()).await;
        assert_eq!(result.failure_kind(), Some(FailureKind::Transport));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(stub.calls(), 1);
    }

    #[test]
    fn test_task_state_mapping() {
        let task = |state: &str| -> Task {
            serde_json::from_value(json!({
                "id": "t",
                "status": {"state": state, "message": {
                    "role": "agent", "messageId": "m", "parts": [{"kind": "text", "text": "why"}]
                }},
            }))
            .unwrap()
        };
        for state in ["failed", "rejected", "canceled", "input-required", "auth-required"] {
            let result = map_task(&task(state), None);
            assert_eq!(result.failure_kind(), Some(FailureKind::Remote), "{}", state);
        }
        assert_eq!(
            map_task(&task("working"), None).failure_kind(),
            Some(FailureKind::ProtocolMismatch)
        );
        // Completed with only a text status message.
        assert_eq!(map_task(&task("completed"), None), InvocationResult::success(json!("why")));
    }

    #[test]
    fn test_non_retryable_http_maps_to_remote() {
        let result = failure_from_transport(TransportError::Http {
            url: "http://stub".into(),
            status: 404,
            body: "not found".into(),
        });
        assert_eq!(result.failure_kind(), Some(FailureKind::Remote));
    }

    #[tokio::test]
    async fn test_streaming_partials_then_final() {
        let stub = StubTransport::new(StubBehavior::Stream(vec![
            json!({"kind": "task", "id": "t", "status": {"state": "submitted"}}),
            json!({"kind": "artifact-update", "taskId": "t",
                   "artifact": {"artifactId": "a", "parts": [{"kind": "data", "data": {"step": 1}}]}}),
            json!({"kind": "artifact-update", "taskId": "t",
                   "artifact": {"artifactId": "a", "parts": [{"kind": "data", "data": {"step": 2}}]}}),
            json!({"kind": "status-update", "taskId": "t", "status": {"state": "completed"}, "final": true}),
        ]));
        let client = TransportClient::new(stub.clone());
        let events: Vec<InvocationEvent> = client
            .invoke_streaming(Arc::new(fast_endpoint(0)), request(), InvocationContext::new())
            .collect()
            .await;

        assert_eq!(
            events,
            vec![
                InvocationEvent::Partial(json!({"step": 1})),
                InvocationEvent::Partial(json!({"step": 2})),
                InvocationEvent::Final(InvocationResult::success(json!({"step": 2}))),
            ]
        );
    }

    #[tokio::test]
    async fn test_streaming_fault_after_partial_is_not_retried() {
        let stub = StubTransport::new(StubBehavior::Stream(vec![json!({
            "kind": "artifact-update", "taskId": "t",
            "artifact": {"artifactId": "a", "parts": [{"kind": "data", "data": 1}]}
        })]));
        let client = TransportClient::new(stub.clone());
        let stream =
            client.invoke_streaming(Arc::new(fast_endpoint(3)), request(), InvocationContext::new());
        let result = drain(stream).await;
        assert_eq!(result.failure_kind(), Some(FailureKind::Transport));
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn test_streaming_fault_before_partial_is_retried() {
        let stub = StubTransport::new(StubBehavior::Stream(vec![]));
        let client = TransportClient::new(stub.clone());
        let stream =
            client.invoke_streaming(Arc::new(fast_endpoint(2)), request(), InvocationContext::new());
        let result = drain(stream).await;
        assert_eq!(result.failure_kind(), Some(FailureKind::Transport));
        assert_eq!(stub.calls(), 3);
    }

    #[tokio::test]
    async fn test_streaming_against_unary_agent() {
        let stub = StubTransport::new(StubBehavior::Complete(json!({"amount": 1})));
        let client = TransportClient::new(stub.clone());
        let stream =
            client.invoke_streaming(Arc::new(fast_endpoint(0)), request(), InvocationContext::new());
        assert_eq!(drain(stream).await, InvocationResult::success(json!({"amount": 1})));
    }

    #[tokio::test]
    async fn test_discover_retries_then_fails() {
        let stub = StubTransport::new(StubBehavior::Unreachable);
        let client = TransportClient::new(stub.clone());
        let err = client
            .discover(&fast_endpoint(2), &CancelSignal::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
        assert_eq!(stub.calls(), 3);
    }
}
