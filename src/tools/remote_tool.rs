//! Remote capability adapter.
//!
//! Wraps one [`CapabilityDescriptor`] of a remote agent as a [`BaseTool`].
//! Arguments are validated before any network I/O and successful payloads
//! are checked against the advertised result schema.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{Map, Value};

use super::base_tool::{BaseTool, ToolOrigin};
use super::context::InvocationContext;
use super::invocation::{FailureKind, InvocationRequest, InvocationResult};
use super::streaming::{self, InvocationEvent, InvocationStream};
use crate::a2a::client::TransportClient;
use crate::a2a::config::RemoteAgentEndpoint;
use crate::capabilities::descriptor::CapabilityDescriptor;
use crate::capabilities::schema::describe_violations;

/// A remote agent capability exposed as a local tool.
#[derive(Debug, Clone)]
pub struct RemoteCapabilityTool {
    descriptor: Arc<CapabilityDescriptor>,
    endpoint: Arc<RemoteAgentEndpoint>,
    client: TransportClient,
    description: String,
}

impl RemoteCapabilityTool {
    pub fn new(
        descriptor: Arc<CapabilityDescriptor>,
        endpoint: Arc<RemoteAgentEndpoint>,
        client: TransportClient,
    ) -> Self {
        let description = descriptor.description.clone().unwrap_or_else(|| {
            format!(
                "Capability '{}' of remote agent '{}'",
                descriptor.name,
                endpoint.display_name()
            )
        });
        Self {
            descriptor,
            endpoint,
            client,
            description,
        }
    }

    /// Erase into the registry's tool type.
    pub fn as_tool(self) -> Arc<dyn BaseTool> {
        Arc::new(self)
    }

    pub fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    pub fn endpoint(&self) -> &RemoteAgentEndpoint {
        &self.endpoint
    }

    fn prepare_arguments(
        &self,
        args: Map<String, Value>,
    ) -> Result<Map<String, Value>, InvocationResult> {
        self.descriptor
            .argument_schema
            .validate_arguments(args)
            .map_err(|violations| {
                let message = describe_violations(&violations);
                log::debug!(
                    "Rejected arguments before sending: capability='{}', violations='{}'",
                    self.descriptor.name,
                    message
                );
                InvocationResult::failure(FailureKind::InvalidArgument, message)
            })
    }

    fn request(&self, args: Map<String, Value>, ctx: &InvocationContext) -> InvocationRequest {
        InvocationRequest::new(self.descriptor.name.clone(), args)
            .with_context_id(ctx.context_id.clone())
    }
}

/// Check a terminal result against the descriptor's result schema.
fn check_result(descriptor: &CapabilityDescriptor, result: InvocationResult) -> InvocationResult {
    let InvocationResult::Success(value) = result else {
        return result;
    };
    match descriptor.result_schema.validate(&value) {
        Ok(()) => InvocationResult::Success(value),
        Err(violations) => {
            let message = describe_violations(&violations);
            log::error!(
                "A2A contract violation: capability='{}', violations='{}', payload={}",
                descriptor.name,
                message,
                value
            );
            InvocationResult::failure(
                FailureKind::ProtocolMismatch,
                format!("result does not match the advertised schema: {}", message),
            )
        }
    }
}

#[async_trait]
impl BaseTool for RemoteCapabilityTool {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn args_schema(&self) -> Value {
        self.descriptor.raw_argument_schema.clone()
    }

    fn origin(&self) -> ToolOrigin {
        ToolOrigin::Remote {
            endpoint: self.endpoint.display_name().to_string(),
        }
    }

    fn supports_streaming(&self) -> bool {
        self.descriptor.streaming
    }

    async fn invoke(&self, args: Map<String, Value>, ctx: &InvocationContext) -> InvocationResult {
        let args = match self.prepare_arguments(args) {
            Ok(args) => args,
            Err(failure) => return failure,
        };
        if ctx.cancel.is_cancelled() {
            return InvocationResult::failure(FailureKind::Cancelled, "invocation cancelled");
        }
        let request = self.request(args, ctx);
        let result = self.client.invoke(&self.endpoint, &request, ctx).await;
        check_result(&self.descriptor, result)
    }

    fn invoke_streaming(
        self: Arc<Self>,
        args: Map<String, Value>,
        ctx: InvocationContext,
    ) -> InvocationStream {
        let args = match self.prepare_arguments(args) {
            Ok(args) => args,
            Err(failure) => return streaming::single(failure),
        };
        if !self.descriptor.streaming {
            return Box::pin(async_stream::stream! {
                let result = self.invoke(args, &ctx).await;
                yield InvocationEvent::Final(result);
            });
        }

        let request = self.request(args, &ctx);
        let descriptor = self.descriptor.clone();
        self.client
            .invoke_streaming(self.endpoint.clone(), request, ctx)
            .map(move |event| match event {
                InvocationEvent::Final(result) => {
                    InvocationEvent::Final(check_result(&descriptor, result))
                }
                partial => partial,
            })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2a::client::tests::{fast_endpoint, StubBehavior, StubTransport};
    use crate::tools::context::CancelSignal;
    use crate::tools::streaming::drain;
    use serde_json::json;

    fn convert_descriptor() -> CapabilityDescriptor {
        CapabilityDescriptor::new(
            "convertCurrency",
            json!({
                "type": "object",
                "properties": {
                    "amount": {"type": "number"},
                    "from": {"type": "string"},
                    "to": {"type": "string"},
                    "note": {"type": "string"}
                },
                "required": ["amount", "from", "to"]
            }),
            json!({
                "type": "object",
                "properties": {
                    "amount": {"type": "number"},
                    "currency": {"type": "string"}
                },
                "required": ["amount", "currency"]
            }),
        )
        .unwrap()
    }

    fn tool_with(behavior: StubBehavior) -> (Arc<StubTransport>, RemoteCapabilityTool) {
        let stub = StubTransport::new(behavior);
        let tool = RemoteCapabilityTool::new(
            Arc::new(convert_descriptor()),
            Arc::new(fast_endpoint(3).with_name("currency")),
            TransportClient::new(stub.clone()),
        );
        (stub, tool)
    }

    fn args(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_conforming_result() {
        let (stub, tool) =
            tool_with(StubBehavior::Complete(json!({"amount": 91.5, "currency": "EUR"})));
        let result = tool
            .invoke(
                args(json!({"amount": 100, "from": "USD", "to": "EUR"})),
                &InvocationContext::new(),
            )
            .await;
        assert_eq!(
            result,
            InvocationResult::success(json!({"amount": 91.5, "currency": "EUR"}))
        );
        assert_eq!(stub.calls(), 1);
        assert_eq!(
            tool.origin(),
            ToolOrigin::Remote {
                endpoint: "currency".into()
            }
        );
    }

    #[tokio::test]
    async fn test_invalid_arguments_never_reach_the_network() {
        let (stub, tool) = tool_with(StubBehavior::Complete(json!({})));
        for bad in [
            json!({"amount": "100", "from": "USD", "to": "EUR"}),
            json!({"from": "USD", "to": "EUR"}),
            json!({"amount": 1, "from": "USD", "to": "EUR", "fee": 2}),
        ] {
            let result = tool.invoke(args(bad), &InvocationContext::new()).await;
            assert_eq!(result.failure_kind(), Some(FailureKind::InvalidArgument));
        }
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_null_optional_arguments_are_dropped() {
        let (stub, tool) =
            tool_with(StubBehavior::Complete(json!({"amount": 1, "currency": "EUR"})));
        let result = tool
            .invoke(
                args(json!({"amount": 1, "from": "USD", "to": "EUR", "note": null})),
                &InvocationContext::new(),
            )
            .await;
        assert!(result.is_success());
        assert_eq!(stub.calls(), 1);

        let missing = tool
            .invoke(
                args(json!({"amount": null, "from": "USD", "to": "EUR"})),
                &InvocationContext::new(),
            )
            .await;
        assert_eq!(missing.failure_kind(), Some(FailureKind::InvalidArgument));
    }

    #[tokio::test]
    async fn test_nonconforming_result_is_protocol_mismatch() {
        let (_stub, tool) = tool_with(StubBehavior::Complete(json!({"amt": 91.5})));
        let result = tool
            .invoke(
                args(json!({"amount": 100, "from": "USD", "to": "EUR"})),
                &InvocationContext::new(),
            )
            .await;
        match result {
            InvocationResult::Failure(f) => {
                assert_eq!(f.kind, FailureKind::ProtocolMismatch);
                assert!(!f.retryable);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancelled_before_sending() {
        let (stub, tool) = tool_with(StubBehavior::Complete(json!({})));
        let cancel = CancelSignal::new();
        cancel.cancel();
        let result = tool
            .invoke(
                args(json!({"amount": 1, "from": "USD", "to": "EUR"})),
                &InvocationContext::new().with_cancel(cancel),
            )
            .await;
        assert_eq!(result.failure_kind(), Some(FailureKind::Cancelled));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_streaming_final_is_validated() {
        let stub = StubTransport::new(StubBehavior::Stream(vec![
            json!({"kind": "artifact-update", "taskId": "t",
                   "artifact": {"artifactId": "a", "parts": [{"kind": "data", "data": {"amt": 1}}]}}),
            json!({"kind": "status-update", "taskId": "t", "status": {"state": "completed"}, "final": true}),
        ]));
        let tool = Arc::new(RemoteCapabilityTool::new(
            Arc::new(convert_descriptor().with_streaming(true)),
            Arc::new(fast_endpoint(0)),
            TransportClient::new(stub.clone()),
        ));
        assert!(tool.supports_streaming());

        let events: Vec<InvocationEvent> = tool
            .invoke_streaming(
                args(json!({"amount": 1, "from": "USD", "to": "EUR"})),
                InvocationContext::new(),
            )
            .collect()
            .await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], InvocationEvent::Partial(json!({"amt": 1})));
        match &events[1] {
            InvocationEvent::Final(result) => {
                assert_eq!(result.failure_kind(), Some(FailureKind::ProtocolMismatch))
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_streaming_invalid_arguments() {
        let (stub, tool) = tool_with(StubBehavior::Complete(json!({})));
        let result = drain(Arc::new(tool).invoke_streaming(args(json!({})), InvocationContext::new())).await;
        assert_eq!(result.failure_kind(), Some(FailureKind::InvalidArgument));
        assert_eq!(stub.calls(), 0);
    }
}
