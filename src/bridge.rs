//! The bridge: one tool registry over local tools and remote agents.
//!
//! # Build order
//!
//! 1. Every endpoint is validated
//! 2. Local tools are registered
//! 3. Each endpoint is resolved (concurrently) and its capabilities are
//!    registered as [`RemoteCapabilityTool`]s, in endpoint order
//!
//! Any name collision fails the build. The resulting registry is immutable
//! and shared.

use std::sync::Arc;

use futures::future::try_join_all;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::a2a::client::TransportClient;
use crate::a2a::config::{BridgeConfig, ConfigError, RemoteAgentEndpoint};
use crate::a2a::errors::TransportError;
use crate::capabilities::resolver::{DiscoveryError, DiscoveryResolver};
use crate::tools::base_tool::BaseTool;
use crate::tools::context::InvocationContext;
use crate::tools::invocation::InvocationResult;
use crate::tools::registry::{RegistryError, ToolRegistry, ToolSummary};
use crate::tools::remote_tool::RemoteCapabilityTool;
use crate::tools::streaming::InvocationStream;

/// Building a [`Bridge`] failed.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to create HTTP transport: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

// ---------------------------------------------------------------------------
// BridgeBuilder
// ---------------------------------------------------------------------------

/// Collects local tools and remote endpoints, then resolves them.
#[derive(Debug, Default)]
pub struct BridgeBuilder {
    client: Option<TransportClient>,
    local_tools: Vec<Arc<dyn BaseTool>>,
    endpoints: Vec<RemoteAgentEndpoint>,
}

impl BridgeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this client instead of a fresh HTTP one.
    pub fn with_client(mut self, client: TransportClient) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_local_tool(mut self, tool: impl BaseTool) -> Self {
        self.local_tools.push(Arc::new(tool));
        self
    }

    pub fn with_local_tools<T: BaseTool>(mut self, tools: impl IntoIterator<Item = T>) -> Self {
        self.local_tools
            .extend(tools.into_iter().map(|t| Arc::new(t) as Arc<dyn BaseTool>));
        self
    }

    pub fn with_endpoint(mut self, endpoint: RemoteAgentEndpoint) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    pub fn with_config(mut self, config: BridgeConfig) -> Self {
        self.endpoints.extend(config.remote_agents);
        self
    }

    /// Resolve every endpoint and build the registry.
    pub async fn build(self) -> Result<Bridge, BridgeError> {
        for endpoint in &self.endpoints {
            endpoint.validate()?;
        }
        let client = match self.client {
            Some(client) => client,
            None => TransportClient::http()?,
        };

        let mut registry = ToolRegistry::new();
        for tool in self.local_tools {
            registry.register(tool)?;
        }

        let resolver = DiscoveryResolver::new(client.clone());
        let endpoints: Vec<Arc<RemoteAgentEndpoint>> =
            self.endpoints.into_iter().map(Arc::new).collect();
        let resolved = try_join_all(endpoints.iter().map(|e| resolver.resolve(e))).await?;

        for (endpoint, descriptors) in endpoints.iter().zip(resolved) {
            for descriptor in descriptors.iter() {
                registry.register(
                    RemoteCapabilityTool::new(descriptor.clone(), endpoint.clone(), client.clone())
                        .as_tool(),
                )?;
            }
            log::info!(
                "Bridged remote agent: endpoint='{}', capabilities={}",
                endpoint.display_name(),
                descriptors.len()
            );
        }

        log::info!("Bridge ready: tools={}", registry.len());
        Ok(Bridge {
            registry: Arc::new(registry),
            resolver: Arc::new(resolver),
            endpoints,
        })
    }
}

// ---------------------------------------------------------------------------
// Bridge
// ---------------------------------------------------------------------------

/// A built bridge. Cheap to clone; all clones share one registry.
#[derive(Debug, Clone)]
pub struct Bridge {
    registry: Arc<ToolRegistry>,
    resolver: Arc<DiscoveryResolver>,
    endpoints: Vec<Arc<RemoteAgentEndpoint>>,
}

impl Bridge {
    pub fn builder() -> BridgeBuilder {
        BridgeBuilder::new()
    }

    /// Build from configuration plus local tools.
    pub async fn from_config(
        config: BridgeConfig,
        local_tools: Vec<Arc<dyn BaseTool>>,
    ) -> Result<Self, BridgeError> {
        let mut builder = BridgeBuilder::new().with_config(config);
        builder.local_tools = local_tools;
        builder.build().await
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &DiscoveryResolver {
        &self.resolver
    }

    pub fn endpoints(&self) -> &[Arc<RemoteAgentEndpoint>] {
        &self.endpoints
    }

    pub fn list(&self) -> Vec<ToolSummary> {
        self.registry.list()
    }

    pub async fn invoke(
        &self,
        name: &str,
        args: Map<String, Value>,
        ctx: &InvocationContext,
    ) -> InvocationResult {
        self.registry.invoke(name, args, ctx).await
    }

    pub fn invoke_streaming(
        &self,
        name: &str,
        args: Map<String, Value>,
        ctx: InvocationContext,
    ) -> InvocationStream {
        self.registry.invoke_streaming(name, args, ctx)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2a::config::BackoffPolicy;
    use crate::agents::{currency_host, travel_tools, weather_host};
    use crate::capabilities::descriptor::CapabilityDescriptor;
    use crate::server::host::{AgentHost, HostedCapability};
    use crate::server::routes::{app_router, AppState};
    use crate::tools::base_tool::ToolOrigin;
    use crate::tools::context::CancelSignal;
    use crate::tools::invocation::FailureKind;
    use crate::tools::streaming::InvocationEvent;
    use futures::StreamExt;
    use serde_json::json;
    use std::time::Duration;

    /// Serve `host` on an ephemeral port; returns its base URL.
    async fn serve(host: AgentHost) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = app_router(AppState::new(host));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn convert_descriptor() -> CapabilityDescriptor {
        CapabilityDescriptor::new(
            "convertCurrency",
            json!({
                "type": "object",
                "properties": {
                    "amount": {"type": "number"},
                    "from": {"type": "string"},
                    "to": {"type": "string"}
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
        .with_description("Convert an amount between currencies")
    }

    /// A remote agent whose single capability always answers `reply`.
    fn fixed_host(reply: Value) -> AgentHost {
        let mut host = AgentHost::new("stub_currency_agent", "Answers with a fixed payload");
        host.add_capability(HostedCapability::from_fn(convert_descriptor(), move |_| {
            Ok(reply.clone())
        }))
        .unwrap();
        host
    }

    fn endpoint(base: &str) -> RemoteAgentEndpoint {
        RemoteAgentEndpoint::new(base)
            .with_name("currency")
            .with_timeout(Duration::from_secs(5))
            .with_retry_count(1)
            .with_backoff(BackoffPolicy::none())
    }

    fn args(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_conforming_remote_result_end_to_end() {
        let base = serve(fixed_host(json!({"amount": 91.5, "currency": "EUR"}))).await;
        let bridge = Bridge::builder()
            .with_endpoint(endpoint(&base))
            .build()
            .await
            .unwrap();

        let tool = bridge.registry().lookup("convertCurrency").unwrap();
        assert_eq!(
            tool.origin(),
            ToolOrigin::Remote {
                endpoint: "currency".into()
            }
        );
        let result = bridge
            .invoke(
                "convertCurrency",
                args(json!({"amount": 100, "from": "USD", "to": "EUR"})),
                &InvocationContext::new(),
            )
            .await;
        assert_eq!(
            result,
            InvocationResult::success(json!({"amount": 91.5, "currency": "EUR"}))
        );
    }

    #[tokio::test]
    async fn test_malformed_remote_result_end_to_end() {
        let base = serve(fixed_host(json!({"amt": 91.5}))).await;
        let bridge = Bridge::builder()
            .with_endpoint(endpoint(&base))
            .build()
            .await
            .unwrap();

        let result = bridge
            .invoke(
                "convertCurrency",
                args(json!({"amount": 100, "from": "USD", "to": "EUR"})),
                &InvocationContext::new(),
            )
            .await;
        assert_eq!(result.failure_kind(), Some(FailureKind::ProtocolMismatch));
    }

    #[tokio::test]
    async fn test_local_and_remote_tools_share_one_registry() {
        let base = serve(currency_host().unwrap()).await;
        let bridge = Bridge::builder()
            .with_local_tools(travel_tools().unwrap())
            .with_endpoint(endpoint(&base))
            .build()
            .await
            .unwrap();

        let names: Vec<String> = bridge.list().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "getDestinationInfo",
                "calculateTripBudget",
                "getPackingSuggestions",
                "getBestTravelTime",
                "listDestinations",
                "convertCurrency",
                "getExchangeRate",
                "listSupportedCurrencies",
            ]
        );

        let ctx = InvocationContext::new().with_context_id("trip-1");
        let budget = bridge
            .invoke(
                "calculateTripBudget",
                args(json!({"destination": "Paris", "days": 3})),
                &ctx,
            )
            .await
            .into_result()
            .unwrap();
        let total = budget["budgetUsd"]["total"].as_f64().unwrap();

        let converted = bridge
            .invoke(
                "convertCurrency",
                args(json!({"amount": total, "from": "USD", "to": "EUR"})),
                &ctx,
            )
            .await
            .into_result()
            .unwrap();
        assert_eq!(converted["amount"], 414.0);
        assert_eq!(converted["currency"], "EUR");

        let unknown_pair = bridge
            .invoke(
                "convertCurrency",
                args(json!({"amount": 1, "from": "CAD", "to": "AUD"})),
                &ctx,
            )
            .await;
        assert_eq!(unknown_pair.failure_kind(), Some(FailureKind::Remote));
    }

    #[tokio::test]
    async fn test_two_remote_agents_and_local_tools() {
        let currency = serve(currency_host().unwrap()).await;
        let weather = serve(weather_host().unwrap()).await;
        let bridge = Bridge::builder()
            .with_local_tools(travel_tools().unwrap())
            .with_endpoint(endpoint(&currency))
            .with_endpoint(endpoint(&weather).with_name("weather"))
            .build()
            .await
            .unwrap();

        let listing = bridge.list();
        assert_eq!(listing.len(), 11);
        let forecast_tool = listing
            .iter()
            .find(|t| t.name == "weather_forecast")
            .unwrap();
        assert_eq!(
            forecast_tool.origin,
            ToolOrigin::Remote {
                endpoint: "weather".into()
            }
        );

        let ctx = InvocationContext::new().with_context_id("trip-2");
        let best = bridge
            .invoke("getBestTravelTime", args(json!({"destination": "Sydney"})), &ctx)
            .await
            .into_result()
            .unwrap();
        assert_eq!(best["country"], "Australia");

        let forecast = bridge
            .invoke(
                "weather_forecast",
                args(json!({"city": "Sydney", "days": 5, "units": null})),
                &ctx,
            )
            .await
            .into_result()
            .unwrap();
        assert_eq!(forecast["forecast"].as_array().unwrap().len(), 5);

        let too_long = bridge
            .invoke("weather_forecast", args(json!({"city": "Sydney", "days": 9})), &ctx)
            .await;
        assert_eq!(too_long.failure_kind(), Some(FailureKind::InvalidArgument));

        let packing = bridge
            .invoke(
                "getPackingSuggestions",
                args(json!({"destination": "Sydney", "tripType": null})),
                &ctx,
            )
            .await
            .into_result()
            .unwrap();
        assert_eq!(packing["tripType"], "vacation");
    }

    #[tokio::test]
    async fn test_streaming_end_to_end() {
        let base = serve(fixed_host(json!({"amount": 91.5, "currency": "EUR"}))).await;
        let bridge = Bridge::builder()
            .with_endpoint(endpoint(&base).with_streaming(true))
            .build()
            .await
            .unwrap();
        assert!(bridge.registry().lookup("convertCurrency").unwrap().supports_streaming());

        let events: Vec<InvocationEvent> = bridge
            .invoke_streaming(
                "convertCurrency",
                args(json!({"amount": 100, "from": "USD", "to": "EUR"})),
                InvocationContext::new(),
            )
            .collect()
            .await;
        let payload = json!({"amount": 91.5, "currency": "EUR"});
        assert_eq!(
            events,
            vec![
                InvocationEvent::Partial(payload.clone()),
                InvocationEvent::Final(InvocationResult::success(payload)),
            ]
        );
    }

    #[tokio::test]
    async fn test_name_collision_fails_the_build() {
        let base = serve(fixed_host(json!({}))).await;
        let local = crate::tools::base_tool::LocalTool::new(
            "convertCurrency",
            "Local converter",
            Arc::new(|_: &Map<String, Value>| -> Result<Value, crate::tools::ToolError> {
                Ok(json!({}))
            }),
        );
        let err = Bridge::builder()
            .with_local_tool(local)
            .with_endpoint(endpoint(&base))
            .build()
            .await
            .unwrap_err();
        match err {
            BridgeError::Registry(RegistryError::DuplicateToolName { name, existing }) => {
                assert_eq!(name, "convertCurrency");
                assert_eq!(existing, ToolOrigin::Local);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails_discovery() {
        let err = Bridge::builder()
            .with_endpoint(
                endpoint("http://127.0.0.1:1")
                    .with_retry_count(0)
                    .with_timeout(Duration::from_secs(2)),
            )
            .build()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Discovery(DiscoveryError::Unreachable { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_endpoint_is_a_config_error() {
        let err = Bridge::builder()
            .with_endpoint(RemoteAgentEndpoint::new("ftp://example.com"))
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }

    #[tokio::test]
    async fn test_cancelled_remote_call() {
        let base = serve(fixed_host(json!({"amount": 1, "currency": "EUR"}))).await;
        let bridge = Bridge::builder()
            .with_endpoint(endpoint(&base))
            .build()
            .await
            .unwrap();
        let cancel = CancelSignal::new();
        cancel.cancel();
        let result = bridge
            .invoke(
                "convertCurrency",
                args(json!({"amount": 1, "from": "USD", "to": "EUR"})),
                &InvocationContext::new().with_cancel(cancel),
            )
            .await;
        assert_eq!(result.failure_kind(), Some(FailureKind::Cancelled));
    }
}
