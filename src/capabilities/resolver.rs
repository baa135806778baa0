//! Discovery resolver: turns a remote agent endpoint into its capability
//! descriptors.
//!
//! Each endpoint is resolved once and the descriptors are cached for the
//! life of the resolver. [`DiscoveryResolver::refresh`] forces a new fetch.
//! Endpoints configured with static capabilities never touch the network.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use super::descriptor::{CapabilityDescriptor, DescriptorError};
use crate::a2a::client::TransportClient;
use crate::a2a::config::RemoteAgentEndpoint;
use crate::a2a::errors::TransportError;
use crate::a2a::types::AgentSkill;
use crate::tools::context::CancelSignal;

/// Descriptors of one endpoint, shared read-only.
pub type Descriptors = Arc<Vec<Arc<CapabilityDescriptor>>>;

/// An endpoint's capabilities could not be resolved.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("remote agent '{endpoint}' is unreachable: {source}")]
    Unreachable {
        endpoint: String,
        #[source]
        source: TransportError,
    },

    #[error("remote agent '{endpoint}' advertised a malformed capability: {source}")]
    Malformed {
        endpoint: String,
        #[source]
        source: DescriptorError,
    },

    #[error("remote agent '{endpoint}' advertises capability '{name}' more than once")]
    DuplicateCapability { endpoint: String, name: String },
}

/// Resolves and caches capability descriptors per endpoint.
#[derive(Debug)]
pub struct DiscoveryResolver {
    client: TransportClient,
    cache: RwLock<HashMap<String, Descriptors>>,
}

impl DiscoveryResolver {
    pub fn new(client: TransportClient) -> Self {
        Self {
            client,
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn cache_key(endpoint: &RemoteAgentEndpoint) -> String {
        endpoint.card_url()
    }

    /// Descriptors already resolved for `endpoint`, if any.
    pub fn cached(&self, endpoint: &RemoteAgentEndpoint) -> Option<Descriptors> {
        self.cache.read().get(&Self::cache_key(endpoint)).cloned()
    }

    /// Resolve `endpoint`, serving from the cache when possible.
    pub async fn resolve(
        &self,
        endpoint: &RemoteAgentEndpoint,
    ) -> Result<Descriptors, DiscoveryError> {
        self.resolve_with_cancel(endpoint, &CancelSignal::new()).await
    }

    pub async fn resolve_with_cancel(
        &self,
        endpoint: &RemoteAgentEndpoint,
        cancel: &CancelSignal,
    ) -> Result<Descriptors, DiscoveryError> {
        if let Some(hit) = self.cached(endpoint) {
            log::debug!(
                "Discovery cache hit: endpoint='{}', capabilities={}",
                endpoint.display_name(),
                hit.len()
            );
            return Ok(hit);
        }
        let descriptors = self.fetch(endpoint, cancel).await?;
        self.cache
            .write()
            .insert(Self::cache_key(endpoint), descriptors.clone());
        Ok(descriptors)
    }

    /// Drop any cached descriptors for `endpoint` and resolve it again.
    pub async fn refresh(
        &self,
        endpoint: &RemoteAgentEndpoint,
    ) -> Result<Descriptors, DiscoveryError> {
        self.cache.write().remove(&Self::cache_key(endpoint));
        self.resolve(endpoint).await
    }

    async fn fetch(
        &self,
        endpoint: &RemoteAgentEndpoint,
        cancel: &CancelSignal,
    ) -> Result<Descriptors, DiscoveryError> {
        if let Some(ref skills) = endpoint.static_capabilities {
            log::info!(
                "Using static capabilities: endpoint='{}', capabilities={}",
                endpoint.display_name(),
                skills.len()
            );
            return build_descriptors(endpoint, skills, endpoint.streaming);
        }

        log::info!(
            "Discovering capabilities: endpoint='{}', url='{}'",
            endpoint.display_name(),
            endpoint.card_url()
        );
        let card = self
            .client
            .discover(endpoint, cancel)
            .await
            .map_err(|source| DiscoveryError::Unreachable {
                endpoint: endpoint.display_name().to_string(),
                source,
            })?;

        if let Some(ref version) = card.protocol_version {
            if version != &endpoint.protocol_version {
                log::warn!(
                    "Protocol version mismatch: endpoint='{}', configured='{}', advertised='{}'",
                    endpoint.display_name(),
                    endpoint.protocol_version,
                    version
                );
            }
        }

        let streaming = endpoint.streaming && card.capabilities.streaming;
        let descriptors = build_descriptors(endpoint, &card.skills, streaming)?;
        log::info!(
            "Discovered capabilities: endpoint='{}', agent='{}', capabilities=[{}]",
            endpoint.display_name(),
            card.name,
            descriptors
                .iter()
                .map(|d| d.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(descriptors)
    }
}

fn build_descriptors(
    endpoint: &RemoteAgentEndpoint,
    skills: &[AgentSkill],
    streaming: bool,
) -> Result<Descriptors, DiscoveryError> {
    let mut seen = HashSet::new();
    let mut descriptors = Vec::with_capacity(skills.len());
    for (index, skill) in skills.iter().enumerate() {
        let descriptor = CapabilityDescriptor::from_skill(index, skill, streaming).map_err(
            |source| DiscoveryError::Malformed {
                endpoint: endpoint.display_name().to_string(),
                source,
            },
        )?;
        if !seen.insert(descriptor.name.clone()) {
            return Err(DiscoveryError::DuplicateCapability {
                endpoint: endpoint.display_name().to_string(),
                name: descriptor.name,
            });
        }
        descriptors.push(Arc::new(descriptor));
    }
    Ok(Arc::new(descriptors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2a::client::tests::{fast_endpoint, StubBehavior, StubTransport};
    use crate::a2a::types::{AgentCapabilities, AgentCard};
    use serde_json::json;

    fn skill(id: &str) -> AgentSkill {
        AgentSkill {
            id: Some(id.to_string()),
            input_schema: Some(json!({"type": "object"})),
            output_schema: Some(json!({"type": "object"})),
            ..Default::default()
        }
    }

    fn card(skills: Vec<AgentSkill>) -> AgentCard {
        AgentCard {
            name: "currency_agent".into(),
            description: None,
            url: "http://stub".into(),
            version: None,
            protocol_version: Some("0.2.0".into()),
            capabilities: AgentCapabilities {
                streaming: true,
                push_notifications: false,
            },
            skills,
            provider: None,
            default_input_modes: vec![],
            default_output_modes: vec![],
        }
    }

    fn resolver_with(card: Option<AgentCard>) -> (Arc<StubTransport>, DiscoveryResolver) {
        let stub = StubTransport::new(StubBehavior::Unreachable);
        *stub.card.lock() = card;
        let resolver = DiscoveryResolver::new(TransportClient::new(stub.clone()));
        (stub, resolver)
    }

    #[tokio::test]
    async fn test_resolves_once_and_caches() {
        let (stub, resolver) = resolver_with(Some(card(vec![skill("a"), skill("b")])));
        let endpoint = fast_endpoint(0);

        let first = resolver.resolve(&endpoint).await.unwrap();
        let second = resolver.resolve(&endpoint).await.unwrap();
        assert_eq!(first.len(), 2);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(stub.calls(), 1);

        resolver.refresh(&endpoint).await.unwrap();
        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn test_streaming_needs_both_sides() {
        let (_stub, resolver) = resolver_with(Some(card(vec![skill("a")])));
        let plain = resolver.resolve(&fast_endpoint(0)).await.unwrap();
        assert!(!plain[0].streaming);

        let (_stub, resolver) = resolver_with(Some(card(vec![skill("a")])));
        let streaming = resolver
            .resolve(&fast_endpoint(0).with_streaming(true))
            .await
            .unwrap();
        assert!(streaming[0].streaming);
    }

    #[tokio::test]
    async fn test_static_capabilities_skip_network() {
        let (stub, resolver) = resolver_with(None);
        let endpoint = fast_endpoint(0).with_static_capabilities(vec![skill("ping")]);
        let descriptors = resolver.resolve(&endpoint).await.unwrap();
        assert_eq!(descriptors[0].name, "ping");
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let (stub, resolver) = resolver_with(None);
        let err = resolver.resolve(&fast_endpoint(1)).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::Unreachable { .. }));
        assert_eq!(stub.calls(), 2);
        assert!(resolver.cached(&fast_endpoint(1)).is_none());
    }

    #[tokio::test]
    async fn test_malformed_and_duplicate_skills() {
        let mut broken = skill("x");
        broken.input_schema = None;
        let (_stub, resolver) = resolver_with(Some(card(vec![skill("a"), broken])));
        let err = resolver.resolve(&fast_endpoint(0)).await.unwrap_err();
        assert!(matches!(
            err,
            DiscoveryError::Malformed {
                source: DescriptorError::MissingField { index: 1, field: "inputSchema" },
                ..
            }
        ));

        let (_stub, resolver) = resolver_with(Some(card(vec![skill("a"), skill("a")])));
        let err = resolver.resolve(&fast_endpoint(0)).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::DuplicateCapability { ref name, .. } if name == "a"));
    }
}
