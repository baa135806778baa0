//! # a2a-bridge
//!
//! Cross-runtime capability bridge. Capabilities of remote agents speaking
//! an A2A-style JSON-RPC protocol are discovered from their agent cards and
//! exposed as ordinary tools, next to local tools, in a single registry a
//! reasoning loop can list and invoke.
//!
//! - [`a2a`]: wire types, endpoint configuration, transport and client
//! - [`capabilities`]: capability descriptors, JSON Schema subset, discovery
//! - [`tools`]: the tool trait, local/remote tools, registry, invocation types
//! - [`bridge`]: builds the registry from local tools and remote endpoints
//! - [`server`]: hosts capabilities for remote callers over HTTP
//! - [`agents`]: the demo currency agent and travel assistant tools

pub mod a2a;
pub mod agents;
pub mod bridge;
pub mod capabilities;
pub mod server;
pub mod tools;

pub use a2a::{BridgeConfig, RemoteAgentEndpoint, TransportClient};
pub use bridge::{Bridge, BridgeBuilder, BridgeError};
pub use capabilities::{CapabilityDescriptor, DiscoveryResolver, Schema};
pub use tools::{
    BaseTool, CancelSignal, FailureKind, InvocationContext, InvocationEvent, InvocationFailure,
    InvocationResult, LocalTool, RemoteCapabilityTool, ToolRegistry,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
