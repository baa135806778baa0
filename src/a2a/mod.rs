//! A2A (Agent-to-Agent) protocol module.
//!
//! Provides the wire types, error codes, endpoint configuration,
//! authentication schemes, the single-attempt HTTP transport and the
//! transport client that applies deadlines, retries and cancellation.

pub mod auth;
pub mod client;
pub mod config;
pub mod errors;
pub mod transport;
pub mod types;

pub use client::TransportClient;
pub use config::{BackoffPolicy, BridgeConfig, ConfigError, RemoteAgentEndpoint, TimeoutPolicy};
pub use errors::{A2AError, A2AErrorCode, TransportError};
pub use transport::{A2ATransport, HttpTransport};
