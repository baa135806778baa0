//! # Capabilities
//!
//! What a remote agent can do, as seen from the calling side.
//!
//! ## Resolution Flow
//!
//! 1. The endpoint configuration names a remote agent (`RemoteAgentEndpoint`)
//! 2. `DiscoveryResolver::resolve(endpoint)` fetches its agent card once
//! 3. Each advertised skill becomes a `CapabilityDescriptor`, with its
//!    argument and result JSON Schemas parsed into [`Schema`]
//! 4. The descriptors are wrapped as tools and registered (see `crate::bridge`)

pub mod descriptor;
pub mod resolver;
pub mod schema;

pub use descriptor::{CapabilityDescriptor, DescriptorError};
pub use resolver::{Descriptors, DiscoveryError, DiscoveryResolver};
pub use schema::{describe_violations, Bounds, Schema, SchemaError, SchemaViolation};
