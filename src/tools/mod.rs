//! Tools system.
//!
//! This module provides the tool infrastructure a reasoning loop drives:
//! the [`BaseTool`] trait, local function tools, remote capability tools,
//! per-call invocation types and the [`ToolRegistry`].

pub mod base_tool;
pub mod context;
pub mod invocation;
pub mod registry;
pub mod remote_tool;
pub mod streaming;

// Re-exports for convenience
pub use base_tool::{BaseTool, LocalTool, ToolError, ToolFn, ToolOrigin};
pub use context::{CancelSignal, InvocationContext};
pub use invocation::{FailureKind, InvocationFailure, InvocationRequest, InvocationResult};
pub use registry::{RegistryError, ToolRegistry, ToolSummary};
pub use remote_tool::RemoteCapabilityTool;
pub use streaming::{drain, InvocationEvent, InvocationStream};
