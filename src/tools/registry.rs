//! Tool registry: the name-indexed set of tools a reasoning loop can call.
//!
//! Names are unique across the whole registry. Registration order is kept,
//! and the bridge registers local tools before remote ones, so a remote
//! capability whose name collides with a local tool fails loudly instead of
//! shadowing it.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::base_tool::{BaseTool, ToolOrigin};
use super::context::InvocationContext;
use super::invocation::{FailureKind, InvocationResult};
use super::streaming::{self, InvocationStream};

/// Registration failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("tool name '{name}' is already registered ({existing})")]
    DuplicateToolName { name: String, existing: ToolOrigin },
}

/// What a reasoning loop is told about a tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSummary {
    pub name: String,
    pub description: String,
    pub args_schema: Value,
    pub origin: ToolOrigin,
}

/// Name-indexed tool collection.
#[derive(Debug, Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn BaseTool>>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; fails if the name is taken.
    pub fn register(&mut self, tool: Arc<dyn BaseTool>) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if let Some(&index) = self.by_name.get(&name) {
            return Err(RegistryError::DuplicateToolName {
                name,
                existing: self.tools[index].origin(),
            });
        }
        log::debug!("Registered tool: name='{}', origin='{}'", name, tool.origin());
        self.by_name.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Register a tool by value.
    pub fn register_tool(&mut self, tool: impl BaseTool) -> Result<(), RegistryError> {
        self.register(Arc::new(tool))
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn BaseTool>> {
        self.by_name.get(name).map(|&i| self.tools[i].clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Summaries of all tools, in registration order.
    pub fn list(&self) -> Vec<ToolSummary> {
        self.tools
            .iter()
            .map(|t| ToolSummary {
                name: t.name().to_string(),
                description: t.description().to_string(),
                args_schema: t.args_schema(),
                origin: t.origin(),
            })
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Look up and invoke a tool. Unknown names yield an `InvalidArgument`
    /// failure.
    pub async fn invoke(
        &self,
        name: &str,
        args: Map<String, Value>,
        ctx: &InvocationContext,
    ) -> InvocationResult {
        match self.lookup(name) {
            Some(tool) => tool.invoke(args, ctx).await,
            None => unknown_tool(name),
        }
    }

    /// Streaming counterpart of [`invoke`](Self::invoke).
    pub fn invoke_streaming(
        &self,
        name: &str,
        args: Map<String, Value>,
        ctx: InvocationContext,
    ) -> InvocationStream {
        match self.lookup(name) {
            Some(tool) => tool.invoke_streaming(args, ctx),
            None => streaming::single(unknown_tool(name)),
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn unknown_tool(name: &str) -> InvocationResult {
    InvocationResult::failure(
        FailureKind::InvalidArgument,
        format!("unknown tool '{}'", name),
    )
}
