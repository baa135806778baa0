//! Base tool definitions.
//!
//! Provides the [`BaseTool`] trait shared by local and remote tools, and the
//! concrete [`LocalTool`] struct that wraps a callable function.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::context::InvocationContext;
use super::invocation::{FailureKind, InvocationResult};
use super::streaming::{self, InvocationStream};
use crate::capabilities::schema::{describe_violations, Schema, SchemaError};

// ---------------------------------------------------------------------------
// ToolOrigin
// ---------------------------------------------------------------------------

/// Where a tool's work actually happens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolOrigin {
    /// In this process.
    Local,
    /// On a remote agent.
    Remote {
        /// Endpoint display name.
        endpoint: String,
    },
}

impl fmt::Display for ToolOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Remote { endpoint } => write!(f, "remote:{}", endpoint),
        }
    }
}

// ---------------------------------------------------------------------------
// BaseTool trait
// ---------------------------------------------------------------------------

/// A tool a reasoning loop can invoke by name.
///
/// Implementors never panic on bad input: every outcome, including invalid
/// arguments and cancellation, is reported through [`InvocationResult`].
#[async_trait]
pub trait BaseTool: Send + Sync + fmt::Debug + 'static {
    /// The unique name of the tool that clearly communicates its purpose.
    fn name(&self) -> &str;

    /// Description used to tell the model how/when/why to use the tool.
    fn description(&self) -> &str;

    /// JSON schema for the arguments that the tool accepts.
    fn args_schema(&self) -> Value;

    fn origin(&self) -> ToolOrigin;

    /// Whether [`invoke_streaming`](Self::invoke_streaming) can yield partial
    /// results before the final one.
    fn supports_streaming(&self) -> bool {
        false
    }

    /// Run the tool to completion.
    async fn invoke(&self, args: Map<String, Value>, ctx: &InvocationContext) -> InvocationResult;

    /// Run the tool as a stream of partial results ending in a final result.
    ///
    /// Default implementation yields the result of [`invoke`](Self::invoke)
    /// as the only event.
    fn invoke_streaming(
        self: Arc<Self>,
        args: Map<String, Value>,
        ctx: InvocationContext,
    ) -> InvocationStream {
        Box::pin(async_stream::stream! {
            let result = self.invoke(args, &ctx).await;
            yield streaming::InvocationEvent::Final(result);
        })
    }
}

// ---------------------------------------------------------------------------
// LocalTool struct (wraps a callable function)
// ---------------------------------------------------------------------------

/// Error returned by a local tool function.
pub type ToolError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for a shared synchronous tool function.
pub type ToolFn = Arc<dyn Fn(&Map<String, Value>) -> Result<Value, ToolError> + Send + Sync>;

/// Concrete tool that runs a function in this process.
#[derive(Clone)]
pub struct LocalTool {
    tool_name: String,
    tool_description: String,
    tool_args_schema: Value,
    schema: Schema,
    /// The wrapped function.
    pub func: ToolFn,
}

impl fmt::Debug for LocalTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTool")
            .field("name", &self.tool_name)
            .field("description", &self.tool_description)
            .finish()
    }
}

impl LocalTool {
    /// Create a new tool with no arguments wrapping the given function.
    pub fn new(name: impl Into<String>, description: impl Into<String>, func: ToolFn) -> Self {
        Self {
            tool_name: name.into(),
            tool_description: description.into(),
            tool_args_schema: serde_json::json!({"type": "object", "properties": {}}),
            schema: Schema::empty_object(),
            func,
        }
    }

    /// Builder method to set the args schema.
    pub fn with_args_schema(mut self, schema: Value) -> Result<Self, SchemaError> {
        self.schema = Schema::from_json(&schema)?;
        self.tool_args_schema = schema;
        Ok(self)
    }
}

#[async_trait]
impl BaseTool for LocalTool {
    fn name(&self) -> &str {
        &self.tool_name
    }

    fn description(&self) -> &str {
        &self.tool_description
    }

    fn args_schema(&self) -> Value {
        self.tool_args_schema.clone()
    }

    fn origin(&self) -> ToolOrigin {
        ToolOrigin::Local
    }

    async fn invoke(&self, args: Map<String, Value>, ctx: &InvocationContext) -> InvocationResult {
        if ctx.cancel.is_cancelled() {
            return InvocationResult::failure(FailureKind::Cancelled, "invocation cancelled");
        }
        let args = match self.schema.validate_arguments(args) {
            Ok(args) => args,
            Err(violations) => {
                return InvocationResult::failure(
                    FailureKind::InvalidArgument,
                    describe_violations(&violations),
                )
            }
        };
        match (self.func)(&args) {
            Ok(value) => InvocationResult::success(value),
            Err(e) => {
                log::warn!("Local tool failed: tool='{}', error='{}'", self.tool_name, e);
                InvocationResult::failure(FailureKind::Execution, e.to_string())
            }
        }
    }
}
