//! Per-call invocation request and result types shared by local and
//! remote tools.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

/// Why a tool invocation did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Arguments did not conform to the tool's argument schema.
    InvalidArgument,
    /// The remote agent's capabilities could not be resolved.
    Discovery,
    /// The remote agent could not be reached or answered garbage.
    Transport,
    /// The remote agent understood the request and reported an error.
    Remote,
    /// The remote agent answered with a payload that breaks its contract.
    ProtocolMismatch,
    Cancelled,
    /// A local tool's function returned an error.
    Execution,
}

impl FailureKind {
    /// Default retryability of a failure of this kind.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Transport)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::Discovery => "discovery",
            Self::Transport => "transport",
            Self::Remote => "remote",
            Self::ProtocolMismatch => "protocol_mismatch",
            Self::Cancelled => "cancelled",
            Self::Execution => "execution",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationFailure {
    pub kind: FailureKind,
    pub message: String,
    pub retryable: bool,
}

impl InvocationFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: kind.is_retryable(),
        }
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }
}

impl fmt::Display for InvocationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for InvocationFailure {}

/// Outcome of invoking a tool.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationResult {
    Success(Value),
    Failure(InvocationFailure),
}

impl InvocationResult {
    pub fn success(value: Value) -> Self {
        Self::Success(value)
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failure(InvocationFailure::new(kind, message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure.kind),
        }
    }

    pub fn into_result(self) -> Result<Value, InvocationFailure> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure(failure) => Err(failure),
        }
    }

    /// Render the result the way it is fed back to a reasoning loop.
    pub fn to_tool_message(&self) -> Value {
        match self {
            Self::Success(value) => json!({"ok": true, "data": value}),
            Self::Failure(failure) => json!({
                "ok": false,
                "error": {
                    "kind": failure.kind,
                    "message": failure.message,
                    "retryable": failure.retryable,
                }
            }),
        }
    }
}

impl From<Result<Value, InvocationFailure>> for InvocationResult {
    fn from(result: Result<Value, InvocationFailure>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(failure) => Self::Failure(failure),
        }
    }
}

/// A single capability invocation headed for a remote agent.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRequest {
    pub capability_name: String,
    pub arguments: Map<String, Value>,
    /// Fresh per call; doubles as the JSON-RPC id.
    pub correlation_id: String,
    pub context_id: Option<String>,
}

impl InvocationRequest {
    pub fn new(capability_name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            capability_name: capability_name.into(),
            arguments,
            correlation_id: Uuid::new_v4().to_string(),
            context_id: None,
        }
    }

    pub fn with_context_id(mut self, context_id: Option<String>) -> Self {
        self.context_id = context_id;
        self
    }
}
