//! Capability host: serves a set of capabilities to remote callers.
//!
//! The host owns the protocol side of an agent: it renders the agent card,
//! routes a `message/send` to the capability named in the message metadata,
//! validates arguments with the same [`Schema`](crate::capabilities::Schema)
//! the calling side uses, and wraps the handler's outcome in a task.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::a2a::errors::{A2AError, A2AErrorCode};
use crate::a2a::types::{
    payload_of, AgentCapabilities, AgentCard, Artifact, Message, MessageSendParams, Part, Role,
    Task, TaskState, TaskStatus, DEFAULT_PROTOCOL_VERSION,
};
use crate::capabilities::descriptor::CapabilityDescriptor;
use crate::capabilities::schema::describe_violations;

const DEFAULT_CARD_PATH: &str = "/.well-known/agent-card.json";
const DEFAULT_RPC_PATH: &str = "/a2a";

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Outcome of a capability handler that did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The arguments passed validation but make no sense to the handler.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Failed(String),
}

/// Boxed future returned by a [`CapabilityHandler`].
pub type HandlerFuture = BoxFuture<'static, Result<Value, HostError>>;

/// Async function implementing one capability.
pub type CapabilityHandler = Arc<dyn Fn(Map<String, Value>) -> HandlerFuture + Send + Sync>;

/// A capability together with the code that answers it.
#[derive(Clone)]
pub struct HostedCapability {
    pub descriptor: CapabilityDescriptor,
    handler: CapabilityHandler,
}

impl fmt::Debug for HostedCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostedCapability")
            .field("name", &self.descriptor.name)
            .finish()
    }
}

impl HostedCapability {
    pub fn new(descriptor: CapabilityDescriptor, handler: CapabilityHandler) -> Self {
        Self {
            descriptor,
            handler,
        }
    }

    /// Host a synchronous function.
    pub fn from_fn<F>(descriptor: CapabilityDescriptor, f: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Result<Value, HostError> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Self::new(
            descriptor,
            Arc::new(move |args: Map<String, Value>| {
                let f = f.clone();
                async move { f(&args) }.boxed()
            }),
        )
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}

/// A capability with this name is already hosted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("capability '{0}' is already hosted")]
pub struct DuplicateCapability(pub String);

// ---------------------------------------------------------------------------
// AgentHost
// ---------------------------------------------------------------------------

/// An agent exposing hosted capabilities over the A2A protocol.
#[derive(Debug, Clone)]
pub struct AgentHost {
    pub name: String,
    pub description: String,
    pub version: String,
    /// Public base URL advertised in the card.
    pub url: String,
    pub protocol_version: String,
    pub streaming: bool,
    pub card_path: String,
    pub rpc_path: String,
    capabilities: Vec<HostedCapability>,
    index: HashMap<String, usize>,
}

impl AgentHost {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            version: crate::VERSION.to_string(),
            url: String::new(),
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            streaming: true,
            card_path: DEFAULT_CARD_PATH.to_string(),
            rpc_path: DEFAULT_RPC_PATH.to_string(),
            capabilities: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn with_paths(mut self, card_path: impl Into<String>, rpc_path: impl Into<String>) -> Self {
        self.card_path = card_path.into();
        self.rpc_path = rpc_path.into();
        self
    }

    /// Add a capability; names must be unique within the host.
    pub fn add_capability(&mut self, capability: HostedCapability) -> Result<(), DuplicateCapability> {
        let name = capability.name().to_string();
        if self.index.contains_key(&name) {
            return Err(DuplicateCapability(name));
        }
        self.index.insert(name, self.capabilities.len());
        self.capabilities.push(capability);
        Ok(())
    }

    pub fn capability(&self, name: &str) -> Option<&HostedCapability> {
        self.index.get(name).map(|&i| &self.capabilities[i])
    }

    pub fn capability_names(&self) -> Vec<&str> {
        self.capabilities.iter().map(HostedCapability::name).collect()
    }

    /// The card served at `card_path`.
    pub fn agent_card(&self) -> AgentCard {
        AgentCard {
            name: self.name.clone(),
            description: Some(self.description.clone()),
            url: format!("{}{}", self.url.trim_end_matches('/'), self.rpc_path),
            version: Some(self.version.clone()),
            protocol_version: Some(self.protocol_version.clone()),
            capabilities: AgentCapabilities {
                streaming: self.streaming,
                push_notifications: false,
            },
            skills: self
                .capabilities
                .iter()
                .map(|c| c.descriptor.to_skill())
                .collect(),
            provider: None,
            default_input_modes: vec!["application/json".to_string(), "text/plain".to_string()],
            default_output_modes: vec!["application/json".to_string()],
        }
    }

    /// Decode `message/send` / `message/stream` params and find the target
    /// capability and its validated arguments.
    pub fn prepare(&self, params: Value) -> Result<PreparedCall, A2AError> {
        let params: MessageSendParams = serde_json::from_value(params)
            .map_err(|e| A2AError::new(A2AErrorCode::InvalidParams, format!("invalid params: {}", e)))?;
        let message = params.message;

        let skill_id = message
            .skill_id()
            .map(str::to_string)
            .or_else(|| {
                params
                    .metadata
                    .as_ref()
                    .and_then(|m| m.get(crate::a2a::types::SKILL_ID_METADATA_KEY))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .or_else(|| match self.capabilities.as_slice() {
                [only] => Some(only.name().to_string()),
                _ => None,
            })
            .ok_or_else(|| {
                A2AError::new(
                    A2AErrorCode::InvalidParams,
                    "message does not name a skill and the agent hosts several",
                )
            })?;

        let capability = self.capability(&skill_id).ok_or_else(|| {
            A2AError::new(
                A2AErrorCode::SkillNotFound,
                format!("skill '{}' is not hosted by this agent", skill_id),
            )
        })?;

        let args = match payload_of(&message.parts) {
            Some(Value::Object(map)) => map,
            None => Map::new(),
            Some(other) => {
                return Err(A2AError::new(
                    A2AErrorCode::InvalidParams,
                    format!("arguments must be a JSON object, got {}", other),
                ))
            }
        };

        let args = capability
            .descriptor
            .argument_schema
            .validate_arguments(args)
            .map_err(|violations| {
                A2AError::new(A2AErrorCode::InvalidParams, describe_violations(&violations))
            })?;

        Ok(PreparedCall {
            capability: capability.clone(),
            args,
            context_id: message.context_id.clone(),
            task_id: uuid::Uuid::new_v4().to_string(),
        })
    }

    /// Handle a `message/send` call to completion.
    pub async fn handle_send(&self, params: Value) -> Result<Task, A2AError> {
        let call = self.prepare(params)?;
        Ok(call.run().await)
    }
}

// ---------------------------------------------------------------------------
// PreparedCall
// ---------------------------------------------------------------------------

/// A validated call ready to run.
#[derive(Debug, Clone)]
pub struct PreparedCall {
    pub capability: HostedCapability,
    pub args: Map<String, Value>,
    pub context_id: Option<String>,
    pub task_id: String,
}

impl PreparedCall {
    /// Task as first reported on a stream.
    pub fn submitted(&self) -> Task {
        Task {
            id: self.task_id.clone(),
            context_id: self.context_id.clone(),
            status: status(TaskState::Submitted, None),
            artifacts: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Run the handler and wrap its outcome as a terminal task.
    pub async fn run(self) -> Task {
        let name = self.capability.name().to_string();
        let started = std::time::Instant::now();
        let outcome = (self.capability.handler)(self.args).await;
        let duration_ms = started.elapsed().as_millis();

        let mut task = Task {
            id: self.task_id,
            context_id: self.context_id,
            status: status(TaskState::Completed, None),
            artifacts: Vec::new(),
            history: Vec::new(),
        };
        match outcome {
            Ok(value) => {
                log::info!(
                    "Hosted capability completed: skill='{}', duration_ms={}",
                    name,
                    duration_ms
                );
                task.artifacts.push(Artifact {
                    artifact_id: uuid::Uuid::new_v4().to_string(),
                    name: Some(format!("{}-result", name)),
                    parts: vec![Part::Data { data: value }],
                });
            }
            Err(e) => {
                log::warn!("Hosted capability failed: skill='{}', error='{}'", name, e);
                let reply = Message {
                    role: Role::Agent,
                    parts: vec![Part::Text {
                        text: e.to_string(),
                    }],
                    message_id: uuid::Uuid::new_v4().to_string(),
                    context_id: task.context_id.clone(),
                    task_id: Some(task.id.clone()),
                    metadata: None,
                };
                let state = match e {
                    HostError::InvalidArguments(_) => TaskState::Rejected,
                    HostError::Failed(_) => TaskState::Failed,
                };
                task.status = status(state, Some(reply));
            }
        }
        task
    }
}

fn status(state: TaskState, message: Option<Message>) -> TaskStatus {
    TaskStatus {
        state,
        message,
        timestamp: Some(chrono::Utc::now().to_rfc3339()),
    }
}
