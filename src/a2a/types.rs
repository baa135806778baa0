//! Wire types for the A2A (Agent-to-Agent) protocol.
//!
//! Field names follow the protocol's camelCase JSON encoding. Only the parts
//! of the protocol the bridge exchanges are modelled: the agent card used
//! for discovery, JSON-RPC envelopes, messages, tasks and the streaming
//! update events.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Protocol version sent when the endpoint configuration does not set one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "0.3.0";

/// JSON-RPC method for a blocking capability invocation.
pub const METHOD_MESSAGE_SEND: &str = "message/send";

/// JSON-RPC method for a streaming capability invocation.
pub const METHOD_MESSAGE_STREAM: &str = "message/stream";

/// Message metadata key naming the skill a message targets.
pub const SKILL_ID_METADATA_KEY: &str = "skillId";

// ---------------------------------------------------------------------------
// Agent card
// ---------------------------------------------------------------------------

/// Describes one skill/capability that an A2A agent offers.
///
/// Every field is optional on the wire so that a card with a broken skill
/// still parses and the resolver can report exactly what is missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSkill {
    /// Unique identifier; becomes the tool name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Human-readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// JSON Schema of the arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
    /// JSON Schema of the result payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
}

/// Capabilities advertised by an A2A agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub push_notifications: bool,
}

/// Provider information for an A2A agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProvider {
    pub organization: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Agent card describing a remote A2A agent and its skills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Agent URL endpoint.
    #[serde(default)]
    pub url: String,
    /// Agent (not protocol) version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub capabilities: AgentCapabilities,
    #[serde(default)]
    pub skills: Vec<AgentSkill>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<AgentProvider>,
    #[serde(default)]
    pub default_input_modes: Vec<String>,
    #[serde(default)]
    pub default_output_modes: Vec<String>,
}

// ---------------------------------------------------------------------------
// Messages and tasks
// ---------------------------------------------------------------------------

/// One part of a message or artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Part {
    Text {
        text: String,
    },
    Data {
        data: Value,
    },
    File {
        file: Value,
    },
}

/// Extract the structured payload carried by a list of parts.
///
/// The first data part wins; otherwise text parts are joined. Text that is
/// itself a JSON document is decoded so that agents answering in text can
/// still satisfy an object result schema.
pub fn payload_of(parts: &[Part]) -> Option<Value> {
    if let Some(data) = parts.iter().find_map(|p| match p {
        Part::Data { data } => Some(data.clone()),
        _ => None,
    }) {
        return Some(data);
    }

    let texts: Vec<&str> = parts
        .iter()
        .filter_map(|p| match p {
            Part::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    if texts.is_empty() {
        return None;
    }
    let joined = texts.concat();
    Some(serde_json::from_str(joined.trim()).unwrap_or(Value::String(joined)))
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// A message in the A2A protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub parts: Vec<Part>,
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl Message {
    /// Text content of the message, if any.
    pub fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        (!texts.is_empty()).then(|| texts.join(" "))
    }

    /// Skill this message targets, read from its metadata.
    pub fn skill_id(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(SKILL_ID_METADATA_KEY))
            .and_then(Value::as_str)
    }
}

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    Submitted,
    Working,
    InputRequired,
    Completed,
    Canceled,
    Failed,
    Rejected,
    AuthRequired,
    Unknown,
}

impl TaskState {
    /// Whether the remote agent will not make further progress on its own.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Submitted | Self::Working | Self::Unknown)
    }
}

/// Status of an A2A task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Output produced by a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub artifact_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub parts: Vec<Part>,
}

/// An A2A task as returned by the protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<Message>,
}

impl Task {
    /// Payload of the most recent artifact that carries one.
    pub fn payload(&self) -> Option<Value> {
        self.artifacts.iter().rev().find_map(|a| payload_of(&a.parts))
    }
}

/// Streaming notification that a task changed state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusUpdateEvent {
    pub task_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    pub status: TaskStatus,
    /// Set on the last event of the stream.
    #[serde(default, rename = "final")]
    pub is_final: bool,
}

/// Streaming notification carrying (part of) an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskArtifactUpdateEvent {
    pub task_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    pub artifact: Artifact,
    #[serde(default)]
    pub append: bool,
    #[serde(default)]
    pub last_chunk: bool,
}

/// Result of `message/send`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SendMessageResult {
    Task(Task),
    Message(Message),
}

/// One event of a `message/stream` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StreamEvent {
    Task(Task),
    Message(Message),
    StatusUpdate(TaskStatusUpdateEvent),
    ArtifactUpdate(TaskArtifactUpdateEvent),
}

/// Parameters of `message/send` and `message/stream`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSendParams {
    pub message: Message,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

// ---------------------------------------------------------------------------
// JSON-RPC envelopes
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl JsonRpcRequest {
    pub fn new(id: impl Into<String>, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Value::String(id.into()),
            method: method.to_string(),
            params,
        }
    }
}

/// A JSON-RPC 2.0 response: exactly one of `result` / `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<super::errors::A2AError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: super::errors::A2AError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Whether the envelope is structurally a JSON-RPC 2.0 response.
    pub fn is_well_formed(&self) -> bool {
        self.jsonrpc == "2.0" && (self.result.is_some() != self.error.is_some())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_agent_card_parses_skill_schemas() {
        let card: AgentCard = serde_json::from_value(json!({
            "name": "currency_agent",
            "url": "http://localhost:8001",
            "protocolVersion": "0.3.0",
            "capabilities": {"streaming": true},
            "skills": [{
                "id": "convertCurrency",
                "name": "Convert currency",
                "inputSchema": {"type": "object"},
                "outputSchema": {"type": "object"}
            }]
        }))
        .unwrap();

        assert!(card.capabilities.streaming);
        assert_eq!(card.skills[0].id.as_deref(), Some("convertCurrency"));
        assert_eq!(card.skills[0].input_schema, Some(json!({"type": "object"})));
    }

    #[test]
    fn test_skill_without_id_still_parses() {
        let skill: AgentSkill = serde_json::from_value(json!({"name": "nameless"})).unwrap();
        assert!(skill.id.is_none());
    }

    #[test]
    fn test_task_state_wire_names() {
        assert_eq!(
            serde_json::to_value(TaskState::InputRequired).unwrap(),
            json!("input-required")
        );
        assert!(TaskState::Failed.is_terminal());
        assert!(!TaskState::Working.is_terminal());
    }

    #[test]
    fn test_send_result_discriminates_on_kind() {
        let result: SendMessageResult = serde_json::from_value(json!({
            "kind": "task",
            "id": "t1",
            "status": {"state": "completed"},
            "artifacts": [{"artifactId": "a1", "parts": [{"kind": "data", "data": {"x": 1}}]}]
        }))
        .unwrap();
        match result {
            SendMessageResult::Task(task) => assert_eq!(task.payload(), Some(json!({"x": 1}))),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_stream_event_kinds() {
        let event: StreamEvent = serde_json::from_value(json!({
            "kind": "status-update",
            "taskId": "t1",
            "status": {"state": "completed"},
            "final": true
        }))
        .unwrap();
        assert!(matches!(event, StreamEvent::StatusUpdate(ref e) if e.is_final));
    }

    #[test]
    fn test_payload_prefers_data_then_decodes_json_text() {
        let parts = vec![
            Part::Text { text: "ignored".into() },
            Part::Data { data: json!({"a": 1}) },
        ];
        assert_eq!(payload_of(&parts), Some(json!({"a": 1})));

        let text_json = vec![Part::Text { text: "{\"a\": 2}".into() }];
        assert_eq!(payload_of(&text_json), Some(json!({"a": 2})));

        let plain = vec![Part::Text { text: "hello".into() }];
        assert_eq!(payload_of(&plain), Some(json!("hello")));

        assert_eq!(payload_of(&[]), None);
    }

    #[test]
    fn test_response_well_formedness() {
        let ok = JsonRpcResponse::success(json!("1"), json!({}));
        assert!(ok.is_well_formed());

        let both = JsonRpcResponse {
            jsonrpc: "2.0".into(),
            id: json!("1"),
            result: Some(json!({})),
            error: Some(crate::a2a::errors::A2AError::from_code(
                crate::a2a::errors::A2AErrorCode::InternalError,
            )),
        };
        assert!(!both.is_well_formed());
    }
}
