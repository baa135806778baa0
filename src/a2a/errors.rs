//! A2A error codes, JSON-RPC error objects and transport errors.
//!
//! Error codes follow JSON-RPC 2.0 conventions:
//! - -32700 to -32600: Standard JSON-RPC errors
//! - -32099 to -32000: Server errors (A2A-specific)

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A2A protocol error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum A2AErrorCode {
    // JSON-RPC 2.0 Standard Errors
    /// Invalid JSON was received by the server.
    JsonParseError = -32700,
    /// The JSON sent is not a valid Request object.
    InvalidRequest = -32600,
    /// The method does not exist / is not available.
    MethodNotFound = -32601,
    /// Invalid method parameter(s).
    InvalidParams = -32602,
    /// Internal JSON-RPC error.
    InternalError = -32603,

    // A2A-Specific Errors
    /// The requested operation is not supported.
    UnsupportedOperation = -32004,
    /// Incompatible content types.
    ContentTypeNotSupported = -32005,
    /// The agent produced an invalid response.
    InvalidAgentResponse = -32006,
    /// The requested A2A protocol version is not supported.
    UnsupportedVersion = -32009,
    /// The specified skill was not found.
    SkillNotFound = -32017,
}

impl A2AErrorCode {
    /// Get the default error message for this code.
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::JsonParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
            Self::UnsupportedOperation => "This operation is not supported",
            Self::ContentTypeNotSupported => "Incompatible content types",
            Self::InvalidAgentResponse => "Invalid agent response",
            Self::UnsupportedVersion => "Unsupported A2A version",
            Self::SkillNotFound => "Skill not found",
        }
    }
}

/// A JSON-RPC error object as carried in an A2A response.
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
pub struct A2AError {
    /// The A2A/JSON-RPC error code.
    pub code: i32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional error data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl fmt::Display for A2AError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl A2AError {
    /// Create a new `A2AError` from an error code with default message.
    pub fn from_code(code: A2AErrorCode) -> Self {
        Self {
            code: code as i32,
            message: code.default_message().to_string(),
            data: None,
        }
    }

    /// Create a new `A2AError` with a custom message.
    pub fn new(code: A2AErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code as i32,
            message: message.into(),
            data: None,
        }
    }

    /// Create with additional data.
    pub fn with_data(code: A2AErrorCode, message: impl Into<String>, data: Value) -> Self {
        Self {
            code: code as i32,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Convert to full JSON-RPC error response.
    pub fn to_response(&self, request_id: Option<Value>) -> Value {
        serde_json::json!({
            "jsonrpc": "2.0",
            "error": self,
            "id": request_id.unwrap_or(Value::Null),
        })
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Failure of a single exchange with a remote agent, below the protocol level.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("request to {url} timed out after {elapsed:?}")]
    Timeout { url: String, elapsed: Duration },

    #[error("HTTP {status} from {url}: {body}")]
    Http { url: String, status: u16, body: String },

    #[error("malformed response from {url}: {reason}")]
    Malformed { url: String, reason: String },

    #[error("could not apply credentials: {0}")]
    Auth(String),

    #[error("request cancelled")]
    Cancelled,
}

impl TransportError {
    /// Whether repeating the same request may succeed.
    ///
    /// HTTP 4xx rejections other than 408/429 are final answers from the
    /// remote side.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connect { .. } | Self::Timeout { .. } | Self::Malformed { .. } => true,
            Self::Http { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            Self::Auth(_) | Self::Cancelled => false,
        }
    }

    /// Build from a `reqwest` error raised while sending or reading a body.
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Malformed {
                url: url.to_string(),
                reason: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            Self::Http {
                url: url.to_string(),
                status: status.as_u16(),
                body: String::new(),
            }
        } else {
            Self::Connect {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }

    pub(crate) fn malformed(url: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
