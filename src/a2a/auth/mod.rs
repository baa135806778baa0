//! Authentication schemes for A2A protocol clients.
//!
//! Supported authentication methods:
//! - Bearer tokens
//! - API keys (header or cookie)
//! - HTTP Basic authentication

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Credentials could not be applied to an outgoing request.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{scheme} credential is empty")]
    EmptyCredential { scheme: &'static str },
}

// ---------------------------------------------------------------------------
// ClientAuthScheme trait
// ---------------------------------------------------------------------------

/// Base trait for client-side authentication schemes.
///
/// Client auth schemes apply credentials to outgoing requests.
#[async_trait]
pub trait ClientAuthScheme: Send + Sync + std::fmt::Debug {
    /// Apply authentication to request headers.
    async fn apply_auth(&self, headers: &mut HashMap<String, String>) -> Result<(), AuthError>;
}

// ---------------------------------------------------------------------------
// Implementations
// ---------------------------------------------------------------------------

/// Bearer token authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BearerTokenAuth {
    pub token: String,
}

#[async_trait]
impl ClientAuthScheme for BearerTokenAuth {
    async fn apply_auth(&self, headers: &mut HashMap<String, String>) -> Result<(), AuthError> {
        if self.token.is_empty() {
            return Err(AuthError::EmptyCredential { scheme: "bearer" });
        }
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.token),
        );
        Ok(())
    }
}

/// HTTP Basic authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HTTPBasicAuth {
    pub username: String,
    pub password: String,
}

#[async_trait]
impl ClientAuthScheme for HTTPBasicAuth {
    async fn apply_auth(&self, headers: &mut HashMap<String, String>) -> Result<(), AuthError> {
        use base64::Engine;
        if self.username.is_empty() {
            return Err(AuthError::EmptyCredential { scheme: "basic" });
        }
        let credentials = format!("{}:{}", self.username, self.password);
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes());
        headers.insert("Authorization".to_string(), format!("Basic {}", encoded));
        Ok(())
    }
}

/// Where to send the API key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum APIKeyLocation {
    #[default]
    Header,
    Cookie,
}

/// API Key authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct APIKeyAuth {
    pub api_key: String,
    #[serde(default)]
    pub location: APIKeyLocation,
    #[serde(default = "default_api_key_name")]
    pub name: String,
}

fn default_api_key_name() -> String { "X-API-Key".to_string() }

#[async_trait]
impl ClientAuthScheme for APIKeyAuth {
    async fn apply_auth(&self, headers: &mut HashMap<String, String>) -> Result<(), AuthError> {
        if self.api_key.is_empty() {
            return Err(AuthError::EmptyCredential { scheme: "api_key" });
        }
        match self.location {
            APIKeyLocation::Header => {
                headers.insert(self.name.clone(), self.api_key.clone());
            }
            APIKeyLocation::Cookie => {
                headers.insert(
                    "Cookie".to_string(),
                    format!("{}={}", self.name, self.api_key),
                );
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Authentication settings of a remote agent endpoint, as written in config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    Bearer(BearerTokenAuth),
    Basic(HTTPBasicAuth),
    ApiKey(APIKeyAuth),
}

impl AuthConfig {
    /// Build the scheme that applies these credentials.
    pub fn scheme(&self) -> Arc<dyn ClientAuthScheme> {
        match self {
            Self::Bearer(auth) => Arc::new(auth.clone()),
            Self::Basic(auth) => Arc::new(auth.clone()),
            Self::ApiKey(auth) => Arc::new(auth.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
