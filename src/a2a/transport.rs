//! Single-attempt A2A exchanges over HTTP.
//!
//! A transport performs exactly one network exchange per call and reports
//! what happened. Deadlines, retries and cancellation live one level up in
//! [`TransportClient`](crate::a2a::client::TransportClient), which is what
//! lets tests count attempts with a stub transport.

use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::stream::{self, Stream, StreamExt};

use crate::a2a::config::RemoteAgentEndpoint;
use crate::a2a::errors::TransportError;
use crate::a2a::types::{AgentCard, JsonRpcRequest, JsonRpcResponse};

/// JSON-RPC responses carried by one streaming exchange.
pub type RpcEventStream = Pin<Box<dyn Stream<Item = Result<JsonRpcResponse, TransportError>> + Send>>;

/// Header carrying the protocol version the client speaks.
pub const VERSION_HEADER: &str = "A2A-Version";

/// Longest error body kept in a [`TransportError::Http`].
const MAX_ERROR_BODY: usize = 512;

// ---------------------------------------------------------------------------
// A2ATransport trait
// ---------------------------------------------------------------------------

/// One network exchange with a remote agent.
#[async_trait]
pub trait A2ATransport: Send + Sync {
    /// `GET` the agent card.
    async fn fetch_agent_card(
        &self,
        endpoint: &RemoteAgentEndpoint,
    ) -> Result<AgentCard, TransportError>;

    /// `POST` a JSON-RPC request and read the single response.
    ///
    /// A well-formed JSON-RPC error response is `Ok`; it is the remote
    /// agent's answer, not a transport fault.
    async fn send(
        &self,
        endpoint: &RemoteAgentEndpoint,
        request: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, TransportError>;

    /// `POST` a JSON-RPC request and open a server-sent event stream of
    /// responses.
    async fn send_streaming(
        &self,
        endpoint: &RemoteAgentEndpoint,
        request: &JsonRpcRequest,
    ) -> Result<RpcEventStream, TransportError>;
}

// ---------------------------------------------------------------------------
// HttpTransport
// ---------------------------------------------------------------------------

/// [`A2ATransport`] over a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("a2a-bridge/", env!("CARGO_PKG_VERSION")))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| TransportError::Connect {
                url: String::new(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }

    /// Use an existing client, sharing its connection pool.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn headers(
        &self,
        endpoint: &RemoteAgentEndpoint,
    ) -> Result<HashMap<String, String>, TransportError> {
        let mut headers = HashMap::new();
        headers.insert(VERSION_HEADER.to_string(), endpoint.protocol_version.clone());
        if let Some(ref auth) = endpoint.auth {
            auth.scheme()
                .apply_auth(&mut headers)
                .await
                .map_err(|e| TransportError::Auth(e.to_string()))?;
        }
        Ok(headers)
    }

    async fn post(
        &self,
        endpoint: &RemoteAgentEndpoint,
        request: &JsonRpcRequest,
        accept: &str,
    ) -> Result<reqwest::Response, TransportError> {
        let url = endpoint.rpc_url();
        let mut req = self
            .client
            .post(&url)
            .header("Accept", accept)
            .json(request);
        for (k, v) in self.headers(endpoint).await? {
            req = req.header(k.as_str(), v.as_str());
        }
        req.send()
            .await
            .map_err(|e| TransportError::from_reqwest(&url, e))
    }
}

#[async_trait]
impl A2ATransport for HttpTransport {
    async fn fetch_agent_card(
        &self,
        endpoint: &RemoteAgentEndpoint,
    ) -> Result<AgentCard, TransportError> {
        let url = endpoint.card_url();
        log::debug!("Fetching agent card: url='{}'", url);

        let mut req = self.client.get(&url).header("Accept", "application/json");
        for (k, v) in self.headers(endpoint).await? {
            req = req.header(k.as_str(), v.as_str());
        }
        let resp = req
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&url, e))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(&url, e))?;
        if !status.is_success() {
            return Err(http_error(&url, status, &body));
        }
        serde_json::from_str(&body).map_err(|e| TransportError::malformed(&url, e.to_string()))
    }

    async fn send(
        &self,
        endpoint: &RemoteAgentEndpoint,
        request: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, TransportError> {
        let url = endpoint.rpc_url();
        log::debug!(
            "Sending A2A request: method='{}', id={}, url='{}'",
            request.method,
            request.id,
            url
        );

        let resp = self.post(endpoint, request, "application/json").await?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(&url, e))?;
        decode_response(&url, status, &body)
    }

    async fn send_streaming(
        &self,
        endpoint: &RemoteAgentEndpoint,
        request: &JsonRpcRequest,
    ) -> Result<RpcEventStream, TransportError> {
        let url = endpoint.rpc_url();
        log::debug!(
            "Opening A2A stream: method='{}', id={}, url='{}'",
            request.method,
            request.id,
            url
        );

        let resp = self
            .post(endpoint, request, "text/event-stream, application/json")
            .await?;
        let status = resp.status();
        let is_event_stream = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        if !status.is_success() || !is_event_stream {
            // Rejections and non-streaming agents answer with one plain body.
            let body = resp
                .text()
                .await
                .map_err(|e| TransportError::from_reqwest(&url, e))?;
            let single = decode_response(&url, status, &body)?;
            return Ok(stream::once(async move { Ok(single) }).boxed());
        }

        let events = resp.bytes_stream().eventsource().filter_map(move |event| {
            let url = url.clone();
            async move {
                match event {
                    Ok(event) if event.data.trim().is_empty() => None,
                    Ok(event) => Some(
                        serde_json::from_str::<JsonRpcResponse>(&event.data)
                            .map_err(|e| TransportError::malformed(&url, e.to_string())),
                    ),
                    Err(e) => Some(Err(TransportError::Connect {
                        url,
                        reason: format!("event stream interrupted: {}", e),
                    })),
                }
            }
        });
        Ok(events.boxed())
    }
}

/// Interpret an HTTP response body as a JSON-RPC response.
fn decode_response(
    url: &str,
    status: reqwest::StatusCode,
    body: &str,
) -> Result<JsonRpcResponse, TransportError> {
    match serde_json::from_str::<JsonRpcResponse>(body) {
        Ok(resp) if resp.is_well_formed() && (status.is_success() || resp.error.is_some()) => {
            Ok(resp)
        }
        _ if !status.is_success() => Err(http_error(url, status, body)),
        Ok(_) => Err(TransportError::malformed(
            url,
            "response is not a JSON-RPC 2.0 result or error",
        )),
        Err(e) => Err(TransportError::malformed(url, e.to_string())),
    }
}

fn http_error(url: &str, status: reqwest::StatusCode, body: &str) -> TransportError {
    let mut body = body.trim().to_string();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    TransportError::Http {
        url: url.to_string(),
        status: status.as_u16(),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    const URL: &str = "http://agent/a2a";

    #[test]
    fn test_decode_success() {
        let resp = decode_response(
            URL,
            StatusCode::OK,
            r#"{"jsonrpc":"2.0","id":"1","result":{"kind":"message"}}"#,
        )
        .unwrap();
        assert!(resp.result.is_some());
    }

    #[test]
    fn test_decode_error_response_on_4xx_is_ok() {
        let resp = decode_response(
            URL,
            StatusCode::BAD_REQUEST,
            r#"{"jsonrpc":"2.0","id":"1","error":{"code":-32602,"message":"Invalid params"}}"#,
        )
        .unwrap();
        assert_eq!(resp.error.unwrap().code, -32602);
    }

    #[test]
    fn test_decode_plain_5xx_is_http_error() {
        let err = decode_response(URL, StatusCode::BAD_GATEWAY, "upstream down").unwrap_err();
        assert!(matches!(err, TransportError::Http { status: 502, .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_decode_garbage_is_malformed() {
        let err = decode_response(URL, StatusCode::OK, "<html>").unwrap_err();
        assert!(matches!(err, TransportError::Malformed { .. }));

        let neither = decode_response(URL, StatusCode::OK, r#"{"jsonrpc":"2.0","id":"1"}"#)
            .unwrap_err();
        assert!(matches!(neither, TransportError::Malformed { .. }));
    }

    #[test]
    fn test_http_error_body_is_truncated() {
        let long = "é".repeat(MAX_ERROR_BODY);
        match http_error(URL, StatusCode::INTERNAL_SERVER_ERROR, &long) {
            TransportError::Http { body, .. } => assert!(body.len() <= MAX_ERROR_BODY),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
