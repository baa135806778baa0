//! HTTP host for A2A capabilities.
//!
//! # Endpoints
//!
//! - `GET  /health`                       — Liveness check
//! - `GET  /.well-known/agent-card.json`  — Agent card (path configurable)
//! - `POST /a2a`                          — JSON-RPC `message/send` / `message/stream`

pub mod host;
pub mod routes;

pub use host::{AgentHost, CapabilityHandler, DuplicateCapability, HostError, HostedCapability};
pub use routes::{app_router, AppState};

/// Serve `host` on `bind_addr` until the listener fails.
pub async fn serve(host: AgentHost, bind_addr: &str) -> std::io::Result<()> {
    log::info!("{} starting on {}", host.name, bind_addr);
    log::info!("  GET  /health  — liveness check");
    log::info!("  GET  {}  — agent card", host.card_path);
    log::info!("  POST {}  — message/send, message/stream", host.rpc_path);
    log::info!("Skills: {}", host.capability_names().join(", "));
    log::info!("Agent card: {}{}", host.url.trim_end_matches('/'), host.card_path);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app_router(AppState::new(host))).await
}
