//! Currency agent HTTP server.
//!
//! Hosts the currency agent's capabilities over A2A.
//!
//! # Environment Variables
//!
//! - `PORT` — HTTP port (default: 8001)
//! - `PUBLIC_URL` — Base URL advertised in the agent card (default: `http://localhost:<PORT>`)
//! - `RUST_LOG` — Tracing filter (default: "info,a2a_bridge=debug")
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin currency-agent
//! ```

use anyhow::Context;
use a2a_bridge::agents::currency_host;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,a2a_bridge=debug".into()),
        )
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "8001".to_string());
    let bind_addr = format!("0.0.0.0:{}", port);
    let public_url =
        std::env::var("PUBLIC_URL").unwrap_or_else(|_| format!("http://localhost:{}", port));

    let host = currency_host()
        .context("failed to build the currency agent")?
        .with_url(public_url);

    a2a_bridge::server::serve(host, &bind_addr)
        .await
        .with_context(|| format!("server on {} failed", bind_addr))?;
    Ok(())
}
