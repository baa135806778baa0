//! Travel assistant CLI.
//!
//! Builds one tool registry from the local travel tools and the remote
//! currency (and optionally weather) agent, prints the tool listing, and
//! optionally invokes a tool.
//!
//! # Environment Variables
//!
//! - `A2A_BRIDGE_CONFIG` — YAML file listing remote agents; overrides the variables below
//! - `CURRENCY_AGENT_URL` — Currency agent base URL (default: `http://localhost:8001`)
//! - `CURRENCY_AGENT_TIMEOUT_SECS`, `CURRENCY_AGENT_RETRY_COUNT`,
//!   `CURRENCY_AGENT_PROTOCOL_VERSION`, `CURRENCY_AGENT_BEARER_TOKEN`
//! - `WEATHER_AGENT_URL` — Weather agent base URL; the agent is skipped when unset
//!   (same optional `WEATHER_AGENT_*` variables as above)
//! - `RUST_LOG` — Tracing filter (default: "info,a2a_bridge=debug")
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin travel-assistant
//! cargo run --bin travel-assistant -- convertCurrency '{"amount": 100, "from": "USD", "to": "EUR"}'
//! cargo run --bin travel-assistant -- --stream convertCurrency '{"amount": 5, "from": "GBP", "to": "EUR"}'
//! WEATHER_AGENT_URL=http://localhost:8002 cargo run --bin travel-assistant -- weather_forecast '{"city": "Tokyo"}'
//! ```

use anyhow::{bail, Context};
use futures::StreamExt;
use serde_json::{Map, Value};

use a2a_bridge::a2a::{BridgeConfig, ConfigError, RemoteAgentEndpoint};
use a2a_bridge::agents::travel_tools;
use a2a_bridge::tools::{InvocationContext, InvocationEvent};
use a2a_bridge::Bridge;

const DEFAULT_CURRENCY_AGENT_URL: &str = "http://localhost:8001";

fn load_config() -> anyhow::Result<BridgeConfig> {
    if let Ok(path) = std::env::var("A2A_BRIDGE_CONFIG") {
        return BridgeConfig::from_file(&path)
            .with_context(|| format!("failed to load bridge config from {}", path));
    }
    let endpoint = match RemoteAgentEndpoint::from_env("CURRENCY_AGENT") {
        Ok(endpoint) => endpoint,
        Err(ConfigError::MissingVar(_)) => {
            RemoteAgentEndpoint::new(DEFAULT_CURRENCY_AGENT_URL).with_name("currency_agent")
        }
        Err(e) => return Err(e).context("invalid currency agent configuration"),
    };
    let mut remote_agents = vec![endpoint.with_streaming(true)];
    match RemoteAgentEndpoint::from_env("WEATHER_AGENT") {
        Ok(weather) => remote_agents.push(weather),
        Err(ConfigError::MissingVar(_)) => {}
        Err(e) => return Err(e).context("invalid weather agent configuration"),
    }
    Ok(BridgeConfig { remote_agents })
}

fn parse_args(raw: Option<String>) -> anyhow::Result<Map<String, Value>> {
    match raw {
        None => Ok(Map::new()),
        Some(raw) => match serde_json::from_str::<Value>(&raw).context("arguments must be JSON")? {
            Value::Object(map) => Ok(map),
            other => bail!("arguments must be a JSON object, got {}", other),
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,a2a_bridge=debug".into()),
        )
        .init();

    let mut cli: Vec<String> = std::env::args().skip(1).collect();
    let stream = match cli.iter().position(|a| a == "--stream") {
        Some(i) => {
            cli.remove(i);
            true
        }
        None => false,
    };
    let mut cli = cli.into_iter();
    let tool_name = cli.next();
    let args = parse_args(cli.next())?;

    let bridge = Bridge::builder()
        .with_local_tools(travel_tools().context("invalid travel tool schema")?)
        .with_config(load_config()?)
        .build()
        .await
        .context("failed to build the tool registry")?;

    let listing = serde_json::to_string_pretty(&bridge.list())?;
    println!("{}", listing);

    let Some(tool_name) = tool_name else {
        return Ok(());
    };
    let ctx = InvocationContext::new().with_context_id(uuid::Uuid::new_v4().to_string());

    let result = if stream {
        let mut events = bridge.invoke_streaming(&tool_name, args, ctx);
        let mut last = None;
        while let Some(event) = events.next().await {
            match event {
                InvocationEvent::Partial(value) => tracing::info!("partial result: {}", value),
                InvocationEvent::Final(result) => last = Some(result),
            }
        }
        match last {
            Some(result) => result,
            None => bail!("stream ended without a result"),
        }
    } else {
        bridge.invoke(&tool_name, args, &ctx).await
    };

    println!("{}", serde_json::to_string_pretty(&result.to_tool_message())?);
    if !result.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
