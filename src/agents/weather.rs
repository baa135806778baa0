//! Weather agent: simulated conditions, forecasts and alerts for a handful
//! of cities.
//!
//! Hosted remotely (see the `weather-agent` binary) next to the currency
//! agent, so the travel assistant can reach more than one remote agent.

use std::collections::HashMap;

use chrono::{Duration, Local};
use once_cell::sync::Lazy;
use serde_json::{json, Map, Value};

use super::DemoHostError;
use crate::capabilities::descriptor::{CapabilityDescriptor, DescriptorError};
use crate::server::host::{AgentHost, HostError, HostedCapability};

/// Current conditions for one city.
#[derive(Debug, Clone, Copy)]
pub struct Conditions {
    pub temperature_f: i64,
    pub condition: &'static str,
    pub humidity: u32,
    pub wind: &'static str,
}

/// Cities in the order they are listed to callers.
static CITIES: Lazy<Vec<(&'static str, Conditions)>> = Lazy::new(|| {
    vec![
        (
            "new york",
            Conditions {
                temperature_f: 72,
                condition: "Partly Cloudy",
                humidity: 65,
                wind: "10 mph NW",
            },
        ),
        (
            "london",
            Conditions {
                temperature_f: 59,
                condition: "Overcast",
                humidity: 80,
                wind: "15 mph SW",
            },
        ),
        (
            "tokyo",
            Conditions {
                temperature_f: 78,
                condition: "Clear",
                humidity: 55,
                wind: "5 mph E",
            },
        ),
        (
            "paris",
            Conditions {
                temperature_f: 68,
                condition: "Sunny",
                humidity: 45,
                wind: "8 mph N",
            },
        ),
        (
            "sydney",
            Conditions {
                temperature_f: 65,
                condition: "Rainy",
                humidity: 90,
                wind: "20 mph SE",
            },
        ),
    ]
});

/// (type, severity, message) per city.
static ALERTS: Lazy<HashMap<&'static str, Vec<(&'static str, &'static str, &'static str)>>> =
    Lazy::new(|| {
        HashMap::from([
            (
                "sydney",
                vec![("Rain Warning", "Moderate", "Heavy rain expected this afternoon")],
            ),
            (
                "london",
                vec![("Wind Advisory", "Low", "Gusty winds possible tonight")],
            ),
        ])
    });

const FORECAST_CONDITIONS: [&str; 5] = ["Sunny", "Partly Cloudy", "Cloudy", "Rainy", "Clear"];

pub const MAX_FORECAST_DAYS: u64 = 7;
const DEFAULT_FORECAST_DAYS: u64 = 3;

/// Case- and whitespace-insensitive lookup.
pub fn conditions(city: &str) -> Option<(&'static str, Conditions)> {
    let key = city.trim().to_lowercase();
    CITIES.iter().find(|(name, _)| *name == key).copied()
}

fn fahrenheit_to_celsius(f: i64) -> f64 {
    ((f - 32) as f64 * 5.0 / 9.0 * 10.0).round() / 10.0
}

fn available_cities() -> String {
    CITIES
        .iter()
        .map(|(name, _)| super::travel::title_case(name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn city_arg(args: &Map<String, Value>) -> Result<(&'static str, Conditions), HostError> {
    let city = args
        .get("city")
        .and_then(Value::as_str)
        .ok_or_else(|| HostError::InvalidArguments("'city' must be a string".into()))?;
    conditions(city).ok_or_else(|| {
        HostError::Failed(format!(
            "Weather data not available for {}. Available cities: {}",
            city,
            available_cities()
        ))
    })
}

// ---------------------------------------------------------------------------
// Hosted capabilities
// ---------------------------------------------------------------------------

fn current_weather(args: &Map<String, Value>) -> Result<Value, HostError> {
    let (key, now) = city_arg(args)?;
    let city = super::travel::title_case(key);
    Ok(json!({
        "city": city,
        "temperatureF": now.temperature_f,
        "temperatureC": fahrenheit_to_celsius(now.temperature_f),
        "condition": now.condition,
        "humidity": format!("{}%", now.humidity),
        "wind": now.wind,
        "timestamp": Local::now().to_rfc3339(),
        "message": format!("Current weather in {}: {}°F, {}", city, now.temperature_f, now.condition),
    }))
}

/// Deterministic per-city offset into the condition cycle.
fn condition_seed(key: &str) -> usize {
    key.bytes().map(usize::from).sum()
}

fn weather_forecast(args: &Map<String, Value>) -> Result<Value, HostError> {
    let (key, now) = city_arg(args)?;
    let days = match args.get("days") {
        None => DEFAULT_FORECAST_DAYS,
        Some(days) => days
            .as_u64()
            .filter(|d| (1..=MAX_FORECAST_DAYS).contains(d))
            .ok_or_else(|| HostError::InvalidArguments("'days' must be between 1 and 7".into()))?,
    };
    let today = Local::now().date_naive();
    let seed = condition_seed(key);
    let forecast: Vec<Value> = (0..days as i64)
        .map(|i| {
            let date = today + Duration::days(i + 1);
            let variation = (i * 3) % 10 - 5;
            json!({
                "date": date.format("%Y-%m-%d").to_string(),
                "day": date.format("%A").to_string(),
                "highF": now.temperature_f + variation + 5,
                "lowF": now.temperature_f + variation - 10,
                "condition": FORECAST_CONDITIONS[(i as usize + seed) % FORECAST_CONDITIONS.len()],
            })
        })
        .collect();
    let city = super::travel::title_case(key);
    Ok(json!({
        "city": city,
        "days": days,
        "forecast": forecast,
        "message": format!("{}-day forecast for {} generated", days, city),
    }))
}

fn weather_alerts(args: &Map<String, Value>) -> Result<Value, HostError> {
    let (key, _) = city_arg(args)?;
    let city = super::travel::title_case(key);
    let alerts: Vec<Value> = ALERTS
        .get(key)
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .map(|(kind, severity, message)| {
            json!({ "type": kind, "severity": severity, "message": message })
        })
        .collect();
    let message = if alerts.is_empty() {
        format!("No active alerts for {}", city)
    } else {
        format!("{} active alert(s) for {}", alerts.len(), city)
    };
    Ok(json!({
        "city": city,
        "alertCount": alerts.len(),
        "alerts": alerts,
        "message": message,
    }))
}

/// Descriptors of the weather agent's capabilities.
pub fn descriptors() -> Result<Vec<CapabilityDescriptor>, DescriptorError> {
    let city = json!({"type": "string", "minLength": 1, "description": "City name"});

    Ok(vec![
        CapabilityDescriptor::new(
            "current_weather",
            json!({
                "type": "object",
                "properties": {"city": city},
                "required": ["city"]
            }),
            json!({
                "type": "object",
                "properties": {
                    "city": {"type": "string"},
                    "temperatureF": {"type": "integer"},
                    "temperatureC": {"type": "number"},
                    "condition": {"type": "string"},
                    "humidity": {"type": "string"},
                    "wind": {"type": "string"},
                    "timestamp": {"type": "string", "format": "date-time"},
                    "message": {"type": "string"}
                },
                "required": ["city", "temperatureF", "condition"]
            }),
        )?
        .with_description(
            "Get current weather conditions for a city including temperature, humidity, and wind",
        )
        .with_tags(vec!["weather".into(), "current".into(), "temperature".into()]),
        CapabilityDescriptor::new(
            "weather_forecast",
            json!({
                "type": "object",
                "properties": {
                    "city": city,
                    "days": {"type": "integer", "minimum": 1, "maximum": MAX_FORECAST_DAYS}
                },
                "required": ["city"]
            }),
            json!({
                "type": "object",
                "properties": {
                    "city": {"type": "string"},
                    "days": {"type": "integer"},
                    "forecast": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "date": {"type": "string"},
                                "day": {"type": "string"},
                                "highF": {"type": "integer"},
                                "lowF": {"type": "integer"},
                                "condition": {"type": "string", "enum": FORECAST_CONDITIONS}
                            },
                            "required": ["date", "highF", "lowF", "condition"]
                        }
                    },
                    "message": {"type": "string"}
                },
                "required": ["city", "forecast"]
            }),
        )?
        .with_description("Get multi-day weather forecast for a city")
        .with_tags(vec!["weather".into(), "forecast".into(), "prediction".into()]),
        CapabilityDescriptor::new(
            "weather_alerts",
            json!({
                "type": "object",
                "properties": {"city": city},
                "required": ["city"]
            }),
            json!({
                "type": "object",
                "properties": {
                    "city": {"type": "string"},
                    "alertCount": {"type": "integer", "minimum": 0},
                    "alerts": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "type": {"type": "string"},
                                "severity": {"type": "string"},
                                "message": {"type": "string"}
                            },
                            "required": ["type", "severity", "message"]
                        }
                    },
                    "message": {"type": "string"}
                },
                "required": ["city", "alerts"]
            }),
        )?
        .with_description("Get active weather alerts and warnings for a city")
        .with_tags(vec!["weather".into(), "alerts".into(), "warnings".into()]),
    ])
}

/// The weather agent, ready to be served.
pub fn weather_host() -> Result<AgentHost, DemoHostError> {
    let mut host = AgentHost::new(
        "weather_agent",
        "A weather information agent that provides current conditions, forecasts, \
         and weather alerts for major cities worldwide.",
    );
    for descriptor in descriptors()? {
        let handler = match descriptor.name.as_str() {
            "current_weather" => current_weather,
            "weather_forecast" => weather_forecast,
            _ => weather_alerts,
        };
        host.add_capability(HostedCapability::from_fn(descriptor, handler))?;
    }
    Ok(host)
}
