//! Currency agent: converts amounts using a static rate table.
//!
//! Hosted remotely (see the `currency-agent` binary) and consumed by the
//! travel assistant through the bridge.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use once_cell::sync::Lazy;
use serde_json::{json, Map, Value};

use super::DemoHostError;
use crate::capabilities::descriptor::{CapabilityDescriptor, DescriptorError};
use crate::server::host::{AgentHost, HostError, HostedCapability};

/// Simulated exchange rates, keyed by (from, to).
static EXCHANGE_RATES: Lazy<HashMap<(&'static str, &'static str), f64>> = Lazy::new(|| {
    HashMap::from([
        (("USD", "EUR"), 0.92),
        (("USD", "GBP"), 0.79),
        (("USD", "JPY"), 149.50),
        (("USD", "CAD"), 1.36),
        (("USD", "AUD"), 1.53),
        (("USD", "INR"), 83.12),
        (("USD", "CHF"), 0.88),
        (("USD", "CNY"), 7.24),
        (("USD", "MXN"), 17.15),
        (("USD", "BRL"), 4.97),
        (("EUR", "USD"), 1.09),
        (("EUR", "GBP"), 0.86),
        (("EUR", "JPY"), 162.85),
        (("GBP", "USD"), 1.27),
        (("GBP", "EUR"), 1.16),
        (("JPY", "USD"), 0.0067),
        (("INR", "USD"), 0.012),
    ])
});

static CURRENCY_NAMES: Lazy<BTreeMap<&'static str, &'static str>> = Lazy::new(|| {
    BTreeMap::from([
        ("USD", "US Dollar"),
        ("EUR", "Euro"),
        ("GBP", "British Pound"),
        ("JPY", "Japanese Yen"),
        ("CAD", "Canadian Dollar"),
        ("AUD", "Australian Dollar"),
        ("INR", "Indian Rupee"),
        ("CHF", "Swiss Franc"),
        ("CNY", "Chinese Yuan"),
        ("MXN", "Mexican Peso"),
        ("BRL", "Brazilian Real"),
    ])
});

/// How a rate was obtained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Quote {
    Identity,
    Direct(f64),
    ViaUsd(f64),
}

impl Quote {
    pub fn rate(self) -> f64 {
        match self {
            Self::Identity => 1.0,
            Self::Direct(rate) | Self::ViaUsd(rate) => rate,
        }
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Look up the rate for converting `from` into `to`.
///
/// Falls back to a cross rate through USD when no direct rate exists.
pub fn quote(from: &str, to: &str) -> Option<Quote> {
    if from == to {
        return Some(Quote::Identity);
    }
    if let Some(&rate) = EXCHANGE_RATES.get(&(from, to)) {
        return Some(Quote::Direct(rate));
    }
    if from != "USD" && to != "USD" {
        let to_usd = EXCHANGE_RATES.get(&(from, "USD"))?;
        let from_usd = EXCHANGE_RATES.get(&("USD", to))?;
        return Some(Quote::ViaUsd(round_to(to_usd * from_usd, 4)));
    }
    None
}

/// Convert `amount`, rounded to cents.
pub fn convert(amount: f64, from: &str, to: &str) -> Option<(f64, Quote)> {
    let quote = quote(from, to)?;
    let converted = match quote {
        Quote::Identity => amount,
        Quote::Direct(rate) => round_to(amount * rate, 2),
        // Unrounded cross rate for the conversion itself.
        Quote::ViaUsd(_) => {
            let to_usd = EXCHANGE_RATES.get(&(from, "USD"))?;
            let from_usd = EXCHANGE_RATES.get(&("USD", to))?;
            round_to(amount * to_usd * from_usd, 2)
        }
    };
    Some((converted, quote))
}

/// Every currency appearing in the rate table, sorted by code.
pub fn supported_currencies() -> Vec<(&'static str, &'static str)> {
    let codes: BTreeSet<&'static str> = EXCHANGE_RATES
        .keys()
        .flat_map(|&(from, to)| [from, to])
        .collect();
    codes
        .into_iter()
        .map(|code| (code, CURRENCY_NAMES.get(code).copied().unwrap_or(code)))
        .collect()
}

// ---------------------------------------------------------------------------
// Hosted capabilities
// ---------------------------------------------------------------------------

fn currency_code(args: &Map<String, Value>, key: &str) -> Result<String, HostError> {
    args.get(key)
        .and_then(Value::as_str)
        .map(|code| code.trim().to_uppercase())
        .ok_or_else(|| HostError::InvalidArguments(format!("'{}' must be a currency code", key)))
}

fn unavailable(from: &str, to: &str) -> HostError {
    HostError::Failed(format!("Exchange rate not available for {} to {}", from, to))
}

fn convert_currency(args: &Map<String, Value>) -> Result<Value, HostError> {
    let amount = args
        .get("amount")
        .and_then(Value::as_f64)
        .ok_or_else(|| HostError::InvalidArguments("'amount' must be a number".into()))?;
    let from = currency_code(args, "from")?;
    let to = currency_code(args, "to")?;
    let (converted, quote) = convert(amount, &from, &to).ok_or_else(|| unavailable(&from, &to))?;
    let via = if matches!(quote, Quote::ViaUsd(_)) { " (via USD)" } else { "" };
    Ok(json!({
        "amount": converted,
        "currency": to,
        "exchangeRate": quote.rate(),
        "message": format!("{} {} = {} {}{}", amount, from, converted, to, via),
    }))
}

fn get_exchange_rate(args: &Map<String, Value>) -> Result<Value, HostError> {
    let from = currency_code(args, "from")?;
    let to = currency_code(args, "to")?;
    // Only identity and direct rates are quoted here.
    let rate = match quote(&from, &to) {
        Some(q @ (Quote::Identity | Quote::Direct(_))) => q.rate(),
        _ => return Err(unavailable(&from, &to)),
    };
    Ok(json!({ "rate": rate, "from": from, "to": to }))
}

fn list_supported_currencies(_args: &Map<String, Value>) -> Result<Value, HostError> {
    let currencies: Vec<Value> = supported_currencies()
        .into_iter()
        .map(|(code, name)| json!({ "code": code, "name": name }))
        .collect();
    Ok(json!({ "currencies": currencies }))
}

/// Descriptors of the currency agent's capabilities.
pub fn descriptors() -> Result<Vec<CapabilityDescriptor>, DescriptorError> {
    let pair = json!({
        "from": {"type": "string", "minLength": 3, "maxLength": 3},
        "to": {"type": "string", "minLength": 3, "maxLength": 3}
    });
    let mut convert_props = pair.clone();
    convert_props["amount"] = json!({"type": "number", "minimum": 0});

    Ok(vec![
        CapabilityDescriptor::new(
            "convertCurrency",
            json!({
                "type": "object",
                "properties": convert_props,
                "required": ["amount", "from", "to"],
                "additionalProperties": false
            }),
            json!({
                "type": "object",
                "properties": {
                    "amount": {"type": "number"},
                    "currency": {"type": "string"},
                    "exchangeRate": {"type": "number"},
                    "message": {"type": "string"}
                },
                "required": ["amount", "currency"]
            }),
        )?
        .with_description("Convert an amount from one currency to another")
        .with_tags(vec!["currency".into(), "conversion".into()]),
        CapabilityDescriptor::new(
            "getExchangeRate",
            json!({
                "type": "object",
                "properties": pair,
                "required": ["from", "to"],
                "additionalProperties": false
            }),
            json!({
                "type": "object",
                "properties": {
                    "rate": {"type": "number"},
                    "from": {"type": "string"},
                    "to": {"type": "string"}
                },
                "required": ["rate", "from", "to"]
            }),
        )?
        .with_description("Get the exchange rate between two currencies")
        .with_tags(vec!["currency".into()]),
        CapabilityDescriptor::new(
            "listSupportedCurrencies",
            json!({"type": "object", "properties": {}}),
            json!({
                "type": "object",
                "properties": {
                    "currencies": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "code": {"type": "string"},
                                "name": {"type": "string"}
                            },
                            "required": ["code", "name"]
                        }
                    }
                },
                "required": ["currencies"]
            }),
        )?
        .with_description("List all supported currencies for conversion"),
    ])
}

/// The currency agent, ready to be served.
pub fn currency_host() -> Result<AgentHost, DemoHostError> {
    let mut host = AgentHost::new(
        "currency_agent",
        "A currency conversion agent that can convert amounts between different currencies \
         and provide exchange rate information.",
    );
    for descriptor in descriptors()? {
        let handler = match descriptor.name.as_str() {
            "convertCurrency" => convert_currency,
            "getExchangeRate" => get_exchange_rate,
            _ => list_supported_currencies,
        };
        host.add_capability(HostedCapability::from_fn(descriptor, handler))?;
    }
    Ok(host)
}
