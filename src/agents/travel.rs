//! Travel assistant: local tools for destination info and trip budgets.

use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::capabilities::schema::SchemaError;
use crate::tools::base_tool::{LocalTool, ToolError};

/// What the assistant knows about a destination.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    #[serde(skip)]
    pub key: &'static str,
    pub country: &'static str,
    pub currency: &'static str,
    pub language: &'static str,
    pub timezone: &'static str,
    pub best_time: &'static str,
    pub attractions: [&'static str; 4],
    /// USD.
    pub avg_daily_budget: u32,
    pub avg_temp_f: u32,
    pub description: &'static str,
}

static DESTINATIONS: Lazy<Vec<Destination>> = Lazy::new(|| {
    vec![
        Destination {
            key: "paris",
            country: "France",
            currency: "EUR",
            language: "French",
            timezone: "CET (UTC+1)",
            best_time: "April to June, September to November",
            attractions: ["Eiffel Tower", "Louvre Museum", "Notre-Dame", "Champs-Élysées"],
            avg_daily_budget: 150,
            avg_temp_f: 55,
            description: "The City of Light, known for its art, fashion, gastronomy, and culture.",
        },
        Destination {
            key: "tokyo",
            country: "Japan",
            currency: "JPY",
            language: "Japanese",
            timezone: "JST (UTC+9)",
            best_time: "March to May, September to November",
            attractions: ["Tokyo Tower", "Senso-ji Temple", "Shibuya Crossing", "Mount Fuji day trip"],
            avg_daily_budget: 120,
            avg_temp_f: 60,
            description: "A fascinating blend of ultra-modern and traditional, with endless entertainment options.",
        },
        Destination {
            key: "london",
            country: "United Kingdom",
            currency: "GBP",
            language: "English",
            timezone: "GMT (UTC+0)",
            best_time: "May to September",
            attractions: ["Big Ben", "Tower of London", "British Museum", "Buckingham Palace"],
            avg_daily_budget: 180,
            avg_temp_f: 55,
            description: "A vibrant city rich in history, culture, and diverse neighborhoods.",
        },
        Destination {
            key: "new york",
            country: "United States",
            currency: "USD",
            language: "English",
            timezone: "EST (UTC-5)",
            best_time: "April to June, September to November",
            attractions: ["Statue of Liberty", "Central Park", "Times Square", "Empire State Building"],
            avg_daily_budget: 200,
            avg_temp_f: 55,
            description: "The city that never sleeps, offering world-class dining, shopping, and entertainment.",
        },
        Destination {
            key: "sydney",
            country: "Australia",
            currency: "AUD",
            language: "English",
            timezone: "AEST (UTC+10)",
            best_time: "September to November, March to May",
            attractions: ["Sydney Opera House", "Harbour Bridge", "Bondi Beach", "Taronga Zoo"],
            avg_daily_budget: 160,
            avg_temp_f: 65,
            description: "A stunning harbor city with beautiful beaches, iconic architecture, and laid-back vibes.",
        },
        Destination {
            key: "mumbai",
            country: "India",
            currency: "INR",
            language: "Hindi, English",
            timezone: "IST (UTC+5:30)",
            best_time: "November to February",
            attractions: ["Gateway of India", "Marine Drive", "Elephanta Caves", "Bollywood Studios"],
            avg_daily_budget: 50,
            avg_temp_f: 81,
            description: "India's financial capital, a city of dreams with rich cultural diversity.",
        },
    ]
});

/// Case- and whitespace-insensitive lookup.
pub fn find_destination(name: &str) -> Option<&'static Destination> {
    let key = name.trim().to_lowercase();
    DESTINATIONS.iter().find(|d| d.key == key)
}

/// "new york" -> "New York".
pub(crate) fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn destination_arg(args: &Map<String, Value>) -> Result<&'static Destination, ToolError> {
    let name = args
        .get("destination")
        .and_then(Value::as_str)
        .ok_or("destination is required")?;
    find_destination(name).ok_or_else(|| {
        let available: Vec<String> = DESTINATIONS.iter().map(|d| title_case(d.key)).collect();
        format!(
            "Destination '{}' not found. Available destinations: {}",
            name,
            available.join(", ")
        )
        .into()
    })
}

/// Items for every trip.
const BASE_PACKING: [&str; 4] = ["Passport", "Phone charger", "Medications", "Travel insurance docs"];

fn destination_packing(key: &str) -> &'static [&'static str] {
    match key {
        "new york" => &["Walking shoes", "Layers for variable weather", "Metro card money"],
        "london" => &["Umbrella", "Rain jacket", "Adapter plug (UK)"],
        "tokyo" => &[
            "Comfortable walking shoes",
            "Pocket WiFi reservation",
            "Cash (many places don't accept cards)",
        ],
        "paris" => &["Stylish casual clothes", "Good walking shoes", "French phrasebook"],
        "sydney" => &["Sunscreen", "Swimwear", "Hat and sunglasses"],
        "mumbai" => &["Light cotton clothing", "Compact umbrella", "Mosquito repellent"],
        _ => &[],
    }
}

const TRIP_TYPES: [&str; 3] = ["vacation", "business", "adventure"];

fn trip_type_packing(trip_type: &str) -> &'static [&'static str] {
    match trip_type {
        "vacation" => &["Camera", "Guidebook", "Snacks for the flight"],
        "business" => &["Business cards", "Laptop", "Formal attire"],
        "adventure" => &["First aid kit", "Water bottle", "Hiking boots"],
        _ => &[],
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Tool functions
// ---------------------------------------------------------------------------

fn get_destination_info(args: &Map<String, Value>) -> Result<Value, ToolError> {
    let destination = destination_arg(args)?;
    let mut info = serde_json::to_value(destination)?;
    if let Value::Object(map) = &mut info {
        map.insert("destination".into(), json!(title_case(destination.key)));
    }
    Ok(info)
}

fn calculate_trip_budget(args: &Map<String, Value>) -> Result<Value, ToolError> {
    let destination = destination_arg(args)?;
    let days = args
        .get("days")
        .and_then(Value::as_u64)
        .ok_or("days must be a positive integer")?;
    let daily = f64::from(destination.avg_daily_budget);
    let days_f = days as f64;
    Ok(json!({
        "destination": title_case(destination.key),
        "days": days,
        "localCurrency": destination.currency,
        "budgetUsd": {
            "total": round2(daily * days_f),
            "accommodation": round2(daily * 0.4 * days_f),
            "food": round2(daily * 0.25 * days_f),
            "activities": round2(daily * 0.2 * days_f),
            "localTransport": round2(daily * 0.15 * days_f),
        },
        "dailyAverageUsd": destination.avg_daily_budget,
    }))
}

fn get_packing_suggestions(args: &Map<String, Value>) -> Result<Value, ToolError> {
    let destination = destination_arg(args)?;
    let trip_type = args
        .get("tripType")
        .and_then(Value::as_str)
        .unwrap_or("vacation")
        .to_lowercase();
    let items: Vec<&str> = BASE_PACKING
        .iter()
        .chain(destination_packing(destination.key))
        .chain(trip_type_packing(&trip_type))
        .copied()
        .collect();
    let name = title_case(destination.key);
    Ok(json!({
        "destination": name,
        "tripType": trip_type,
        "packingList": items,
        "message": format!("Packing suggestions for {} trip to {}", trip_type, name),
    }))
}

fn get_best_travel_time(args: &Map<String, Value>) -> Result<Value, ToolError> {
    let destination = destination_arg(args)?;
    let name = title_case(destination.key);
    Ok(json!({
        "destination": name,
        "country": destination.country,
        "bestTime": destination.best_time,
        "averageTemperatureF": destination.avg_temp_f,
        "message": format!("Best time to visit {}: {}", name, destination.best_time),
    }))
}

fn list_destinations(_args: &Map<String, Value>) -> Result<Value, ToolError> {
    let destinations: Vec<Value> = DESTINATIONS
        .iter()
        .map(|d| {
            json!({
                "name": title_case(d.key),
                "country": d.country,
                "currency": d.currency,
                "dailyBudgetUsd": d.avg_daily_budget,
            })
        })
        .collect();
    Ok(json!({ "destinations": destinations }))
}

/// The travel assistant's local tools.
pub fn travel_tools() -> Result<Vec<LocalTool>, SchemaError> {
    Ok(vec![
        LocalTool::new(
            "getDestinationInfo",
            "Get travel information about a destination",
            Arc::new(get_destination_info),
        )
        .with_args_schema(json!({
            "type": "object",
            "properties": {"destination": {"type": "string", "minLength": 1}},
            "required": ["destination"]
        }))?,
        LocalTool::new(
            "calculateTripBudget",
            "Calculate an estimated trip budget in USD for a destination",
            Arc::new(calculate_trip_budget),
        )
        .with_args_schema(json!({
            "type": "object",
            "properties": {
                "destination": {"type": "string", "minLength": 1},
                "days": {"type": "integer", "minimum": 1}
            },
            "required": ["destination", "days"]
        }))?,
        LocalTool::new(
            "getPackingSuggestions",
            "Suggest what to pack for a destination and trip type",
            Arc::new(get_packing_suggestions),
        )
        .with_args_schema(json!({
            "type": "object",
            "properties": {
                "destination": {"type": "string", "minLength": 1},
                "tripType": {"type": "string", "enum": TRIP_TYPES}
            },
            "required": ["destination"]
        }))?,
        LocalTool::new(
            "getBestTravelTime",
            "Get the best time of year to visit a destination",
            Arc::new(get_best_travel_time),
        )
        .with_args_schema(json!({
            "type": "object",
            "properties": {"destination": {"type": "string", "minLength": 1}},
            "required": ["destination"]
        }))?,
        LocalTool::new(
            "listDestinations",
            "List all available travel destinations",
            Arc::new(list_destinations),
        ),
    ])
}
