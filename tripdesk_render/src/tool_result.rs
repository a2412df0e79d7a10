//! Typed views of tool invocation results.
//!
//! The shape of a result is determined by the tool's name. Unknown names and
//! unexpected shapes degrade to a success banner or a raw JSON dump.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

/// Upper bound on entries listed for a search result.
pub const MAX_LISTED: usize = 5;

const SUCCESS_PHRASE: &str = "Action completed successfully.";
const FAILURE_PHRASE: &str = "Action failed.";

/// Coarse classification of a tool by name, used for labelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    FlightSearch,
    HotelSearch,
    /// Tools that change booking state and report a `success` flag.
    BookingChange,
    Other,
}

impl ToolKind {
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "search_flights" => Self::FlightSearch,
            "search_hotels" => Self::HotelSearch,
            "create_booking" | "update_booking" | "finalize_booking" | "cancel_booking"
            | "add_to_booking" => Self::BookingChange,
            _ => Self::Other,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FlightSearch => "Flight search",
            Self::HotelSearch => "Hotel search",
            Self::BookingChange => "Booking",
            Self::Other => "Tool",
        }
    }

    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::FlightSearch => "✈",
            Self::HotelSearch => "🏨",
            Self::BookingChange => "📋",
            Self::Other => "🔧",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlightSummary {
    pub airline: Option<String>,
    pub flight_number: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub departure: Option<String>,
    pub arrival: Option<String>,
    pub price: Option<String>,
}

impl FlightSummary {
    fn from_object(obj: &Map<String, Value>) -> Self {
        Self {
            airline: field(obj, &["airline", "carrier"]),
            flight_number: field(obj, &["flight_number", "flight", "number"]),
            origin: field(obj, &["origin", "from"]),
            destination: field(obj, &["destination", "to"]),
            departure: field(obj, &["departure", "departure_time", "depart_time"]),
            arrival: field(obj, &["arrival", "arrival_time", "arrive_time"]),
            price: price(obj, &["price", "total_price"]),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HotelSummary {
    pub name: Option<String>,
    pub location: Option<String>,
    pub price: Option<String>,
    pub rating: Option<String>,
}

impl HotelSummary {
    fn from_object(obj: &Map<String, Value>) -> Self {
        Self {
            name: field(obj, &["name", "hotel_name"]),
            location: field(obj, &["location", "city", "address"]),
            price: price(obj, &["price_per_night", "price", "total_price"]),
            rating: field(obj, &["rating", "stars"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RenderedResult {
    /// No result yet; only the invocation itself is shown.
    Empty,
    Flights {
        total: usize,
        shown: Vec<FlightSummary>,
    },
    Hotels {
        total: usize,
        shown: Vec<HotelSummary>,
    },
    Banner {
        success: bool,
        message: String,
    },
    Raw(String),
}

impl RenderedResult {
    /// Heading for list results, stating the full count even when the list
    /// was truncated.
    #[must_use]
    pub fn header(&self) -> Option<String> {
        let (total, shown, noun) = match self {
            Self::Flights { total, shown } => (*total, shown.len(), "flight"),
            Self::Hotels { total, shown } => (*total, shown.len(), "hotel"),
            _ => return None,
        };
        let plural = if total == 1 { "" } else { "s" };
        Some(if shown < total {
            format!("Found {total} {noun}{plural} (showing {shown})")
        } else {
            format!("Found {total} {noun}{plural}")
        })
    }
}

/// Pick a rendering for a tool's result. Never fails.
#[must_use]
pub fn format_tool_result(name: &str, result: Option<&Value>) -> RenderedResult {
    let Some(result) = result.filter(|value| !value.is_null()) else {
        return RenderedResult::Empty;
    };

    match ToolKind::from_name(name) {
        ToolKind::FlightSearch => {
            if let Some(entries) = listing(result, "flights") {
                return RenderedResult::Flights {
                    total: objects(entries).count(),
                    shown: objects(entries)
                        .take(MAX_LISTED)
                        .map(FlightSummary::from_object)
                        .collect(),
                };
            }
        }
        ToolKind::HotelSearch => {
            if let Some(entries) = listing(result, "hotels") {
                return RenderedResult::Hotels {
                    total: objects(entries).count(),
                    shown: objects(entries)
                        .take(MAX_LISTED)
                        .map(HotelSummary::from_object)
                        .collect(),
                };
            }
        }
        ToolKind::BookingChange | ToolKind::Other => {}
    }

    if let Some(banner) = banner(result) {
        return banner;
    }

    debug!("No structured rendering for tool {name}, falling back to raw");
    RenderedResult::Raw(serde_json::to_string_pretty(result).unwrap_or_else(|_| result.to_string()))
}

/// A bare array, or one stored under `key` or `results`.
fn listing<'a>(result: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    result.as_array().or_else(|| {
        [key, "results"]
            .iter()
            .find_map(|k| result.get(*k).and_then(Value::as_array))
    })
}

fn objects(entries: &[Value]) -> impl Iterator<Item = &Map<String, Value>> {
    entries.iter().filter_map(Value::as_object)
}

fn banner(result: &Value) -> Option<RenderedResult> {
    let success = result.get("success")?.as_bool()?;
    let message = result
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .map_or_else(
            || (if success { SUCCESS_PHRASE } else { FAILURE_PHRASE }).to_string(),
            str::to_string,
        );
    Some(RenderedResult::Banner { success, message })
}

fn field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn price(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    let amount = keys.iter().find_map(|key| obj.get(*key))?;
    match amount {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(match field(obj, &["currency"]) {
            Some(currency) => format!("{currency} {n}"),
            None => n.to_string(),
        }),
        _ => None,
    }
}
