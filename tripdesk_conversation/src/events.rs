//! Side-effect signals raised to the hosting view.

use serde_json::Value;
use tripdesk_core::ToolCall;

/// Tool whose result reports a completed booking.
pub const FINALIZE_BOOKING: &str = "finalize_booking";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationEvent {
    /// A `finalize_booking` call returned a booking id.
    BookingFinalized { booking_id: String },
}

/// Distinct booking ids finalized by `tool_calls`, in invocation order.
///
/// Results that carry `"success": false` are not a finalized booking even
/// when they echo an id.
#[must_use]
pub fn finalized_bookings(tool_calls: &[ToolCall]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for call in tool_calls.iter().filter(|c| c.name == FINALIZE_BOOKING) {
        if let Some(id) = call.result.as_ref().and_then(booking_id) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}

fn booking_id(result: &Value) -> Option<String> {
    if result.get("success").and_then(Value::as_bool) == Some(false) {
        return None;
    }
    let id = result
        .get("booking_id")
        .or_else(|| result.get("bookingId"))
        .or_else(|| result.get("booking").and_then(|b| b.get("id")))?;
    match id {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
