//! Terminal rendering of conversation messages.

use std::fmt::Write;

use tripdesk_conversation::ConversationEvent;
use tripdesk_core::{Message, Role, ToolCall};
use tripdesk_render::{
    DetailLine, DisplayBlock, FlightSummary, HotelSummary, RenderedResult, Span, ToolKind,
    format_tool_result, render_markup,
};

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";
const INDENT: &str = "    ";

const fn speaker(role: Role) -> &'static str {
    match role {
        Role::User => "You",
        Role::Assistant => "Planner",
        Role::System => "⚠ Notice",
        Role::Tool => "Tool",
    }
}

/// Message text and tool invocations as terminal lines.
pub fn render_message(message: &Message) -> String {
    let mut out = format!(
        "{BOLD}{}{RESET} [{}]",
        speaker(message.role),
        message.timestamp.format("%H:%M")
    );

    let body = render_blocks(&render_markup(&message.content));
    if !body.is_empty() {
        out.push('\n');
        out.push_str(&body);
    }
    for call in &message.tool_calls {
        out.push('\n');
        out.push_str(&render_tool_call(call));
    }
    out
}

pub fn render_event(event: &ConversationEvent) -> String {
    match event {
        ConversationEvent::BookingFinalized { booking_id } => {
            format!("🎉 Booking {BOLD}{booking_id}{RESET} is confirmed.")
        }
    }
}

fn render_spans(spans: &[Span]) -> String {
    spans
        .iter()
        .map(|span| match span {
            Span::Plain(text) => text.clone(),
            Span::Bold(text) => format!("{BOLD}{text}{RESET}"),
        })
        .collect()
}

fn render_detail(detail: &DetailLine) -> String {
    match detail.label {
        Some(label) => format!("{INDENT}{label}: {}", render_spans(&detail.spans)),
        None => format!("{INDENT}{}", render_spans(&detail.spans)),
    }
}

fn render_blocks(blocks: &[DisplayBlock]) -> String {
    let mut lines = Vec::new();
    for block in blocks {
        match block {
            DisplayBlock::Paragraph { spans } => lines.push(render_spans(spans)),
            DisplayBlock::ListItem { index, title, details } => {
                lines.push(format!("{index}. {}", render_spans(title)));
                lines.extend(details.iter().map(render_detail));
            }
            DisplayBlock::Spacer => lines.push(String::new()),
        }
    }
    lines.join("\n")
}

fn render_tool_call(call: &ToolCall) -> String {
    let kind = ToolKind::from_name(&call.name);
    let mut out = format!("  {} {} ({})", kind.icon(), kind.label(), call.name);

    let rendered = format_tool_result(&call.name, call.result.as_ref());
    if let Some(header) = rendered.header() {
        let _ = write!(out, "\n{INDENT}{header}");
    }
    match rendered {
        RenderedResult::Empty => out.push_str(" …"),
        RenderedResult::Flights { shown, .. } => {
            for flight in &shown {
                let _ = write!(out, "\n{INDENT}• {}", flight_line(flight));
            }
        }
        RenderedResult::Hotels { shown, .. } => {
            for hotel in &shown {
                let _ = write!(out, "\n{INDENT}• {}", hotel_line(hotel));
            }
        }
        RenderedResult::Banner { success, message } => {
            let mark = if success { "✅" } else { "❌" };
            let _ = write!(out, "\n{INDENT}{mark} {message}");
        }
        RenderedResult::Raw(json) => {
            for line in json.lines() {
                let _ = write!(out, "\n{INDENT}{line}");
            }
        }
    }
    out
}

fn joined(parts: &[Option<&str>], separator: &str) -> String {
    parts
        .iter()
        .flatten()
        .copied()
        .collect::<Vec<_>>()
        .join(separator)
}

fn flight_line(flight: &FlightSummary) -> String {
    let carrier = joined(
        &[flight.airline.as_deref(), flight.flight_number.as_deref()],
        " ",
    );
    let route = joined(
        &[flight.origin.as_deref(), flight.destination.as_deref()],
        " → ",
    );
    let times = joined(
        &[flight.departure.as_deref(), flight.arrival.as_deref()],
        " – ",
    );
    let line = joined(
        &[
            Some(carrier.as_str()).filter(|s| !s.is_empty()),
            Some(route.as_str()).filter(|s| !s.is_empty()),
            Some(times.as_str()).filter(|s| !s.is_empty()),
            flight.price.as_deref(),
        ],
        "  ",
    );
    if line.is_empty() {
        "Flight".to_string()
    } else {
        line
    }
}

fn hotel_line(hotel: &HotelSummary) -> String {
    let rating = hotel.rating.as_ref().map(|r| format!("★ {r}"));
    let line = joined(
        &[
            hotel.name.as_deref(),
            hotel.location.as_deref(),
            rating.as_deref(),
            hotel.price.as_deref(),
        ],
        "  ",
    );
    if line.is_empty() {
        "Hotel".to_string()
    } else {
        line
    }
}
