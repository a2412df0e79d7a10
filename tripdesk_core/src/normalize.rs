//! Conversion of raw backend records into canonical [`Message`] values.
//!
//! Backends disagree on field names (`id` vs `message_id`, `input` vs
//! `arguments`, ...). Each canonical field has one fixed resolution order;
//! the first present, well-typed candidate wins.
//!
//! | field | order | default |
//! |---|---|---|
//! | id | `id`, `message_id`, `messageId` | `msg-<now millis>-<index>` |
//! | role | `role`, `sender`, `type` | assistant |
//! | content | `content`, `message`, `text` | empty |
//! | tool calls | `tool_calls`, `toolCalls` | empty |
//! | timestamp | `timestamp`, `created_at`, `createdAt` | now |
//!
//! Synthesized ids and defaulted timestamps come from the clock at
//! normalization time, so normalizing the same record twice only yields
//! equal output when the record carries both fields itself.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use tracing::debug;

use crate::{Message, Role, ToolCall};

const ID_KEYS: &[&str] = &["id", "message_id", "messageId"];
const ROLE_KEYS: &[&str] = &["role", "sender", "type"];
const CONTENT_KEYS: &[&str] = &["content", "message", "text"];
const TOOL_CALL_KEYS: &[&str] = &["tool_calls", "toolCalls"];
const TIMESTAMP_KEYS: &[&str] = &["timestamp", "created_at", "createdAt"];

const TOOL_NAME_KEYS: &[&str] = &["name", "tool_name"];
const TOOL_ARGUMENT_KEYS: &[&str] = &["input", "arguments"];
const TOOL_RESULT_KEYS: &[&str] = &["result", "output"];

/// Normalize a whole history, preserving order.
///
/// Records that are not JSON objects carry nothing we can attribute to a
/// turn and are skipped.
#[must_use]
pub fn normalize_messages(raw: &[Value]) -> Vec<Message> {
    let now = Utc::now();
    raw.iter()
        .enumerate()
        .filter_map(|(index, record)| {
            let message = normalize_message(record, index, now);
            if message.is_none() {
                debug!("Skipping non-object history record at index {index}");
            }
            message
        })
        .collect()
}

/// Normalize one record. `index` and `now` feed the synthesized id and the
/// defaulted timestamp.
#[must_use]
pub fn normalize_message(raw: &Value, index: usize, now: DateTime<Utc>) -> Option<Message> {
    let obj = raw.as_object()?;

    let id = first_string(obj, ID_KEYS)
        .unwrap_or_else(|| format!("msg-{}-{index}", now.timestamp_millis()));

    let role = ROLE_KEYS
        .iter()
        .filter_map(|key| obj.get(*key).and_then(Value::as_str))
        .find_map(Role::from_tag)
        .unwrap_or(Role::Assistant);

    let content = CONTENT_KEYS
        .iter()
        .find_map(|key| obj.get(*key).and_then(content_text))
        .unwrap_or_default();

    let tool_calls = TOOL_CALL_KEYS
        .iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_array))
        .map(|calls| calls.iter().filter_map(normalize_tool_call).collect())
        .unwrap_or_default();

    let timestamp = TIMESTAMP_KEYS
        .iter()
        .find_map(|key| obj.get(*key).and_then(parse_timestamp))
        .unwrap_or(now);

    Some(Message {
        id,
        role,
        content,
        tool_calls,
        timestamp,
    })
}

/// Normalize one raw tool call. Non-object entries are dropped.
#[must_use]
pub fn normalize_tool_call(raw: &Value) -> Option<ToolCall> {
    let obj = raw.as_object()?;
    let function = obj.get("function").and_then(Value::as_object);

    let name = first_string(obj, TOOL_NAME_KEYS)
        .or_else(|| function.and_then(|f| first_string(f, &["name"])))
        .unwrap_or_else(|| "unknown".to_string());

    let arguments = TOOL_ARGUMENT_KEYS
        .iter()
        .find_map(|key| obj.get(*key).and_then(argument_map))
        .or_else(|| function?.get("arguments").and_then(argument_map))
        .unwrap_or_default();

    let result = TOOL_RESULT_KEYS
        .iter()
        .filter_map(|key| obj.get(*key))
        .find(|value| !value.is_null())
        .cloned();

    Some(ToolCall {
        name,
        arguments,
        result,
    })
}

/// First candidate key holding a non-empty string or a number.
pub(crate) fn first_string(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Plain strings pass through; an array of content blocks contributes the
/// `text` of each block.
fn content_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(blocks) => {
            let parts: Vec<&str> = blocks
                .iter()
                .filter_map(|block| match block {
                    Value::String(s) => Some(s.as_str()),
                    Value::Object(o) => o.get("text").and_then(Value::as_str),
                    _ => None,
                })
                .collect();
            Some(parts.join("\n"))
        }
        _ => None,
    }
}

/// Arguments arrive either as an object or as JSON encoded in a string.
fn argument_map(value: &Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map.clone()),
        Value::String(encoded) => match serde_json::from_str::<Value>(encoded) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        },
        _ => None,
    }
}

/// RFC 3339 strings, naive ISO strings (read as UTC) and epoch milliseconds.
pub(crate) fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            }),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}
