//! Session listings and exchange replies as the backend reports them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::normalize::{first_string, parse_timestamp};

/// One conversation thread as listed by the backend.
///
/// `stage`, `outcome` and `status` are owned by the backend; the core only
/// reads them when picking a session to resume.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: String,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SessionSummary {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Ranking key for resumption: last update, else creation time.
    #[must_use]
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.created_at)
    }

    /// Read a listing entry. Entries without an id cannot be attached to
    /// and yield `None`.
    #[must_use]
    pub fn from_value(raw: &Value) -> Option<Self> {
        let obj = raw.as_object()?;
        let tag = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);
        let time = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| obj.get(*key).and_then(parse_timestamp))
        };

        Some(Self {
            id: first_string(obj, &["id", "session_id", "sessionId"])?,
            stage: tag("stage"),
            outcome: tag("outcome"),
            status: tag("status"),
            created_at: time(&["created_at", "createdAt"]),
            updated_at: time(&["updated_at", "updatedAt"]),
        })
    }
}

/// Result of one exchange. Every field may be missing in a malformed
/// reply; the coordinator substitutes defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SendReply {
    pub session_id: Option<String>,
    pub reply_text: Option<String>,
    /// Raw tool calls, normalized by the receiver.
    pub tool_calls: Vec<Value>,
}

impl SendReply {
    #[must_use]
    pub fn from_value(raw: &Value) -> Self {
        let Some(obj) = raw.as_object() else {
            return Self::default();
        };

        Self {
            session_id: first_string(obj, &["session_id", "sessionId"]),
            reply_text: ["reply", "response", "message", "content"]
                .iter()
                .find_map(|key| obj.get(*key).and_then(Value::as_str))
                .map(str::to_string),
            tool_calls: ["tool_calls", "toolCalls"]
                .iter()
                .find_map(|key| obj.get(*key).and_then(Value::as_array))
                .cloned()
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn summary_reads_camel_case_dialect() {
        let raw = json!({
            "sessionId": "S9",
            "stage": "searching",
            "updatedAt": "2024-06-01T10:00:00Z"
        });
        let Some(summary) = SessionSummary::from_value(&raw) else {
            panic!("summary with an id must parse");
        };
        assert_eq!(summary.id, "S9");
        assert_eq!(summary.stage.as_deref(), Some("searching"));
        assert!(summary.created_at.is_none());
        assert_eq!(summary.last_activity(), summary.updated_at);
    }

    #[test]
    fn summary_without_id_is_rejected() {
        let no_id = json!({"stage": "planning"});
        assert!(SessionSummary::from_value(&no_id).is_none());
    }

    #[test]
    fn last_activity_falls_back_to_creation() {
        let raw = json!({"id": "S1", "created_at": "2024-01-01T00:00:00Z"});
        let summary = SessionSummary::from_value(&raw);
        assert!(summary.and_then(|s| s.last_activity()).is_some());
    }

    #[test]
    fn reply_defaults_when_fields_missing() {
        let reply = SendReply::from_value(&json!({"status": "ok"}));
        assert_eq!(reply, SendReply::default());

        let reply = SendReply::from_value(&json!("garbage"));
        assert!(reply.tool_calls.is_empty());
    }

    #[test]
    fn reply_field_aliases() {
        let reply = SendReply::from_value(&json!({
            "sessionId": "S2",
            "response": "Here are some flights",
            "tool_calls": [{"name": "search_flights"}]
        }));
        assert_eq!(reply.session_id.as_deref(), Some("S2"));
        assert_eq!(reply.reply_text.as_deref(), Some("Here are some flights"));
        assert_eq!(reply.tool_calls.len(), 1);
    }
}
