#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub mod normalize;
pub mod session;

pub use normalize::{normalize_message, normalize_messages, normalize_tool_call};
pub use session::{SendReply, SessionSummary};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    /// Reserved for tool-attributed turns.
    Tool,
}

impl Role {
    /// Parse a wire role tag, accepting the aliases different backends use.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "user" | "human" => Some(Self::User),
            "assistant" | "ai" | "agent" | "bot" => Some(Self::Assistant),
            "system" => Some(Self::System),
            "tool" | "function" => Some(Self::Tool),
            _ => None,
        }
    }
}

/// A single tool invocation attached to an assistant turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
    /// `None` means the result is pending or unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

/// One turn of a conversation in canonical form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Build a message that exists only on this side of the wire, with a
    /// freshly synthesized `local-` id.
    #[must_use]
    pub fn local(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: format!("local-{}", Uuid::now_v7()),
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    #[must_use]
    pub fn is_local(&self) -> bool {
        self.id.starts_with("local-")
    }
}

/// The remote service that stores conversations and runs the agent.
///
/// History and tool calls are returned raw; callers run them through
/// [`normalize`] before use.
#[async_trait]
pub trait ConversationBackend: Send + Sync {
    async fn list_sessions(&self) -> anyhow::Result<Vec<SessionSummary>>;
    async fn create_session(&self) -> anyhow::Result<SessionSummary>;
    async fn session_history(&self, session_id: &str) -> anyhow::Result<Vec<Value>>;
    /// Perform one exchange. A `None` session id asks the backend to create
    /// one; the reply names the session it used.
    async fn send(&self, session_id: Option<&str>, text: &str) -> anyhow::Result<SendReply>;
}

#[async_trait]
impl<B> ConversationBackend for std::sync::Arc<B>
where
    B: ConversationBackend + ?Sized,
{
    async fn list_sessions(&self) -> anyhow::Result<Vec<SessionSummary>> {
        (**self).list_sessions().await
    }

    async fn create_session(&self) -> anyhow::Result<SessionSummary> {
        (**self).create_session().await
    }

    async fn session_history(&self, session_id: &str) -> anyhow::Result<Vec<Value>> {
        (**self).session_history(session_id).await
    }

    async fn send(&self, session_id: Option<&str>, text: &str) -> anyhow::Result<SendReply> {
        (**self).send(session_id, text).await
    }
}
