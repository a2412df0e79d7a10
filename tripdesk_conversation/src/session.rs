//! The live state of the conversation being viewed.
//!
//! A session holds the attached id and the canonical message list. Messages
//! are only ever appended, or replaced wholesale when a different session is
//! attached; an appended message is never edited.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::RwLock;
use tripdesk_core::{Message, Role};

/// Shared between the resolver and the coordinator. Never locked across an
/// `.await`.
pub(crate) type SharedSession = Arc<Mutex<ConversationSession>>;

/// Keeps resolutions and sends apart. Resolutions hold it shared, a send
/// holds it exclusively; neither side ever waits for it.
pub(crate) type ExchangeGate = Arc<RwLock<()>>;

pub(crate) fn lock(session: &SharedSession) -> MutexGuard<'_, ConversationSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Default)]
pub struct ConversationSession {
    /// `None` until a session is resolved or created by the backend.
    id: Option<String>,
    messages: Vec<Message>,
}

impl ConversationSession {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            id: None,
            messages: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Attach to `id`, replacing the history with the one loaded for it.
    pub fn attach(&mut self, id: impl Into<String>, history: Vec<Message>) {
        self.id = Some(id.into());
        self.messages = history;
    }

    /// Point at a different session id without touching the history. Used
    /// when the backend creates the session lazily during a send.
    pub fn reattach(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Append a locally synthesized message.
    pub fn add_message(&mut self, role: Role, content: impl Into<String>) {
        self.push(Message::local(role, content));
    }
}
