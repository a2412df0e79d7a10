//! Decides which session a conversation view is attached to.
//!
//! Order of preference: an externally supplied id, then the most recently
//! active open session, then a freshly created one. Every entry goes through
//! the [`InitGuard`].

use std::sync::Arc;

use tracing::{debug, info, warn};
use tripdesk_core::{ConversationBackend, Message, Role, SessionSummary, normalize_messages};

use crate::guard::InitGuard;
use crate::manager::{ConversationConfig, ConversationError, bounded};
use crate::session::{ExchangeGate, SharedSession, lock};

/// How a resolution ended up attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The id supplied by the host.
    Explicit(String),
    /// The most recent open session.
    Resumed(String),
    /// A new session created for this view.
    Created(String),
}

impl Resolution {
    #[must_use]
    pub fn session_id(&self) -> &str {
        match self {
            Self::Explicit(id) | Self::Resumed(id) | Self::Created(id) => id,
        }
    }
}

pub struct SessionResolver<B> {
    backend: Arc<B>,
    session: SharedSession,
    guard: InitGuard,
    config: Arc<ConversationConfig>,
    exchange: ExchangeGate,
}

impl<B> SessionResolver<B>
where
    B: ConversationBackend + Send + Sync,
{
    pub(crate) fn new(
        backend: Arc<B>,
        session: SharedSession,
        config: Arc<ConversationConfig>,
        exchange: ExchangeGate,
    ) -> Self {
        Self {
            backend,
            session,
            guard: InitGuard::new(),
            config,
            exchange,
        }
    }

    /// Resolve and attach. Returns `Ok(None)` when the guard refused the
    /// call because the same external id is being, or has been, resolved.
    ///
    /// Refused with [`ConversationError::Busy`] while a send is outstanding;
    /// nothing is appended and the guard is released.
    ///
    /// On failure a system message is appended to the conversation before
    /// the error is returned, and the guard is released for a retry.
    pub async fn resolve(
        &self,
        external_id: Option<&str>,
    ) -> Result<Option<Resolution>, ConversationError> {
        let Some(ticket) = self.guard.try_begin(external_id) else {
            debug!("Skipping resolution for {external_id:?}: already handled");
            return Ok(None);
        };

        let Ok(_shared) = self.exchange.try_read() else {
            debug!("Resolution for {external_id:?} refused: a send is outstanding");
            return Err(ConversationError::Busy);
        };

        info!("Resolving conversation session (external id: {external_id:?})");

        match self.run(external_id).await {
            Ok((resolution, history)) => {
                if !ticket.is_current() {
                    debug!("Resolution for {external_id:?} superseded, discarding");
                    return Ok(None);
                }
                info!(
                    "Attached to session {} with {} messages",
                    resolution.session_id(),
                    history.len()
                );
                lock(&self.session).attach(resolution.session_id(), history);
                ticket.complete(resolution.session_id());
                Ok(Some(resolution))
            }
            Err(err) => {
                warn!("Session resolution failed: {err}");
                if ticket.is_current() {
                    lock(&self.session).add_message(
                        Role::System,
                        format!("Could not start the conversation: {err}"),
                    );
                }
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        external_id: Option<&str>,
    ) -> Result<(Resolution, Vec<Message>), ConversationError> {
        if let Some(id) = external_id {
            let history = self.load_history(id).await?;
            return Ok((Resolution::Explicit(id.to_string()), history));
        }

        let sessions = bounded(
            "listing sessions",
            self.config.fetch_timeout,
            self.backend.list_sessions(),
        )
        .await?;
        debug!("Backend listed {} sessions", sessions.len());

        if let Some(latest) = most_recent_open(&sessions, &self.config) {
            let history = self.load_history(&latest.id).await?;
            return Ok((Resolution::Resumed(latest.id.clone()), history));
        }

        let created = bounded(
            "creating a session",
            self.config.fetch_timeout,
            self.backend.create_session(),
        )
        .await?;
        info!("Created session {}", created.id);
        Ok((Resolution::Created(created.id), vec![self.welcome()]))
    }

    /// Normalized history for `id`; an empty history gets the welcome turn.
    async fn load_history(&self, id: &str) -> Result<Vec<Message>, ConversationError> {
        let raw = bounded(
            "loading history",
            self.config.fetch_timeout,
            self.backend.session_history(id),
        )
        .await?;

        let mut history = normalize_messages(&raw);
        if history.is_empty() {
            history.push(self.welcome());
        }
        Ok(history)
    }

    fn welcome(&self) -> Message {
        Message::local(Role::Assistant, self.config.welcome_message.clone())
    }
}

/// The open session with the latest activity. Sessions without any
/// timestamp rank last.
#[must_use]
pub fn most_recent_open<'a>(
    sessions: &'a [SessionSummary],
    config: &ConversationConfig,
) -> Option<&'a SessionSummary> {
    sessions
        .iter()
        .filter(|s| config.is_open(s))
        // `max_by_key` keeps the last maximum; reverse so ties go to the
        // earlier listing entry.
        .rev()
        .max_by_key(|s| s.last_activity())
}
