//! Conversation manager for one conversation view.
//!
//! The `ConversationManager` pairs a [`SessionResolver`] with a
//! [`SendCoordinator`] over one shared session and hands the host a stream
//! of [`ConversationEvent`]s.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{RwLock, mpsc};
use tracing::info;
use tripdesk_core::{ConversationBackend, Message, SessionSummary};

use crate::coordinator::{SendCoordinator, SendOutcome};
use crate::events::ConversationEvent;
use crate::resolver::{Resolution, SessionResolver};
use crate::session::{ConversationSession, ExchangeGate, SharedSession, lock};

/// Configuration for conversation management.
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    /// Shown locally when a session has no history yet. Never persisted.
    pub welcome_message: String,
    /// Substituted when a reply carries neither text nor tool calls.
    pub reply_fallback: String,
    /// Pause before a booking signal is emitted.
    pub booking_signal_delay: Duration,
    /// Upper bound on one exchange.
    pub send_timeout: Duration,
    /// Upper bound on listing, creating and loading sessions.
    pub fetch_timeout: Duration,
    /// `status` values that mark a session as open.
    pub open_statuses: Vec<String>,
    /// `stage` values that mark a session as open.
    pub open_stages: Vec<String>,
    /// `outcome` values that still allow resuming. A missing outcome always
    /// does.
    pub open_outcomes: Vec<String>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            welcome_message: "Hi! I'm your trip planner. Tell me where and when you'd like to \
                              travel and I'll find flights and hotels for you."
                .to_string(),
            reply_fallback: "I'm sorry, I didn't get a response. Please try again.".to_string(),
            booking_signal_delay: Duration::from_millis(600),
            send_timeout: Duration::from_secs(60),
            fetch_timeout: Duration::from_secs(30),
            open_statuses: strings(&["active", "open", "in_progress"]),
            open_stages: strings(&["discovery", "searching", "planning", "booking"]),
            open_outcomes: strings(&["pending", "in_progress"]),
        }
    }
}

impl ConversationConfig {
    #[must_use]
    pub fn with_welcome_message(mut self, message: String) -> Self {
        self.welcome_message = message;
        self
    }

    #[must_use]
    pub const fn with_booking_signal_delay(mut self, delay: Duration) -> Self {
        self.booking_signal_delay = delay;
        self
    }

    #[must_use]
    pub const fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Whether `session` is still an open conversation worth resuming.
    #[must_use]
    pub fn is_open(&self, session: &SessionSummary) -> bool {
        let listed = |value: Option<&String>, allowed: &[String]| {
            value.is_some_and(|v| allowed.iter().any(|a| a.eq_ignore_ascii_case(v.trim())))
        };

        let outcome_open = session.outcome.is_none()
            || listed(session.outcome.as_ref(), &self.open_outcomes);
        outcome_open
            && (listed(session.status.as_ref(), &self.open_statuses)
                || listed(session.stage.as_ref(), &self.open_stages))
    }
}

/// Errors that can occur during conversation management.
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("backend error: {0}")]
    Backend(#[from] anyhow::Error),

    #[error("a message exchange is in progress")]
    Busy,

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

/// Await a backend call, bounded by `limit`.
pub(crate) async fn bounded<T>(
    operation: &'static str,
    limit: Duration,
    call: impl Future<Output = anyhow::Result<T>>,
) -> Result<T, ConversationError> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(ConversationError::Backend),
        Err(_) => Err(ConversationError::Timeout {
            operation,
            after: limit,
        }),
    }
}

/// One conversation view: resolution plus message exchange.
pub struct ConversationManager<B = Arc<dyn ConversationBackend>>
where
    B: Send + Sync,
{
    resolver: SessionResolver<B>,
    coordinator: SendCoordinator<B>,
    session: SharedSession,
}

impl<B> ConversationManager<B>
where
    B: ConversationBackend + Send + Sync,
{
    /// Create a manager and the receiving end of its event stream.
    pub fn new(
        backend: B,
        config: ConversationConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ConversationEvent>) {
        info!("Creating conversation manager");

        let backend = Arc::new(backend);
        let config = Arc::new(config);
        let session: SharedSession = Arc::new(Mutex::new(ConversationSession::new()));
        let exchange: ExchangeGate = Arc::new(RwLock::new(()));
        let (events, receiver) = mpsc::unbounded_channel();

        let manager = Self {
            resolver: SessionResolver::new(
                Arc::clone(&backend),
                Arc::clone(&session),
                Arc::clone(&config),
                Arc::clone(&exchange),
            ),
            coordinator: SendCoordinator::new(
                backend,
                Arc::clone(&session),
                config,
                events,
                exchange,
            ),
            session,
        };
        (manager, receiver)
    }

    /// Attach to `external_id`, or to the most recent open session, or to a
    /// new one. `Ok(None)` means an equivalent resolution already ran or is
    /// running; `Err(ConversationError::Busy)` means a send is outstanding.
    pub async fn resolve(
        &self,
        external_id: Option<&str>,
    ) -> Result<Option<Resolution>, ConversationError> {
        self.resolver.resolve(external_id).await
    }

    pub async fn send(&self, text: &str) -> SendOutcome {
        self.coordinator.send(text).await
    }

    /// Snapshot of the message list for display.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        lock(&self.session).messages().to_vec()
    }

    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        lock(&self.session).id().map(str::to_string)
    }

    /// True while an exchange is outstanding; the host disables input.
    #[must_use]
    pub fn is_sending(&self) -> bool {
        self.coordinator.is_sending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(stage: Option<&str>, status: Option<&str>, outcome: Option<&str>) -> SessionSummary {
        SessionSummary {
            stage: stage.map(str::to_string),
            status: status.map(str::to_string),
            outcome: outcome.map(str::to_string),
            ..SessionSummary::new("S")
        }
    }

    #[test]
    fn test_config_default() {
        let config = ConversationConfig::default();
        assert!(!config.welcome_message.is_empty());
        assert!(config.send_timeout > Duration::ZERO);
        assert!(config.booking_signal_delay < Duration::from_secs(5));
    }

    #[test]
    fn open_session_allow_list() {
        let config = ConversationConfig::default();

        assert!(config.is_open(&summary(Some("searching"), None, None)));
        assert!(config.is_open(&summary(None, Some("Active"), None)));
        let pending = summary(Some("booking"), None, Some("pending"));
        assert!(config.is_open(&pending));

        assert!(!config.is_open(&summary(None, None, None)));
        let closed = summary(Some("completed"), Some("closed"), None);
        assert!(!config.is_open(&closed));
        let booked = summary(Some("booking"), Some("active"), Some("booked"));
        assert!(!config.is_open(&booked));
    }

    #[tokio::test]
    async fn timeout_is_reported() {
        let result: Result<(), _> = bounded("send", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(
            result,
            Err(ConversationError::Timeout {
                operation: "send",
                ..
            })
        ));
    }
}
