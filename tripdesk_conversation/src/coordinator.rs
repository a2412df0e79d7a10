//! The send/receive half of a conversation view.
//!
//! After the initial load the coordinator is the only writer of the message
//! list. Every exchange appends exactly two messages in order: the
//! optimistic user turn, then the assistant reply or a system notice.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tripdesk_core::{ConversationBackend, Message, Role, SendReply, ToolCall, normalize_tool_call};

use crate::events::{ConversationEvent, finalized_bookings};
use crate::manager::{ConversationConfig, bounded};
use crate::session::{ExchangeGate, SharedSession, lock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input; nothing happened.
    Ignored,
    /// Another exchange or a session resolution is outstanding; nothing
    /// happened.
    Busy,
    /// The reply was appended.
    Delivered,
    /// The exchange failed and a system notice was appended.
    Failed,
}

pub struct SendCoordinator<B> {
    backend: Arc<B>,
    session: SharedSession,
    config: Arc<ConversationConfig>,
    events: mpsc::UnboundedSender<ConversationEvent>,
    exchange: ExchangeGate,
}

impl<B> SendCoordinator<B>
where
    B: ConversationBackend + Send + Sync,
{
    pub(crate) const fn new(
        backend: Arc<B>,
        session: SharedSession,
        config: Arc<ConversationConfig>,
        events: mpsc::UnboundedSender<ConversationEvent>,
        exchange: ExchangeGate,
    ) -> Self {
        Self {
            backend,
            session,
            config,
            events,
            exchange,
        }
    }

    #[must_use]
    pub fn is_sending(&self) -> bool {
        self.exchange.try_read().is_err()
    }

    /// Send one user message and apply the reply.
    pub async fn send(&self, text: &str) -> SendOutcome {
        if text.trim().is_empty() {
            return SendOutcome::Ignored;
        }

        let Ok(_exclusive) = self.exchange.try_write() else {
            debug!("Send rejected: an exchange or resolution is outstanding");
            return SendOutcome::Busy;
        };

        let session_id = {
            let mut session = lock(&self.session);
            session.push(Message::local(Role::User, text));
            session.id().map(str::to_string)
        };

        info!("Sending message (session: {session_id:?})");

        let reply = bounded(
            "sending the message",
            self.config.send_timeout,
            self.backend.send(session_id.as_deref(), text),
        )
        .await;

        match reply {
            Ok(reply) => {
                self.apply_reply(reply);
                SendOutcome::Delivered
            }
            Err(err) => {
                warn!("Send failed: {err}");
                lock(&self.session).add_message(
                    Role::System,
                    format!("Your message could not be delivered ({err}). Please try again."),
                );
                SendOutcome::Failed
            }
        }
    }

    fn apply_reply(&self, reply: SendReply) {
        let tool_calls: Vec<ToolCall> = reply
            .tool_calls
            .iter()
            .filter_map(normalize_tool_call)
            .collect();

        let content = match reply.reply_text {
            Some(text) if !text.trim().is_empty() => text,
            _ if tool_calls.is_empty() => self.config.reply_fallback.clone(),
            _ => String::new(),
        };

        let bookings = finalized_bookings(&tool_calls);
        let message = Message::local(Role::Assistant, content).with_tool_calls(tool_calls);

        {
            let mut session = lock(&self.session);
            if let Some(id) = reply.session_id {
                if session.id() != Some(id.as_str()) {
                    info!("Backend assigned session {id}, re-attaching");
                    session.reattach(id);
                }
            }
            session.push(message);
        }

        for booking_id in bookings {
            self.signal_booking(booking_id);
        }
    }

    /// Emit a booking signal after the configured delay.
    fn signal_booking(&self, booking_id: String) {
        info!("Booking {booking_id} finalized");
        let events = self.events.clone();
        let delay = self.config.booking_signal_delay;
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if events
                .send(ConversationEvent::BookingFinalized { booking_id })
                .is_err()
            {
                debug!("Booking signal dropped: no receiver");
            }
        });
    }
}
