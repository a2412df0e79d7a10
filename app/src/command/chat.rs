//! Interactive conversation with the trip-planning backend.

use std::io::Write;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};
use tripdesk_config::Config;
use tripdesk_conversation::{
    ConversationEvent, ConversationManager, SendOutcome, finalized_bookings,
};
use tripdesk_core::Role;
use tripdesk_providers::HttpBackend;

use super::{build_backend, build_conversation_config};
use crate::display::{render_event, render_message};

/// Extra wait past the configured signal delay before giving up on a
/// booking notice in single-message mode.
const EVENT_GRACE: Duration = Duration::from_millis(250);

/// Input parameters for the Chat command strategy.
#[derive(Debug, Clone)]
pub struct ChatInput {
    /// Session to attach to; resolution picks one when absent.
    pub session_id: Option<String>,
    /// Optional single message to send (non-interactive mode)
    pub message: Option<String>,
}

/// Strategy for executing the Chat command.
#[derive(Debug, Clone, Copy)]
pub struct ChatStrategy;

impl super::CommandStrategy for ChatStrategy {
    type Input = ChatInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let conversation_config = build_conversation_config(&config);
        let signal_wait = conversation_config.booking_signal_delay + EVENT_GRACE;
        let (manager, events) =
            ConversationManager::new(build_backend(&config)?, conversation_config);

        match manager.resolve(input.session_id.as_deref()).await {
            Ok(Some(resolution)) => info!("Attached to session {}", resolution.session_id()),
            Ok(None) => {}
            // Already reported in the message list.
            Err(e) => warn!("Session resolution failed: {e}"),
        }

        let shown = print_since(&manager, 0, true);

        if let Some(msg) = input.message {
            send_once(&manager, &msg, shown, events, signal_wait).await;
        } else {
            run_interactive(&manager, shown, events).await?;
            info!("Conversation ended: {} messages", manager.messages().len());
        }

        Ok(())
    }
}

/// Print messages from `from` onward and return the new count.
fn print_since(
    manager: &ConversationManager<HttpBackend>,
    from: usize,
    include_user: bool,
) -> usize {
    let messages = manager.messages();
    for message in messages.iter().skip(from) {
        if include_user || message.role != Role::User {
            println!("{}\n", render_message(message));
        }
    }
    messages.len()
}

async fn send_once(
    manager: &ConversationManager<HttpBackend>,
    text: &str,
    shown: usize,
    mut events: UnboundedReceiver<ConversationEvent>,
    signal_wait: Duration,
) {
    let outcome = manager.send(text).await;
    info!("Send finished: {outcome:?}");
    print_since(manager, shown, false);

    if outcome != SendOutcome::Delivered {
        return;
    }
    let expected = manager
        .messages()
        .last()
        .map_or(0, |reply| finalized_bookings(&reply.tool_calls).len());
    for _ in 0..expected {
        match tokio::time::timeout(signal_wait, events.recv()).await {
            Ok(Some(event)) => println!("{}\n", render_event(&event)),
            _ => break,
        }
    }
}

async fn run_interactive(
    manager: &ConversationManager<HttpBackend>,
    mut shown: usize,
    mut events: UnboundedReceiver<ConversationEvent>,
) -> anyhow::Result<()> {
    let notices = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!("\n{}\n", render_event(&event));
        }
    });

    println!("tripdesk chat started. Type 'exit' to quit.\n");

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        if std::io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input == "exit" || input == "quit" {
            break;
        }

        if input.is_empty() {
            continue;
        }

        let outcome = manager.send(input).await;
        if outcome == SendOutcome::Busy {
            eprintln!("Still waiting for the previous reply.");
        }
        println!();
        shown = print_since(manager, shown, false);
    }

    notices.abort();
    Ok(())
}
