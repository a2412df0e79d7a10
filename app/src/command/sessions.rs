use tracing::info;
use tripdesk_config::Config;
use tripdesk_core::ConversationBackend;

use super::{build_backend, build_conversation_config};

/// Strategy for listing the sessions the backend knows about.
///
/// Sessions that `chat` would resume are marked with `*`.
#[derive(Debug, Clone, Copy)]
pub struct SessionsStrategy;

impl super::CommandStrategy for SessionsStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let conversation = build_conversation_config(&config);
        let backend = build_backend(&config)?;

        let sessions = backend.list_sessions().await?;
        info!("Backend returned {} sessions", sessions.len());

        if sessions.is_empty() {
            println!("No sessions yet. Run 'tripdesk chat' to start one.");
            return Ok(());
        }

        for session in &sessions {
            let marker = if conversation.is_open(session) { '*' } else { ' ' };
            let activity = session
                .last_activity()
                .map_or_else(
                    || "-".to_string(),
                    |t| t.format("%Y-%m-%d %H:%M").to_string(),
                );
            println!(
                "{marker} {:<38} {:<16} {:<12} {:<12} {activity}",
                session.id,
                session.stage.as_deref().unwrap_or("-"),
                session.status.as_deref().unwrap_or("-"),
                session.outcome.as_deref().unwrap_or("-"),
            );
        }
        Ok(())
    }
}
