//! Static strategy pattern for CLI commands.
//!
//! Each command is a separate strategy with its own input type, dispatched
//! statically from `main`.

use std::time::Duration;

use tracing::info;
use tripdesk_config::Config;
use tripdesk_conversation::ConversationConfig;
use tripdesk_providers::HttpBackend;

mod chat;
mod init;
mod sessions;
mod version;

pub use chat::{ChatInput, ChatStrategy};
pub use init::InitStrategy;
pub use sessions::SessionsStrategy;
pub use version::VersionStrategy;

/// Build the HTTP backend described by the `backend` config section.
fn build_backend(config: &Config) -> anyhow::Result<HttpBackend> {
    info!("Using backend at {}", config.backend.base_url);
    Ok(HttpBackend::new(&config.backend.base_url)?.with_api_key(config.backend.api_key.clone()))
}

/// Map the `conversation` config section onto runtime settings.
fn build_conversation_config(config: &Config) -> ConversationConfig {
    let settings = &config.conversation;
    let mut conversation = ConversationConfig::default()
        .with_booking_signal_delay(Duration::from_millis(settings.booking_signal_delay_ms))
        .with_send_timeout(Duration::from_secs(settings.send_timeout_secs))
        .with_fetch_timeout(Duration::from_secs(settings.fetch_timeout_secs));

    if let Some(welcome) = settings.welcome_message.clone() {
        conversation = conversation.with_welcome_message(welcome);
    }
    if let Some(stages) = settings.open_stages.clone() {
        conversation.open_stages = stages;
    }
    if let Some(statuses) = settings.open_statuses.clone() {
        conversation.open_statuses = statuses;
    }
    if let Some(outcomes) = settings.open_outcomes.clone() {
        conversation.open_outcomes = outcomes;
    }
    conversation
}

/// Core trait defining the contract for all command strategies.
pub trait CommandStrategy: Send + Sync + 'static {
    /// The input type this strategy accepts.
    type Input;

    /// Execute the command with the given input.
    ///
    /// # Errors
    /// Returns an error if command execution fails.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}
