use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

const CONFIG_DIR: &str = "tripdesk";
const CONFIG_FILE: &str = "config.json";

const CONFIG_TEMPLATE: &str = r#"{
  "backend": {
    "base_url": "http://localhost:8000/api",
    "api_key": null
  },
  "conversation": {
    "booking_signal_delay_ms": 600,
    "send_timeout_secs": 60,
    "fetch_timeout_secs": 30,
    "open_stages": ["discovery", "searching", "planning", "booking"],
    "open_statuses": ["active", "open", "in_progress"],
    "open_outcomes": ["pending", "in_progress"]
  }
}"#;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub conversation: ConversationSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "BackendConfig::default_base_url")]
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            api_key: None,
        }
    }
}

impl BackendConfig {
    fn default_base_url() -> String {
        "http://localhost:8000/api".to_string()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConversationSettings {
    /// Overrides the built-in greeting for sessions without history.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub welcome_message: Option<String>,
    #[serde(default = "ConversationSettings::default_booking_signal_delay_ms")]
    pub booking_signal_delay_ms: u64,
    #[serde(default = "ConversationSettings::default_send_timeout_secs")]
    pub send_timeout_secs: u64,
    #[serde(default = "ConversationSettings::default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Stage tags that mark a session as resumable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_stages: Option<Vec<String>>,
    /// Status tags that mark a session as resumable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_statuses: Option<Vec<String>>,
    /// Outcome tags that still allow resuming. A missing outcome always does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_outcomes: Option<Vec<String>>,
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            welcome_message: None,
            booking_signal_delay_ms: Self::default_booking_signal_delay_ms(),
            send_timeout_secs: Self::default_send_timeout_secs(),
            fetch_timeout_secs: Self::default_fetch_timeout_secs(),
            open_stages: None,
            open_statuses: None,
            open_outcomes: None,
        }
    }
}

impl ConversationSettings {
    const fn default_booking_signal_delay_ms() -> u64 {
        600
    }

    const fn default_send_timeout_secs() -> u64 {
        60
    }

    const fn default_fetch_timeout_secs() -> u64 {
        30
    }
}

impl Config {
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join(CONFIG_DIR))
    }

    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found at: {}. Please run 'tripdesk init' to create config.",
                config_path.display()
            );
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub fn create_config() -> anyhow::Result<()> {
        let config_dir = Self::ensure_config_dir()?;
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }

        std::fs::write(&config_path, CONFIG_TEMPLATE)?;

        println!("✅ Created config file at: {}", config_path.display());
        println!();
        println!("📝 Next steps:");
        println!("   1. Set backend.base_url to your trip-planning service");
        println!("   2. Add backend.api_key if the service requires a bearer token");
        println!("   3. Run 'tripdesk chat' to start a conversation");
        println!();
        println!("🔧 Configuration options:");
        println!("   - send_timeout_secs: How long to wait for a reply before giving up");
        println!("   - booking_signal_delay_ms: Pause before announcing a finalized booking");
        println!("   - open_stages / open_statuses / open_outcomes: Which sessions 'chat' resumes");
        println!();
        Ok(())
    }
}
