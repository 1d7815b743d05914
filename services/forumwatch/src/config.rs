//! Configuration types for the forumwatch service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub monitor: MonitorSettings,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

/// HTTP API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

/// Record store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON file holding configuration, status and notification log.
    /// Without a path the records live in memory only.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            history_size: default_history_size(),
        }
    }
}

/// Lifecycle controller and fetcher tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    #[serde(default = "default_watchdog_interval", with = "humantime_serde")]
    pub watchdog_interval: Duration,
    #[serde(default = "default_restart_grace", with = "humantime_serde")]
    pub restart_grace: Duration,
    #[serde(default = "default_fetch_timeout", with = "humantime_serde")]
    pub fetch_timeout: Duration,
    #[serde(default = "default_true")]
    pub resume_on_boot: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            watchdog_interval: default_watchdog_interval(),
            restart_grace: default_restart_grace(),
            fetch_timeout: default_fetch_timeout(),
            resume_on_boot: true,
            user_agent: default_user_agent(),
        }
    }
}

/// Telegram Bot API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "default_telegram_api")]
    pub api_base_url: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_telegram_api(),
        }
    }
}

/// Monitoring configuration written to the store on first boot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    #[serde(default = "default_forum_url")]
    pub forum_url: String,
    #[serde(default = "default_check_interval")]
    pub check_interval_minutes: u32,
    #[serde(default)]
    pub telegram_bot_token: Option<String>,
    #[serde(default)]
    pub telegram_chat_id: Option<String>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            forum_url: default_forum_url(),
            check_interval_minutes: default_check_interval(),
            telegram_bot_token: None,
            telegram_chat_id: None,
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    11120
}

fn default_history_size() -> usize {
    500
}

fn default_watchdog_interval() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_restart_grace() -> Duration {
    Duration::from_secs(1)
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}

fn default_telegram_api() -> String {
    "https://api.telegram.org".to_string()
}

fn default_forum_url() -> String {
    "https://zajuna.sena.edu.co/zajuna/mod/forum/view.php?id=5024822".to_string()
}

fn default_check_interval() -> u32 {
    30
}

impl Config {
    /// Apply environment overrides on top of the file configuration.
    pub fn apply_env(&mut self) -> crate::Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> crate::Result<()> {
        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN").filter(|v| !v.is_empty()) {
            tracing::debug!("Seeding Telegram bot token from environment");
            self.seed.telegram_bot_token = Some(token);
        }
        if let Some(chat_id) = lookup("TELEGRAM_CHAT_ID").filter(|v| !v.is_empty()) {
            tracing::debug!("Seeding Telegram chat id from environment");
            self.seed.telegram_chat_id = Some(chat_id);
        }
        if let Some(port) = lookup("FORUMWATCH_PORT") {
            self.server.port = port.parse().map_err(|e| {
                crate::ForumWatchError::Config(format!("FORUMWATCH_PORT '{}': {}", port, e))
            })?;
        }
        self.validate()
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        crate::records::validate_interval(self.seed.check_interval_minutes).map_err(|e| {
            crate::ForumWatchError::Config(format!("seed.check_interval_minutes: {}", e))
        })?;
        if self.monitor.watchdog_interval.is_zero() {
            return Err(crate::ForumWatchError::Config(
                "monitor.watchdog_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::ForumWatchError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}
