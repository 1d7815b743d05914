//! Persisted record types: monitoring configuration, run status, notification log

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound for the check interval, one day in minutes
pub const MAX_CHECK_INTERVAL_MINUTES: u32 = 1440;

/// The monitoring configuration singleton
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringConfig {
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
    pub forum_url: String,
    pub check_interval: u32,
    pub last_post_title: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// The run status singleton
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatus {
    pub is_running: bool,
    pub last_check_at: Option<DateTime<Utc>>,
    pub last_successful_check_at: Option<DateTime<Utc>>,
    pub total_notifications_sent: u64,
    pub service_started_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl RunStatus {
    /// Mark the service running since `now`, clearing any previous error
    pub fn mark_started(&mut self, now: DateTime<Utc>) {
        self.is_running = true;
        self.service_started_at = Some(now);
        self.last_error = None;
    }

    /// Mark the service stopped
    pub fn mark_stopped(&mut self) {
        self.is_running = false;
        self.service_started_at = None;
    }

    /// Whole minutes since the service started, if it is running
    pub fn uptime_minutes(&self, now: DateTime<Utc>) -> Option<i64> {
        self.service_started_at
            .filter(|_| self.is_running)
            .map(|started| (now - started).num_minutes().max(0))
    }
}

/// Category tag of a notification log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Error,
    Info,
    NewPost,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::Success => write!(f, "success"),
            NotificationKind::Error => write!(f, "error"),
            NotificationKind::Info => write!(f, "info"),
            NotificationKind::NewPost => write!(f, "new_post"),
        }
    }
}

/// Immutable notification log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: u64,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /api/config`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConfig {
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
    pub forum_url: String,
    #[serde(default = "default_check_interval")]
    pub check_interval: u32,
}

fn default_check_interval() -> u32 {
    30
}

impl UpdateConfig {
    /// Validate the request, returning the first problem found
    pub fn validate(&self) -> crate::Result<()> {
        if self.telegram_bot_token.trim().is_empty() {
            return Err(invalid("Bot token is required"));
        }
        if self.telegram_chat_id.trim().is_empty() {
            return Err(invalid("Chat ID is required"));
        }
        validate_url(&self.forum_url)?;
        validate_interval(self.check_interval)?;
        Ok(())
    }
}

fn invalid(msg: &str) -> crate::ForumWatchError {
    crate::ForumWatchError::Validation(msg.to_string())
}

/// Accept only absolute http(s) URLs with a host
pub fn validate_url(url: &str) -> crate::Result<()> {
    let parsed = reqwest::Url::parse(url).map_err(|_| invalid("Must be a valid URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(invalid("Must be a valid URL"));
    }
    Ok(())
}

/// Check interval must be within [1, 1440] minutes
pub fn validate_interval(minutes: u32) -> crate::Result<()> {
    if minutes == 0 || minutes > MAX_CHECK_INTERVAL_MINUTES {
        return Err(crate::ForumWatchError::Validation(format!(
            "Check interval must be between 1 and {} minutes, got {}",
            MAX_CHECK_INTERVAL_MINUTES, minutes
        )));
    }
    Ok(())
}
