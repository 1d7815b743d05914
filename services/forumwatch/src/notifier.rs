//! Notifier trait for sending messages to the operator channel

use async_trait::async_trait;

use crate::clock::Clock;
use crate::records::{MonitoringConfig, NotificationKind};
use crate::store::RecordStore;

/// Where a message is delivered: bot credentials and destination chat
#[derive(Clone, PartialEq, Eq)]
pub struct Destination {
    pub bot_token: String,
    pub chat_id: String,
}

impl std::fmt::Debug for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Destination")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

impl Destination {
    pub fn from_config(config: &MonitoringConfig) -> Self {
        Self {
            bot_token: config.telegram_bot_token.clone(),
            chat_id: config.telegram_chat_id.clone(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.bot_token.trim().is_empty() && !self.chat_id.trim().is_empty()
    }
}

/// Trait for sending messages
#[async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug {
    /// Get the notifier type name (e.g. "telegram")
    fn type_name(&self) -> &str;

    /// Send a message to the destination
    async fn send(&self, destination: &Destination, text: &str) -> crate::Result<()>;
}

/// Send `text` with the stored credentials and record the outcome.
///
/// A delivered message bumps the sent counter and is logged as a success
/// entry; a failure is logged as an error entry. Returns whether the message
/// went out and never propagates errors.
pub async fn deliver(
    notifier: &dyn Notifier,
    store: &dyn RecordStore,
    clock: &dyn Clock,
    text: &str,
) -> bool {
    let result = match store.config().await {
        Ok(Some(config)) => notifier.send(&Destination::from_config(&config), text).await,
        Ok(None) => Err(crate::ForumWatchError::ConfigMissing),
        Err(e) => Err(e),
    };

    let now = clock.now();
    match result {
        Ok(()) => {
            if let Err(e) = store
                .update_status(Box::new(|s| s.total_notifications_sent += 1), now)
                .await
            {
                tracing::warn!("Failed to update notification counter: {}", e);
            }
            record(store, text, NotificationKind::Success, now).await;
            true
        }
        Err(e) => {
            let message = format!("Failed to send {} message: {}", notifier.type_name(), e);
            tracing::warn!("{}", message);
            record(store, &message, NotificationKind::Error, now).await;
            false
        }
    }
}

/// Append to the notification log, logging instead of failing
pub async fn record(
    store: &dyn RecordStore,
    message: &str,
    kind: NotificationKind,
    now: chrono::DateTime<chrono::Utc>,
) {
    if let Err(e) = store.append_notification(message, kind, now).await {
        tracing::warn!("Failed to record {} notification '{}': {}", kind, message, e);
    }
}
