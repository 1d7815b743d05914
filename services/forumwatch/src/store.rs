//! Record store for the monitoring configuration, run status and notification log

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::SeedConfig;
use crate::records::{
    MonitoringConfig, NotificationKind, NotificationRecord, RunStatus, UpdateConfig,
};

/// Read-modify-write mutation applied to the run status under the store lock
pub type StatusMutation = Box<dyn FnOnce(&mut RunStatus) + Send>;

/// Durable storage for the service records
#[async_trait]
pub trait RecordStore: Send + Sync + std::fmt::Debug {
    /// The monitoring configuration, if one has been written
    async fn config(&self) -> crate::Result<Option<MonitoringConfig>>;

    /// Create or replace the configuration, preserving the last post title
    async fn save_config(
        &self,
        update: &UpdateConfig,
        now: DateTime<Utc>,
    ) -> crate::Result<MonitoringConfig>;

    /// Record the most recently observed post identifier
    async fn set_last_post_title(&self, title: &str) -> crate::Result<()>;

    /// The current run status
    async fn status(&self) -> crate::Result<RunStatus>;

    /// Atomically mutate the run status and return the new value
    async fn update_status(
        &self,
        mutation: StatusMutation,
        now: DateTime<Utc>,
    ) -> crate::Result<RunStatus>;

    /// Append an entry to the notification log
    async fn append_notification(
        &self,
        message: &str,
        kind: NotificationKind,
        now: DateTime<Utc>,
    ) -> crate::Result<NotificationRecord>;

    /// The most recent `limit` log entries, newest first
    async fn notifications(&self, limit: usize) -> crate::Result<Vec<NotificationRecord>>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreData {
    config: Option<MonitoringConfig>,
    #[serde(default)]
    status: RunStatus,
    #[serde(default)]
    notifications: VecDeque<NotificationRecord>,
    #[serde(default)]
    next_notification_id: u64,
}

/// Store that keeps all records in memory and optionally mirrors them to a JSON file
#[derive(Debug)]
pub struct JsonStore {
    path: Option<PathBuf>,
    history_size: usize,
    data: RwLock<StoreData>,
}

impl JsonStore {
    /// A store that never touches the filesystem
    pub fn in_memory(history_size: usize) -> Self {
        Self {
            path: None,
            history_size: history_size.max(1),
            data: RwLock::new(StoreData::default()),
        }
    }

    /// Open a file-backed store, loading existing records if the file exists
    pub async fn open(path: &Path, history_size: usize) -> crate::Result<Self> {
        let data = match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                tracing::debug!("Loading records from {:?}", path);
                serde_json::from_str(&content).map_err(|e| {
                    crate::ForumWatchError::Store(format!(
                        "Failed to parse store file {:?}: {}",
                        path, e
                    ))
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("Store file {:?} not found, starting empty", path);
                StoreData::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: Some(path.to_path_buf()),
            history_size: history_size.max(1),
            data: RwLock::new(data),
        })
    }

    /// Seed the configuration on first boot
    pub async fn initialize(&self, seed: &SeedConfig, now: DateTime<Utc>) -> crate::Result<()> {
        let mut data = self.data.write().await;
        if data.config.is_none() {
            tracing::info!("No configuration found, seeding from defaults and environment");
            let config = MonitoringConfig {
                telegram_bot_token: seed.telegram_bot_token.clone().unwrap_or_default(),
                telegram_chat_id: seed.telegram_chat_id.clone().unwrap_or_default(),
                forum_url: seed.forum_url.clone(),
                check_interval: seed.check_interval_minutes,
                last_post_title: None,
                updated_at: now,
            };
            self.commit(&mut data, |d| {
                d.config = Some(config);
                Ok(())
            })
            .await?;
        }
        Ok(())
    }

    /// Apply `change` to a copy of the records, persist the copy, and only
    /// then make it current. A failed write leaves the records untouched.
    async fn commit<T>(
        &self,
        data: &mut StoreData,
        change: impl FnOnce(&mut StoreData) -> crate::Result<T>,
    ) -> crate::Result<T> {
        let mut next = data.clone();
        let value = change(&mut next)?;
        self.persist(&next).await?;
        *data = next;
        Ok(value)
    }

    async fn persist(&self, data: &StoreData) -> crate::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_vec_pretty(data)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for JsonStore {
    async fn config(&self) -> crate::Result<Option<MonitoringConfig>> {
        Ok(self.data.read().await.config.clone())
    }

    async fn save_config(
        &self,
        update: &UpdateConfig,
        now: DateTime<Utc>,
    ) -> crate::Result<MonitoringConfig> {
        let mut data = self.data.write().await;
        let last_post_title = data.config.as_ref().and_then(|c| c.last_post_title.clone());
        let config = MonitoringConfig {
            telegram_bot_token: update.telegram_bot_token.clone(),
            telegram_chat_id: update.telegram_chat_id.clone(),
            forum_url: update.forum_url.clone(),
            check_interval: update.check_interval,
            last_post_title,
            updated_at: now,
        };
        self.commit(&mut data, |d| {
            d.config = Some(config.clone());
            Ok(config)
        })
        .await
    }

    async fn set_last_post_title(&self, title: &str) -> crate::Result<()> {
        let mut data = self.data.write().await;
        self.commit(&mut data, |d| match d.config.as_mut() {
            Some(config) => {
                config.last_post_title = Some(title.to_string());
                Ok(())
            }
            None => Err(crate::ForumWatchError::ConfigMissing),
        })
        .await
    }

    async fn status(&self) -> crate::Result<RunStatus> {
        Ok(self.data.read().await.status.clone())
    }

    async fn update_status(
        &self,
        mutation: StatusMutation,
        now: DateTime<Utc>,
    ) -> crate::Result<RunStatus> {
        let mut data = self.data.write().await;
        self.commit(&mut data, |d| {
            mutation(&mut d.status);
            d.status.updated_at = Some(now);
            Ok(d.status.clone())
        })
        .await
    }

    async fn append_notification(
        &self,
        message: &str,
        kind: NotificationKind,
        now: DateTime<Utc>,
    ) -> crate::Result<NotificationRecord> {
        let mut data = self.data.write().await;
        let history_size = self.history_size;
        self.commit(&mut data, |d| {
            d.next_notification_id += 1;
            let record = NotificationRecord {
                id: d.next_notification_id,
                message: message.to_string(),
                kind,
                created_at: now,
            };
            if d.notifications.len() >= history_size {
                d.notifications.pop_front();
            }
            d.notifications.push_back(record.clone());
            Ok(record)
        })
        .await
    }

    async fn notifications(&self, limit: usize) -> crate::Result<Vec<NotificationRecord>> {
        let data = self.data.read().await;
        Ok(data.notifications.iter().rev().take(limit).cloned().collect())
    }
}
