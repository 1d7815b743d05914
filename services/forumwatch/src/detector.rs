//! Change detection: fetch the newest post, compare with the stored one, notify on change

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::fetcher::PageFetcher;
use crate::notifier::{deliver, record, Notifier};
use crate::records::NotificationKind;
use crate::store::RecordStore;
use crate::telegram::escape_html;

/// How a freshly fetched post relates to the stored one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// Nothing stored yet, the fetched post becomes the baseline
    Baseline,
    /// The fetched post differs from the stored one
    NewPost,
    Unchanged,
}

/// Compare the stored identifier against the fetched one
pub fn detect(previous: Option<&str>, fetched: &str) -> Detection {
    match previous {
        None => Detection::Baseline,
        Some(previous) if previous != fetched => Detection::NewPost,
        Some(_) => Detection::Unchanged,
    }
}

/// Result of one check, as reported to API callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
    pub success: bool,
    pub new_post: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckOutcome {
    fn succeeded(new_post: bool) -> Self {
        Self {
            success: true,
            new_post,
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            success: false,
            new_post: false,
            error: Some(error),
        }
    }

    /// Human readable summary used by the manual-check endpoint
    pub fn summary(&self) -> &'static str {
        if self.new_post {
            "New post detected!"
        } else if self.success {
            "No new posts found"
        } else {
            "Check failed"
        }
    }
}

/// Runs the fetch, compare, notify flow; at most one check runs at a time
#[derive(Debug)]
pub struct ChangeDetector {
    store: Arc<dyn RecordStore>,
    fetcher: Arc<dyn PageFetcher>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    in_flight: Mutex<()>,
}

impl ChangeDetector {
    pub fn new(
        store: Arc<dyn RecordStore>,
        fetcher: Arc<dyn PageFetcher>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            fetcher,
            notifier,
            clock,
            in_flight: Mutex::new(()),
        }
    }

    /// Run one check. Fetch failures are recorded and reported in the
    /// outcome; only record store failures are returned as errors.
    pub async fn check(&self) -> crate::Result<CheckOutcome> {
        let _guard = self.in_flight.lock().await;

        let config = self.store.config().await?;
        let now = self.clock.now();
        self.store
            .update_status(Box::new(move |s| s.last_check_at = Some(now)), now)
            .await?;

        let fetched = match config {
            Some(config) => self
                .fetcher
                .fetch_first_post(&config.forum_url)
                .await
                .map(|text| (text, config.last_post_title)),
            None => Err(crate::ForumWatchError::Fetch(
                "Forum URL not configured".to_string(),
            )),
        };

        match fetched {
            Ok((title, _)) if title.trim().is_empty() => {
                self.record_failure("Found post but title is empty".to_string())
                    .await
            }
            Ok((title, previous)) => self.record_success(title, previous).await,
            Err(e) => self.record_failure(fetch_message(e)).await,
        }
    }

    async fn record_success(
        &self,
        title: String,
        previous: Option<String>,
    ) -> crate::Result<CheckOutcome> {
        let now = self.clock.now();
        self.store
            .update_status(
                Box::new(move |s| {
                    s.last_successful_check_at = Some(now);
                    s.last_error = None;
                }),
                now,
            )
            .await?;

        match detect(previous.as_deref(), &title) {
            Detection::Baseline => {
                tracing::info!("Baseline captured: {:?}", title);
                self.store.set_last_post_title(&title).await?;
                record(
                    self.store.as_ref(),
                    "Initial post title captured. Monitoring started.",
                    NotificationKind::Info,
                    now,
                )
                .await;
                Ok(CheckOutcome::succeeded(false))
            }
            Detection::NewPost => {
                tracing::info!("New post detected: {:?}", title);
                self.store.set_last_post_title(&title).await?;
                let message = format!(
                    "🆕 <b>New post on the forum</b>\n\n{}",
                    escape_html(&title)
                );
                deliver(
                    self.notifier.as_ref(),
                    self.store.as_ref(),
                    self.clock.as_ref(),
                    &message,
                )
                .await;
                record(
                    self.store.as_ref(),
                    &format!("New post detected: {}", title),
                    NotificationKind::NewPost,
                    self.clock.now(),
                )
                .await;
                Ok(CheckOutcome::succeeded(true))
            }
            Detection::Unchanged => {
                tracing::debug!("No new post");
                Ok(CheckOutcome::succeeded(false))
            }
        }
    }

    async fn record_failure(&self, error: String) -> crate::Result<CheckOutcome> {
        tracing::warn!("Check failed: {}", error);
        let now = self.clock.now();
        let stored = error.clone();
        self.store
            .update_status(Box::new(move |s| s.last_error = Some(stored)), now)
            .await?;
        record(
            self.store.as_ref(),
            &format!("Scraping error: {}", error),
            NotificationKind::Error,
            now,
        )
        .await;
        Ok(CheckOutcome::failed(error))
    }
}

fn fetch_message(e: crate::ForumWatchError) -> String {
    match e {
        crate::ForumWatchError::Fetch(msg) => msg,
        other => other.to_string(),
    }
}
