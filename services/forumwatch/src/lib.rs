//! Forumwatch - forum post watcher with Telegram notifications
//!
//! Polls a forum page for its first discussion row, notifies an operator chat
//! when it changes, and exposes a JSON control API for the lifecycle.

pub mod api;
pub mod clock;
pub mod config;
pub mod controller;
pub mod detector;
pub mod error;
pub mod fetcher;
pub mod io;
pub mod notifier;
pub mod records;
pub mod schedule;
pub mod store;
pub mod telegram;

pub use config::{load_config, Config};
pub use controller::{Controller, ControllerSettings, RunState, WatchdogVerdict};
pub use error::{ForumWatchError, Result};

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::clock::{Clock, SystemClock};
use crate::fetcher::{ForumPageFetcher, PageFetcher};
use crate::io::{HttpClient, ReqwestHttpClient};
use crate::notifier::Notifier;
use crate::store::{JsonStore, RecordStore};
use crate::telegram::TelegramNotifier;

/// Builder for the forumwatch service.
///
/// The HTTP client and record store can be swapped out; anything left unset
/// is built from the configuration.
pub struct ForumWatchBuilder {
    config: Config,
    http: Option<Arc<dyn HttpClient>>,
    store: Option<Arc<dyn RecordStore>>,
    cancel: Option<CancellationToken>,
}

impl ForumWatchBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            http: None,
            store: None,
            cancel: None,
        }
    }

    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    /// Use a pre-built record store. Seeding from the config is skipped.
    pub fn with_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub async fn build(self) -> Result<ForumWatch> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let http: Arc<dyn HttpClient> = match self.http {
            Some(http) => http,
            None => Arc::new(ReqwestHttpClient::new(
                self.config.monitor.fetch_timeout,
                &self.config.monitor.user_agent,
            )?),
        };

        let store: Arc<dyn RecordStore> = match self.store {
            Some(store) => store,
            None => {
                let store = match &self.config.store.path {
                    Some(path) => {
                        tracing::info!("Opening record store at {:?}", path);
                        JsonStore::open(path, self.config.store.history_size).await?
                    }
                    None => {
                        tracing::warn!(
                            "No store path configured, records will not survive a restart"
                        );
                        JsonStore::in_memory(self.config.store.history_size)
                    }
                };
                store.initialize(&self.config.seed, clock.now()).await?;
                Arc::new(store)
            }
        };

        let fetcher: Arc<dyn PageFetcher> = Arc::new(ForumPageFetcher::new(Arc::clone(&http)));
        let notifier: Arc<dyn Notifier> =
            Arc::new(TelegramNotifier::new(&self.config.telegram, http));
        let cancel = self.cancel.unwrap_or_default();

        let controller = Controller::new(
            store,
            fetcher,
            notifier,
            clock,
            ControllerSettings::from(&self.config.monitor),
            cancel.clone(),
        );

        Ok(ForumWatch {
            config: self.config,
            controller,
            cancel,
        })
    }
}

/// A fully wired service, ready to bind
pub struct ForumWatch {
    config: Config,
    controller: Controller,
    cancel: CancellationToken,
}

impl ForumWatch {
    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Bind the API listener without serving yet
    pub async fn bind(self) -> Result<BoundForumWatch> {
        let addr: SocketAddr = format!(
            "{}:{}",
            self.config.server.bind_address, self.config.server.port
        )
        .parse()
        .map_err(|e| {
            ForumWatchError::Config(format!(
                "Invalid bind address {}:{}: {}",
                self.config.server.bind_address, self.config.server.port, e
            ))
        })?;

        let listener = tokio::net::TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Bound forumwatch API bound_addr={}", local_addr);

        Ok(BoundForumWatch {
            listener,
            local_addr,
            resume_on_boot: self.config.monitor.resume_on_boot,
            controller: self.controller,
            cancel: self.cancel,
        })
    }

    /// Bind and serve until Ctrl-C or cancellation
    pub async fn start(self) -> Result<()> {
        self.bind().await?.run().await
    }
}

/// A service whose listener is bound
pub struct BoundForumWatch {
    listener: tokio::net::TcpListener,
    local_addr: SocketAddr,
    resume_on_boot: bool,
    controller: Controller,
    cancel: CancellationToken,
}

impl BoundForumWatch {
    pub fn listen_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Resume a previous run if needed, then serve the API until cancelled
    pub async fn run(self) -> Result<()> {
        let state = self.controller.resume(self.resume_on_boot).await?;
        tracing::info!("Forumwatch started, monitoring {:?}", state);

        let cancel_for_signal = self.cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown signal received");
                    cancel_for_signal.cancel();
                }
                Err(e) => tracing::warn!("Failed to listen for ctrl-c: {}", e),
            }
        });

        let router = api::build_router(self.controller.clone());
        let cancel = self.cancel.clone();
        axum::serve(self.listener, router)
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
            })
            .await?;

        self.controller.shutdown().await;
        tracing::info!("Forumwatch stopped");
        Ok(())
    }
}
