//! Error types for the forumwatch service

/// Errors that can occur in the forumwatch service
#[derive(Debug, thiserror::Error)]
pub enum ForumWatchError {
    #[error("Configuration not found")]
    ConfigMissing,

    #[error("Service is already running")]
    AlreadyRunning,

    #[error("Service is not running")]
    NotRunning,

    #[error("Invalid configuration: {0}")]
    Validation(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Notification failed: {0}")]
    Notify(String),

    #[error("Service stalled: {0}")]
    Stalled(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ForumWatchError {
    /// Whether the error was caused by the caller (lifecycle misuse or bad input)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ForumWatchError::ConfigMissing
                | ForumWatchError::AlreadyRunning
                | ForumWatchError::NotRunning
                | ForumWatchError::Validation(_)
        )
    }
}

/// Result type alias for forumwatch operations
pub type Result<T> = std::result::Result<T, ForumWatchError>;
