use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Price unavailable for {0}")]
    PriceUnavailable(String),

    #[error("Invalid alarm: {0}")]
    Validation(String),

    #[error("Notification failed: {0}")]
    Notification(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Scheduler is already running")]
    AlreadyRunning,

    #[error("Exchange API error: {0}")]
    Exchange(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
