//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Persistence failure when interacting with the task store.
    Db(String),
    /// Submitted task content failed acceptability checks.
    Validation(String),
    /// Submission payload could not be parsed.
    Binding(String),
    /// Requested entity does not exist.
    NotFound(String),
    /// Task has reached its open-count limit.
    LimitExceeded(String),
    /// Notifier transport failure or rejected delivery.
    Dispatch(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Db(msg) => write!(f, "db: {msg}"),
            Self::Validation(msg) => write!(f, "validation: {msg}"),
            Self::Binding(msg) => write!(f, "binding: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            Self::Dispatch(msg) => write!(f, "dispatch: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Db(err.to_string())
    }
}
