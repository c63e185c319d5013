// Central Error Type for the Application

use crate::port::{BrokerError, NotifyError, QueueError, StoreError};
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Job store error: {0}")]
    Store(#[from] StoreError),

    #[error("Work queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Short, stable name of the error class (used as a log field)
    pub fn class(&self) -> &'static str {
        match self {
            AppError::Domain(_) => "domain",
            AppError::Store(e) => e.class(),
            AppError::Queue(e) => e.class(),
            AppError::Broker(e) => e.class(),
            AppError::Notify(e) => e.class(),
            AppError::Validation(_) => "validation",
            AppError::Database(_) => "database",
            AppError::Serialization(_) => "serialization",
            AppError::Config(_) => "config",
            AppError::Upstream(_) => "upstream",
            AppError::NotFound(_) => "not_found",
            AppError::InvalidState(_) => "invalid_state",
            AppError::Internal(_) => "internal",
        }
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// External operation an error was raised from.
///
/// The operation, not the error itself, decides whether a failure may cross
/// the component boundary. Side channels (events, mail, chat, probes) never
/// cross it and report through their own return values instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Submit,
    Cancel,
    StoreRead,
    StoreWrite,
    StoreDelete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Submit => "queue.submit",
            Operation::Cancel => "queue.cancel",
            Operation::StoreRead => "store.get",
            Operation::StoreWrite => "store.set",
            Operation::StoreDelete => "store.delete",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified failure of an external operation
#[derive(Debug)]
pub enum Failure {
    /// Logged and swallowed at the component boundary
    Recoverable(AppError),
    /// Surfaced to the caller
    Fatal(AppError),
}

impl Failure {
    /// Classify an error by the operation it came from.
    ///
    /// Only a failed work-queue submission is fatal: without a handle no
    /// reminder will ever fire and nothing can be revoked later.
    pub fn classify(op: Operation, err: impl Into<AppError>) -> Self {
        let err = err.into();
        match op {
            Operation::Submit => Failure::Fatal(err),
            _ => Failure::Recoverable(err),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Failure::Fatal(_))
    }

    pub fn into_error(self) -> AppError {
        match self {
            Failure::Recoverable(e) | Failure::Fatal(e) => e,
        }
    }
}
