//! Error types for the fraud engine

use thiserror::Error;

/// Fraud engine error
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or out-of-domain input field
    #[error("Invalid {field}: {reason}")]
    Validation {
        /// Name of the first failing field
        field: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// Transaction id not present in the store
    #[error("Transaction not found: {0}")]
    TransactionNotFound(u64),

    /// Card has no transaction history
    #[error("No transactions found for card {0}")]
    CardNotFound(String),

    /// Registry entry does not exist
    #[error("Registry entry not found: {0}")]
    RegistryEntryNotFound(String),

    /// Registry entry already exists
    #[error("Registry entry already exists: {0}")]
    DuplicateRegistryEntry(String),

    /// Feedback repeats the recorded verdict
    #[error("Feedback {feedback} matches the recorded verdict of transaction {transaction_id}")]
    FeedbackMatchesVerdict {
        /// Transaction the feedback targets
        transaction_id: u64,
        /// Submitted outcome
        feedback: String,
    },

    /// Transaction already carries feedback
    #[error("Feedback already recorded for transaction {0}")]
    FeedbackAlreadyRecorded(u64),

    /// Registry or history lookup could not be completed
    #[error("Collaborator failure: {0}")]
    Collaborator(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification used by boundary layers to pick a response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Client input error, never retried
    Validation,
    /// Referenced entity does not exist
    NotFound,
    /// Request conflicts with recorded state
    Conflict,
    /// External collaborator failed
    Unavailable,
    /// Configuration or IO failure
    Internal,
}

impl ErrorKind {
    /// Stable upper-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Unavailable => "UNAVAILABLE",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }
}

impl Error {
    /// Shorthand for a validation failure on `field`
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Error::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Map onto the three-way client taxonomy plus server-side failures
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation { .. } => ErrorKind::Validation,
            Error::TransactionNotFound(_)
            | Error::CardNotFound(_)
            | Error::RegistryEntryNotFound(_) => ErrorKind::NotFound,
            Error::DuplicateRegistryEntry(_)
            | Error::FeedbackMatchesVerdict { .. }
            | Error::FeedbackAlreadyRecorded(_) => ErrorKind::Conflict,
            Error::Collaborator(_) => ErrorKind::Unavailable,
            Error::InvalidConfig(_) | Error::Io(_) => ErrorKind::Internal,
        }
    }
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
