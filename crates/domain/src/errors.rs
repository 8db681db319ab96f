//! Error taxonomy surfaced by the Horizon client.

use thiserror::Error;

/// Main error type for Horizon operations.
///
/// Transport faults and service error codes are classified once by the
/// retry layer and translated once into these variants; validation errors
/// are raised before any network call is made.
#[derive(Error, Debug)]
pub enum HorizonError {
    /// Client-side contract violation. Never sent over the wire.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid credentials. Fatal, never retried.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Target dataset or series does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Target is in a transitional state (e.g. being deleted) that is
    /// incompatible with the requested operation.
    #[error("Invalid dataset state: {0}")]
    InvalidState(String),

    /// Transient remote or network failure, surfaced only after the retry
    /// policy has exhausted its attempts.
    #[error("Service failure: {0}")]
    Service(String),

    /// Operation aborted by a caller-supplied cancellation signal.
    #[error("Operation cancelled")]
    Cancelled,

    /// A configured overall deadline elapsed before the operation completed.
    #[error("Deadline exceeded after {0:?}")]
    DeadlineExceeded(std::time::Duration),

    /// Invalid client construction or configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for Horizon operations.
pub type Result<T> = std::result::Result<T, HorizonError>;
