//! Common error types for flashgen

use thiserror::Error;

/// Common result type for flashgen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for the generation workflow
///
/// The split between `Transport` and `Protocol` matters: the polling loop
/// retries transport faults transparently, while a protocol violation stops
/// the loop and is surfaced with the workflow step held steady.
#[derive(Error, Debug)]
pub enum Error {
    /// Network-level failure (unreachable backend, timeout, non-2xx status)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Backend response violated the job API contract
    /// (malformed body, missing taskId, missing retrievalToken on SUCCESS)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Backend reported a terminal task failure (FAILURE or REVOKED)
    #[error("Task ended in state {0}")]
    TaskFailed(String),

    /// Operation not valid for the current workflow step
    #[error("Invalid transition: {action} not allowed from {step}")]
    InvalidTransition { step: String, action: &'static str },

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization of persisted state failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// True for faults the polling loop recovers from on the next tick
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}
