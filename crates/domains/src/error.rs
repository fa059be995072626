//! # DomainError
//!
//! Centralized error taxonomy shared by the store, the HTTP layer and the
//! Local Mirror.

use thiserror::Error;

use crate::models::OptionId;

/// The primary error type for all poll and vote operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed create or vote request (e.g., empty question)
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Poll id unknown to the store
    #[error("poll {0} not found")]
    NotFound(String),

    /// The session or device already has a vote on this poll
    #[error("{0}")]
    Conflict(String),

    /// The option id does not exist on the poll
    #[error("invalid option {0}")]
    InvalidOption(OptionId),

    /// Infrastructure failure (e.g., unreadable store file)
    #[error("storage error: {0}")]
    Storage(String),

    /// The Authoritative Store could not be reached
    #[error("network error: {0}")]
    Network(String),
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

/// A specialized Result type for PollStream domain logic.
pub type Result<T> = std::result::Result<T, DomainError>;
