//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, conflicts). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. a blank required field).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated (e.g. an illegal state transition).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// A conflict occurred (e.g. duplicate creation, stale version).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}

/// Reject blank (empty or whitespace-only) required text.
pub fn require_non_blank(field: &str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be blank")));
    }
    Ok(())
}

/// Fatal failure while rebuilding an aggregate from its stored history.
///
/// None of these are recoverable: a partially replayed aggregate must never be
/// handed to a caller, since access decisions would trust its state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconstructionError {
    /// The stored event type has no counterpart in the aggregate's event enum.
    #[error("unrecognized event type '{event_type}' at sequence {sequence_number}")]
    UnknownEventType {
        event_type: String,
        sequence_number: u64,
    },

    /// The payload could not be decoded into the aggregate's event enum.
    #[error("undecodable payload at sequence {sequence_number}: {reason}")]
    Undecodable { sequence_number: u64, reason: String },

    /// The event decoded but fails its own validation or cannot be applied to
    /// the state rebuilt so far.
    #[error("rejected event at sequence {sequence_number}: {reason}")]
    Rejected { sequence_number: u64, reason: String },

    /// The stream is not strictly increasing from 1.
    #[error("non-monotonic stream (last={last}, found={found})")]
    OutOfOrder { last: u64, found: u64 },
}
