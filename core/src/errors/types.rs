//! Tagged error types for the token lifecycle and the command protocol
//!
//! Each domain has one error struct carrying a kind, the identifier of the
//! subject the error is about, and an optional description.

use conn_shared::error_codes;
use std::fmt;
use thiserror::Error;

/// Failure category shared by token and command errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The token or correlation id is absent
    NotFound,
    /// An id collided with an existing one
    Duplicate,
    /// A state precondition was violated (e.g. rotating a revoked token)
    Invalid,
    /// No response arrived before the deadline
    Timeout,
    /// The publish/subscribe layer failed
    Transport,
    /// The remote handler answered with a failure
    Rejected,
    /// The backing store failed
    Storage,
}

impl ErrorKind {
    /// Stable code used on the wire and in logs
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => error_codes::NOT_FOUND,
            ErrorKind::Duplicate => error_codes::DUPLICATE,
            ErrorKind::Invalid => error_codes::INVALID,
            ErrorKind::Timeout => error_codes::TIMEOUT,
            ErrorKind::Transport => error_codes::TRANSPORT_FAILURE,
            ErrorKind::Rejected => error_codes::REJECTED,
            ErrorKind::Storage => error_codes::STORAGE_ERROR,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::Duplicate => "duplicate",
            ErrorKind::Invalid => "invalid",
            ErrorKind::Timeout => "timed out",
            ErrorKind::Transport => "transport failure",
            ErrorKind::Rejected => "rejected",
            ErrorKind::Storage => "storage failure",
        };
        f.write_str(text)
    }
}

fn describe(description: &Option<String>) -> String {
    match description {
        Some(text) => format!(": {}", text),
        None => String::new(),
    }
}

/// Refresh token lifecycle error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("refresh token {subject} {kind}{}", describe(.description))]
pub struct TokenError {
    pub kind: ErrorKind,
    /// Token id (or client id / raw token marker) the error is about
    pub subject: String,
    pub description: Option<String>,
}

impl TokenError {
    pub fn new(kind: ErrorKind, subject: impl ToString, description: Option<String>) -> Self {
        Self {
            kind,
            subject: subject.to_string(),
            description,
        }
    }

    /// The record is absent from the store
    pub fn not_found(id: impl ToString) -> Self {
        Self::new(ErrorKind::NotFound, id, None)
    }

    /// A record with the same id already exists
    pub fn duplicate(id: impl ToString) -> Self {
        Self::new(ErrorKind::Duplicate, id, None)
    }

    /// The record is revoked, expired or otherwise unusable for the operation
    pub fn invalid(id: impl ToString, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Invalid, id, Some(reason.into()))
    }

    /// The store failed while handling the subject
    pub fn storage(subject: impl ToString, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, subject, Some(reason.into()))
    }

    /// A token string could not be signed or parsed
    pub fn codec(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Invalid, "<token>", Some(reason.into()))
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    pub fn is_duplicate(&self) -> bool {
        self.kind == ErrorKind::Duplicate
    }

    pub fn is_invalid(&self) -> bool {
        self.kind == ErrorKind::Invalid
    }
}

/// Command dispatch and correlation error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("command {subject} {kind}{}", describe(.description))]
pub struct CommandError {
    pub kind: ErrorKind,
    /// Correlation id, or topic name for transport failures
    pub subject: String,
    pub description: Option<String>,
}

impl CommandError {
    pub fn new(kind: ErrorKind, subject: impl ToString, description: Option<String>) -> Self {
        Self {
            kind,
            subject: subject.to_string(),
            description,
        }
    }

    /// The correlation id is already registered or was recently finished
    pub fn duplicate_correlation(correlation_id: impl ToString) -> Self {
        Self::new(ErrorKind::Duplicate, correlation_id, None)
    }

    /// No response arrived before the deadline
    pub fn timeout(correlation_id: impl ToString) -> Self {
        Self::new(ErrorKind::Timeout, correlation_id, None)
    }

    /// Publishing or subscribing failed
    pub fn transport(subject: impl ToString, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, subject, Some(reason.into()))
    }

    /// The remote handler answered `success = false`
    pub fn rejected(correlation_id: impl ToString, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Rejected, correlation_id, Some(message.into()))
    }

    /// The correlation id is unknown
    pub fn not_found(correlation_id: impl ToString) -> Self {
        Self::new(ErrorKind::NotFound, correlation_id, None)
    }

    /// A payload could not be encoded or decoded
    pub fn invalid(subject: impl ToString, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Invalid, subject, Some(reason.into()))
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }

    pub fn is_transport(&self) -> bool {
        self.kind == ErrorKind::Transport
    }
}
