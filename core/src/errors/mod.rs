//! Domain-specific error types and error handling.

mod types;


// Re-export all error types
pub use types::{CommandError, ErrorKind, TokenError};

use thiserror::Error;

/// Core domain errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Internal error: {message}")]
    Internal { message: String },

    // Bridge to specific error types
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Command(#[from] CommandError),
}

impl DomainError {
    /// Failure category, if the error came from a tagged domain error
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            DomainError::Internal { .. } => None,
            DomainError::Token(err) => Some(err.kind),
            DomainError::Command(err) => Some(err.kind),
        }
    }

    /// Code placed in failed command responses
    pub fn code(&self) -> &'static str {
        self.kind()
            .map(|kind| kind.code())
            .unwrap_or(conn_shared::error_codes::INTERNAL_ERROR)
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
