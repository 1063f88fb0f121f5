//! # Infrastructure Layer
//!
//! Concrete adapters for the connection platform auth node:
//! - **Bus**: in-process command bus implementing `CommandBus`
//! - **Database**: MySQL refresh token store using SQLx
//! - **Telemetry**: tracing subscriber setup
//!
//! ## Features
//!
//! - `mysql`: Enable the MySQL refresh token store (default)

// Re-export core types for convenience
pub use conn_core::errors::*;

/// Command bus adapters
pub mod bus;

/// Database module - MySQL implementations using SQLx
#[cfg(feature = "mysql")]
pub mod database;

/// Tracing subscriber installation
pub mod telemetry;

pub use bus::InMemoryCommandBus;
#[cfg(feature = "mysql")]
pub use database::{DatabasePool, MySqlRefreshTokenStore};

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Database connection error
    #[cfg(feature = "mysql")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Tracing subscriber could not be installed
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// General infrastructure error
    #[error("Infrastructure error: {0}")]
    General(String),
}
