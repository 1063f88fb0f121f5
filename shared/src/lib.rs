//! Shared configuration and common definitions for the connection platform
//!
//! This crate provides functionality used across all server modules:
//! - Configuration types and loading (token lifetimes, messaging, database, logging)
//! - Configuration validation errors
//! - Error code constants carried on the command bus

pub mod config;
pub mod errors;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, DatabaseConfig, Environment, LogFormat, LoggingConfig, MessagingConfig,
    TokenConfig,
};
pub use errors::{error_codes, ConfigError};
