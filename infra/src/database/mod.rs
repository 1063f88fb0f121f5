//! Database module - MySQL implementations using SQLx
//!
//! - Connection pool management
//! - Refresh token store with transactional rotation
//! - Schema bootstrap

pub mod connection;
pub mod mysql;


// Re-export commonly used types
pub use connection::{DatabasePool, PoolStatistics};
pub use mysql::MySqlRefreshTokenStore;
