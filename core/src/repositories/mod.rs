//! Storage seams for domain records.

pub mod token;

pub use token::{InMemoryRefreshTokenStore, RefreshTokenStore};
