//! MySQL implementations of core repository traits

pub mod refresh_token_store;

pub use refresh_token_store::MySqlRefreshTokenStore;
