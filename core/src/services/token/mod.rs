//! Refresh token lifecycle
//!
//! - Refresh token issuance, rotation and revocation on top of a store
//! - Access token derivation
//! - Token string signing and parsing through a `TokenCodec`
//! - Background cleanup of expired records

mod cleanup;
mod codec;
mod config;
mod service;

#[cfg(test)]
mod tests;

pub use cleanup::{CleanupResult, CleanupWorker, TokenCleanupConfig, TokenCleanupService};
pub use codec::{JwtTokenCodec, TokenCodec};
pub use config::TokenLifecycleConfig;
pub use service::TokenLifecycleManager;
