//! # Connection Core
//!
//! Core domain layer for the connection platform services.
//! This crate contains the refresh token lifecycle (issuance, rotation,
//! revocation, cleanup), the command/response correlation protocol used on the
//! shared command bus, the repository and transport interfaces both rely on,
//! and the error types that tie them together.

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::entities::{
    AccessTokenClaims, CommandEnvelope, CommandResponse, Envelope, RefreshTokenClaims,
    RefreshTokenRecord, TokenPair,
};
pub use errors::{CommandError, DomainError, DomainResult, ErrorKind, TokenError};
pub use repositories::{InMemoryRefreshTokenStore, RefreshTokenStore};
pub use services::messaging::{
    AuthCommandClient, AuthCommandHandler, CallState, CommandBus, CommandDispatcher,
    CommandHandler, CommandResponder, CorrelationRouter, DispatcherConfig, EnvelopeHandler,
};
pub use services::token::{
    JwtTokenCodec, TokenCleanupConfig, TokenCleanupService, TokenCodec, TokenLifecycleConfig,
    TokenLifecycleManager,
};
pub use services::{Clock, ManualClock, SystemClock};
