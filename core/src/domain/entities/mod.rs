//! Domain entities: refresh token records, derived access claims and bus envelopes.

pub mod envelope;
pub mod token;

// Re-export commonly used types
pub use envelope::{CommandEnvelope, CommandResponse, Envelope};
pub use token::{
    AccessTokenClaims, RefreshTokenClaims, RefreshTokenRecord, TokenPair, TOKEN_TYPE_ACCESS,
    TOKEN_TYPE_REFRESH,
};
