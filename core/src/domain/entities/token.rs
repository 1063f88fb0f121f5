//! Token entities for refresh token rotation and access token derivation.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token type claim for access tokens
pub const TOKEN_TYPE_ACCESS: &str = "ACCESS";

/// Token type claim for refresh tokens
pub const TOKEN_TYPE_REFRESH: &str = "REFRESH";

/// Refresh token record stored in the refresh token store
///
/// The record is the source of truth. The signed token string handed to a
/// client is a projection of it produced by a `TokenCodec`, and is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    /// Unique identifier, generated at creation
    pub id: Uuid,

    /// Client this token belongs to
    pub client_id: Uuid,

    /// Timestamp when the token was created
    pub created_at: DateTime<Utc>,

    /// Timestamp when the token expires, always after `created_at`
    pub expires_at: DateTime<Utc>,

    /// Whether the token has been revoked; never reverts to `false`
    pub revoked: bool,
}

impl RefreshTokenRecord {
    /// Creates a new active record with a freshly generated id
    ///
    /// # Arguments
    ///
    /// * `client_id` - The owning client's UUID
    /// * `now` - Creation instant
    /// * `ttl` - Lifetime, must be positive
    pub fn new(client_id: Uuid, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self::with_id(Uuid::new_v4(), client_id, now, ttl)
    }

    /// Creates a new active record with an explicit id
    pub fn with_id(id: Uuid, client_id: Uuid, now: DateTime<Utc>, ttl: Duration) -> Self {
        debug_assert!(ttl > Duration::zero(), "refresh token ttl must be positive");
        Self {
            id,
            client_id,
            created_at: now,
            expires_at: now + ttl,
            revoked: false,
        }
    }

    /// Whether the token is past its expiry at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// A token is active if it is neither revoked nor expired
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && !self.is_expired_at(now)
    }

    /// Revokes the record
    pub fn revoke(&mut self) {
        self.revoked = true;
    }

    /// Time remaining until expiration, or zero if expired
    pub fn time_until_expiration(&self, now: DateTime<Utc>) -> Duration {
        if self.expires_at > now {
            self.expires_at - now
        } else {
            Duration::zero()
        }
    }

    /// Claims carried by the signed projection of this record
    pub fn claims(&self) -> RefreshTokenClaims {
        RefreshTokenClaims {
            token_id: self.id,
            client_id: self.client_id,
            issued_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

/// Claims recovered from a signed refresh token
///
/// These only identify a record; whether it is still usable is decided by the
/// stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    pub token_id: Uuid,
    pub client_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Access token claims, derived and never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Client the token was issued to
    pub client_id: Uuid,

    /// Issued at timestamp
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
}

impl AccessTokenClaims {
    /// Derives access claims from the client, the current instant and the configured TTL
    pub fn derive(client_id: Uuid, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            client_id,
            issued_at: now,
            expires_at: now + ttl,
        }
    }

    /// Checks if the claims have expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Token pair returned to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Signed access token
    pub access_token: String,

    /// Signed refresh token
    pub refresh_token: String,

    /// Id of the refresh token record backing `refresh_token`
    pub refresh_token_id: Uuid,

    /// Access token expiry instant
    pub access_expires_at: DateTime<Utc>,

    /// Refresh token expiry instant
    pub refresh_expires_at: DateTime<Utc>,
}

impl TokenPair {
    /// Creates a token pair from signed strings and their sources
    pub fn new(
        access_token: String,
        access: &AccessTokenClaims,
        refresh_token: String,
        refresh: &RefreshTokenRecord,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            refresh_token_id: refresh.id,
            access_expires_at: access.expires_at,
            refresh_expires_at: refresh.expires_at,
        }
    }

    /// Access token lifetime left at `now`, in seconds
    pub fn access_expires_in(&self, now: DateTime<Utc>) -> i64 {
        (self.access_expires_at - now).num_seconds().max(0)
    }

    /// Refresh token lifetime left at `now`, in seconds
    pub fn refresh_expires_in(&self, now: DateTime<Utc>) -> i64 {
        (self.refresh_expires_at - now).num_seconds().max(0)
    }
}
