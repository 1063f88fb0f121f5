//! Refresh token lifecycle: issuance, rotation, revocation and cleanup

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::entities::token::{AccessTokenClaims, RefreshTokenRecord, TokenPair};
use crate::errors::TokenError;
use crate::repositories::RefreshTokenStore;
use crate::services::clock::Clock;

use super::codec::TokenCodec;
use super::config::TokenLifecycleConfig;

/// Orchestrates refresh token state on top of a `RefreshTokenStore`
///
/// Races between concurrent rotations are reported to the caller and never
/// retried here. The only retry is on a generated id colliding with a stored
/// one, bounded by `max_issue_attempts`.
pub struct TokenLifecycleManager<S: RefreshTokenStore> {
    store: Arc<S>,
    codec: Arc<dyn TokenCodec>,
    clock: Arc<dyn Clock>,
    config: TokenLifecycleConfig,
}

impl<S: RefreshTokenStore> TokenLifecycleManager<S> {
    /// Creates a new lifecycle manager
    ///
    /// # Arguments
    ///
    /// * `store` - Refresh token persistence
    /// * `codec` - Signs and parses token strings
    /// * `clock` - Source of the current instant
    /// * `config` - Lifetimes and retry limits
    pub fn new(
        store: Arc<S>,
        codec: Arc<dyn TokenCodec>,
        clock: Arc<dyn Clock>,
        config: TokenLifecycleConfig,
    ) -> Self {
        Self {
            store,
            codec,
            clock,
            config,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &TokenLifecycleConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn attempts(&self) -> u32 {
        self.config.max_issue_attempts.max(1)
    }

    /// Issues a new refresh token record for a client
    ///
    /// # Returns
    ///
    /// * `Ok(RefreshTokenRecord)` - The stored, active record
    /// * `Err(TokenError)` - kind `Duplicate` if every generated id collided,
    ///   or the store failure
    pub async fn issue(&self, client_id: Uuid) -> Result<RefreshTokenRecord, TokenError> {
        let mut last_err = TokenError::duplicate(client_id);

        for attempt in 1..=self.attempts() {
            let record = RefreshTokenRecord::new(client_id, self.now(), self.config.refresh_ttl);

            match self.store.add(record.clone()).await {
                Ok(()) => {
                    info!(
                        client_id = %client_id,
                        token_id = %record.id,
                        expires_at = %record.expires_at,
                        "Issued refresh token"
                    );
                    return Ok(record);
                }
                Err(e) if e.is_duplicate() => {
                    warn!(client_id = %client_id, attempt, "Refresh token id collision, regenerating");
                    last_err = e;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err)
    }

    /// Replaces an active refresh token with a new one for the same client
    ///
    /// The predecessor is revoked and the successor inserted in a single
    /// `swap`. Losing a race against another rotation of the same record
    /// surfaces as `Invalid` (already revoked) or `NotFound` (already deleted).
    pub async fn rotate(
        &self,
        old: &RefreshTokenRecord,
        client_id: Uuid,
    ) -> Result<RefreshTokenRecord, TokenError> {
        let now = self.now();

        if old.client_id != client_id {
            return Err(TokenError::invalid(old.id, "token belongs to another client"));
        }
        if old.revoked {
            return Err(TokenError::invalid(old.id, "already rotated or revoked"));
        }
        if old.is_expired_at(now) {
            return Err(TokenError::invalid(old.id, "expired"));
        }

        let mut last_err = TokenError::duplicate(old.id);

        for attempt in 1..=self.attempts() {
            let successor = RefreshTokenRecord::new(client_id, now, self.config.refresh_ttl);

            match self.store.swap(old.id, successor.clone(), now).await {
                Ok(()) => {
                    info!(
                        client_id = %client_id,
                        old_token_id = %old.id,
                        new_token_id = %successor.id,
                        "Rotated refresh token"
                    );
                    return Ok(successor);
                }
                Err(e) if e.is_duplicate() && e.subject == successor.id.to_string() => {
                    warn!(client_id = %client_id, attempt, "Successor id collision, regenerating");
                    last_err = e;
                }
                Err(e) => {
                    if e.is_invalid() || e.is_not_found() {
                        warn!(
                            client_id = %client_id,
                            token_id = %old.id,
                            error = %e,
                            "Refresh token rotation lost"
                        );
                    }
                    return Err(e);
                }
            }
        }

        Err(last_err)
    }

    /// Revokes a single record; revoking twice succeeds
    pub async fn revoke(&self, record: &RefreshTokenRecord) -> Result<(), TokenError> {
        self.store.mark_revoked(record.id).await?;
        info!(client_id = %record.client_id, token_id = %record.id, "Revoked refresh token");
        Ok(())
    }

    /// Revokes every active record of a client
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of records revoked, zero when none were active
    pub async fn revoke_all(&self, client_id: Uuid) -> Result<usize, TokenError> {
        let count = self.store.revoke_all_for_client(client_id).await?;
        info!(client_id = %client_id, count, "Revoked all refresh tokens for client");
        Ok(count)
    }

    /// Deletes records that expired before `now - cleanup_retention`
    pub async fn clean_up_expired(&self) -> Result<usize, TokenError> {
        let cutoff = self.now() - self.config.cleanup_retention;
        let deleted = self.store.delete_expired(cutoff).await?;
        debug!(cutoff = %cutoff, deleted, "Deleted expired refresh tokens");
        Ok(deleted)
    }

    /// Derives access token claims; touches no store
    pub fn issue_access(&self, client_id: Uuid) -> AccessTokenClaims {
        AccessTokenClaims::derive(client_id, self.now(), self.config.access_ttl)
    }

    /// Issues a refresh record and an access token together
    pub async fn issue_pair(&self, client_id: Uuid) -> Result<TokenPair, TokenError> {
        let record = self.issue(client_id).await?;
        self.pair_for(&record)
    }

    /// Exchanges a signed refresh token for a new pair
    ///
    /// The presented token only identifies a record. A valid signature over a
    /// revoked or missing record is rejected.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, TokenError> {
        let record = self.resolve_refresh(refresh_token).await?;
        let successor = self.rotate(&record, record.client_id).await?;
        self.pair_for(&successor)
    }

    /// Parses an access token and checks it has not expired
    pub fn validate_access(&self, token: &str) -> Result<AccessTokenClaims, TokenError> {
        let claims = self.codec.parse_access(token)?;

        if claims.is_expired_at(self.now()) {
            return Err(TokenError::invalid(claims.client_id, "access token expired"));
        }

        Ok(claims)
    }

    /// Loads the stored record a signed refresh token points at
    pub async fn resolve_refresh(&self, token: &str) -> Result<RefreshTokenRecord, TokenError> {
        let claims = self.codec.parse_refresh(token)?;

        let record = self
            .store
            .find_by_id(claims.token_id)
            .await?
            .ok_or_else(|| TokenError::not_found(claims.token_id))?;

        if record.client_id != claims.client_id {
            return Err(TokenError::invalid(record.id, "token belongs to another client"));
        }

        Ok(record)
    }

    /// Signed projection of a record
    pub fn token_for(&self, record: &RefreshTokenRecord) -> Result<String, TokenError> {
        self.codec.sign_refresh(record)
    }

    /// Active records of a client, newest first
    pub async fn active_tokens(&self, client_id: Uuid) -> Result<Vec<RefreshTokenRecord>, TokenError> {
        self.store.find_active_by_client(client_id, self.now()).await
    }

    fn pair_for(&self, record: &RefreshTokenRecord) -> Result<TokenPair, TokenError> {
        let access = self.issue_access(record.client_id);
        let access_token = self.codec.sign_access(&access)?;
        let refresh_token = self.codec.sign_refresh(record)?;
        Ok(TokenPair::new(access_token, &access, refresh_token, record))
    }
}
