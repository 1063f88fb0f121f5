//! Refresh token store trait defining the interface for refresh token persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::entities::token::RefreshTokenRecord;
use crate::errors::TokenError;

/// Durable keyed storage of refresh token records
///
/// Every mutation must be atomic per token id. `swap` is the single call that
/// revokes a predecessor and inserts its successor as one unit, so rotation
/// never has to coordinate two independent calls under a race.
///
/// Instants are passed in by the caller, which owns the clock.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Insert a new record
    ///
    /// # Returns
    /// * `Ok(())` - Record stored
    /// * `Err(TokenError)` - kind `Duplicate` if the id already exists
    async fn add(&self, record: RefreshTokenRecord) -> Result<(), TokenError>;

    /// Find a record by its id
    ///
    /// # Returns
    /// * `Ok(Some(RefreshTokenRecord))` - Record found, revoked or not
    /// * `Ok(None)` - No record with the given id
    async fn find_by_id(&self, id: Uuid) -> Result<Option<RefreshTokenRecord>, TokenError>;

    /// Find all records of a client that are not revoked and expire after `now`
    async fn find_active_by_client(
        &self,
        client_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<RefreshTokenRecord>, TokenError>;

    /// Revoke `old_id` and insert `successor` atomically
    ///
    /// Either both mutations apply or neither does. The old id acts as an
    /// optimistic lock: once revoked, a second swap against it fails.
    ///
    /// # Returns
    /// * `Ok(())` - Old record revoked, successor stored
    /// * `Err(TokenError)` - kind `NotFound` if `old_id` is absent, `Invalid` if it
    ///   is already revoked or expired at `now`, `Duplicate` if the successor id exists
    async fn swap(
        &self,
        old_id: Uuid,
        successor: RefreshTokenRecord,
        now: DateTime<Utc>,
    ) -> Result<(), TokenError>;

    /// Mark a record revoked; revoking a revoked record succeeds
    ///
    /// # Returns
    /// * `Err(TokenError)` - kind `NotFound` if the id is absent
    async fn mark_revoked(&self, id: Uuid) -> Result<(), TokenError>;

    /// Revoke every non-revoked record of a client
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of records that flipped to revoked
    async fn revoke_all_for_client(&self, client_id: Uuid) -> Result<usize, TokenError>;

    /// Delete every record whose `expires_at` is strictly before `cutoff`
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of records deleted
    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> Result<usize, TokenError>;

    /// Count active records of a client
    async fn count_active(&self, client_id: Uuid, now: DateTime<Utc>) -> Result<usize, TokenError> {
        let records = self.find_active_by_client(client_id, now).await?;
        Ok(records.len())
    }
}
