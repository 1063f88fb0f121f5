//! In-memory implementation of RefreshTokenStore

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entities::token::RefreshTokenRecord;
use crate::errors::TokenError;

use super::r#trait::RefreshTokenStore;

/// Refresh token store keeping records in a process-local map
///
/// All mutations take the write lock, so `swap` is atomic with respect to
/// every other operation. Used by tests and by nodes without a database.
#[derive(Clone, Default)]
pub struct InMemoryRefreshTokenStore {
    records: Arc<RwLock<HashMap<Uuid, RefreshTokenRecord>>>,
}

impl InMemoryRefreshTokenStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held, including revoked and expired ones
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn add(&self, record: RefreshTokenRecord) -> Result<(), TokenError> {
        let mut records = self.records.write().await;

        if records.contains_key(&record.id) {
            return Err(TokenError::duplicate(record.id));
        }

        records.insert(record.id, record);
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<RefreshTokenRecord>, TokenError> {
        let records = self.records.read().await;
        Ok(records.get(&id).cloned())
    }

    async fn find_active_by_client(
        &self,
        client_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<RefreshTokenRecord>, TokenError> {
        let records = self.records.read().await;
        let mut active: Vec<RefreshTokenRecord> = records
            .values()
            .filter(|r| r.client_id == client_id && r.is_active_at(now))
            .cloned()
            .collect();
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(active)
    }

    async fn swap(
        &self,
        old_id: Uuid,
        successor: RefreshTokenRecord,
        now: DateTime<Utc>,
    ) -> Result<(), TokenError> {
        let mut records = self.records.write().await;

        // Validate everything before mutating anything
        let old = records
            .get(&old_id)
            .ok_or_else(|| TokenError::not_found(old_id))?;
        if old.revoked {
            return Err(TokenError::invalid(old_id, "already rotated or revoked"));
        }
        if old.is_expired_at(now) {
            return Err(TokenError::invalid(old_id, "expired"));
        }
        if records.contains_key(&successor.id) {
            return Err(TokenError::duplicate(successor.id));
        }

        if let Some(old) = records.get_mut(&old_id) {
            old.revoke();
        }
        records.insert(successor.id, successor);
        Ok(())
    }

    async fn mark_revoked(&self, id: Uuid) -> Result<(), TokenError> {
        let mut records = self.records.write().await;

        match records.get_mut(&id) {
            Some(record) => {
                record.revoke();
                Ok(())
            }
            None => Err(TokenError::not_found(id)),
        }
    }

    async fn revoke_all_for_client(&self, client_id: Uuid) -> Result<usize, TokenError> {
        let mut records = self.records.write().await;
        let mut count = 0;

        for record in records.values_mut() {
            if record.client_id == client_id && !record.revoked {
                record.revoke();
                count += 1;
            }
        }

        Ok(count)
    }

    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> Result<usize, TokenError> {
        let mut records = self.records.write().await;
        let initial_count = records.len();

        records.retain(|_, record| record.expires_at >= cutoff);

        Ok(initial_count - records.len())
    }
}
