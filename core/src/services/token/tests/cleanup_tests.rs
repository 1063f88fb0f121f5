//! Unit tests for the token cleanup service

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::{manager_with, t0};
use crate::domain::entities::token::RefreshTokenRecord;
use crate::errors::TokenError;
use crate::repositories::{InMemoryRefreshTokenStore, RefreshTokenStore};
use crate::services::clock::ManualClock;
use crate::services::token::{TokenCleanupConfig, TokenCleanupService, TokenLifecycleConfig};

/// Store whose deletions always fail
struct BrokenStore;

#[async_trait]
impl RefreshTokenStore for BrokenStore {
    async fn add(&self, _record: RefreshTokenRecord) -> Result<(), TokenError> {
        Ok(())
    }

    async fn find_by_id(&self, _id: Uuid) -> Result<Option<RefreshTokenRecord>, TokenError> {
        Ok(None)
    }

    async fn find_active_by_client(
        &self,
        _client_id: Uuid,
        _now: DateTime<Utc>,
    ) -> Result<Vec<RefreshTokenRecord>, TokenError> {
        Ok(Vec::new())
    }

    async fn swap(
        &self,
        old_id: Uuid,
        _successor: RefreshTokenRecord,
        _now: DateTime<Utc>,
    ) -> Result<(), TokenError> {
        Err(TokenError::not_found(old_id))
    }

    async fn mark_revoked(&self, id: Uuid) -> Result<(), TokenError> {
        Err(TokenError::not_found(id))
    }

    async fn revoke_all_for_client(&self, _client_id: Uuid) -> Result<usize, TokenError> {
        Ok(0)
    }

    async fn delete_expired(&self, _cutoff: DateTime<Utc>) -> Result<usize, TokenError> {
        Err(TokenError::storage("refresh_tokens", "connection reset"))
    }
}

fn every_minute() -> TokenCleanupConfig {
    TokenCleanupConfig {
        interval: StdDuration::from_secs(60),
        enabled: true,
    }
}

#[tokio::test]
async fn test_run_cleanup_counts_deleted_records() {
    let clock = ManualClock::new(t0());
    let store = Arc::new(InMemoryRefreshTokenStore::new());
    let manager = Arc::new(manager_with(store.clone(), &clock, TokenLifecycleConfig::default()));

    manager.issue(Uuid::new_v4()).await.unwrap();
    clock.advance(Duration::days(8));

    let service = TokenCleanupService::new(manager, every_minute());
    let result = service.run_cleanup().await;

    assert!(result.is_success());
    assert_eq!(result.expired_tokens_deleted, 1);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_run_cleanup_records_store_errors() {
    let clock = ManualClock::new(t0());
    let manager = Arc::new(manager_with(Arc::new(BrokenStore), &clock, TokenLifecycleConfig::default()));

    let service = TokenCleanupService::new(manager, every_minute());
    let result = service.run_cleanup().await;

    assert!(!result.is_success());
    assert_eq!(result.expired_tokens_deleted, 0);
    assert!(result.errors[0].contains("connection reset"));
}

#[tokio::test]
async fn test_disabled_cleanup_does_nothing() {
    let clock = ManualClock::new(t0());
    let store = Arc::new(InMemoryRefreshTokenStore::new());
    let manager = Arc::new(manager_with(store.clone(), &clock, TokenLifecycleConfig::default()));
    manager.issue(Uuid::new_v4()).await.unwrap();
    clock.advance(Duration::days(8));

    let config = TokenCleanupConfig {
        enabled: false,
        ..every_minute()
    };
    let service = Arc::new(TokenCleanupService::new(manager, config));

    assert_eq!(service.run_cleanup().await.expired_tokens_deleted, 0);
    assert!(service.spawn().is_none());
    assert_eq!(store.len().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_background_worker_runs_on_interval_and_stops() {
    let clock = ManualClock::new(t0());
    let store = Arc::new(InMemoryRefreshTokenStore::new());
    let manager = Arc::new(manager_with(store.clone(), &clock, TokenLifecycleConfig::default()));

    manager.issue(Uuid::new_v4()).await.unwrap();
    clock.advance(Duration::days(8));

    let worker = Arc::new(TokenCleanupService::new(manager.clone(), every_minute()))
        .spawn()
        .unwrap();

    // first cycle runs immediately
    tokio::time::sleep(StdDuration::from_millis(10)).await;
    assert!(store.is_empty().await);

    manager.issue(Uuid::new_v4()).await.unwrap();
    clock.advance(Duration::days(8));
    tokio::time::sleep(StdDuration::from_secs(61)).await;
    assert!(store.is_empty().await);

    worker.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_worker_survives_failing_cycles() {
    let clock = ManualClock::new(t0());
    let manager = Arc::new(manager_with(Arc::new(BrokenStore), &clock, TokenLifecycleConfig::default()));

    let worker = Arc::new(TokenCleanupService::new(manager, every_minute()))
        .spawn()
        .unwrap();

    tokio::time::sleep(StdDuration::from_secs(185)).await;

    worker.stop().await.unwrap();
}
