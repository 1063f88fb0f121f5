//! Unit tests for the token lifecycle manager

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::{manager_with, t0};
use crate::domain::entities::token::RefreshTokenRecord;
use crate::errors::{ErrorKind, TokenError};
use crate::repositories::{InMemoryRefreshTokenStore, RefreshTokenStore};
use crate::services::clock::ManualClock;
use crate::services::token::TokenLifecycleConfig;

/// Store that reports id collisions a fixed number of times before delegating
struct CollidingStore {
    inner: InMemoryRefreshTokenStore,
    collisions_left: AtomicUsize,
}

impl CollidingStore {
    fn new(collisions: usize) -> Self {
        Self {
            inner: InMemoryRefreshTokenStore::new(),
            collisions_left: AtomicUsize::new(collisions),
        }
    }

    fn collide(&self) -> bool {
        self.collisions_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl RefreshTokenStore for CollidingStore {
    async fn add(&self, record: RefreshTokenRecord) -> Result<(), TokenError> {
        if self.collide() {
            return Err(TokenError::duplicate(record.id));
        }
        self.inner.add(record).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<RefreshTokenRecord>, TokenError> {
        self.inner.find_by_id(id).await
    }

    async fn find_active_by_client(
        &self,
        client_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<RefreshTokenRecord>, TokenError> {
        self.inner.find_active_by_client(client_id, now).await
    }

    async fn swap(
        &self,
        old_id: Uuid,
        successor: RefreshTokenRecord,
        now: DateTime<Utc>,
    ) -> Result<(), TokenError> {
        if self.collide() {
            return Err(TokenError::duplicate(successor.id));
        }
        self.inner.swap(old_id, successor, now).await
    }

    async fn mark_revoked(&self, id: Uuid) -> Result<(), TokenError> {
        self.inner.mark_revoked(id).await
    }

    async fn revoke_all_for_client(&self, client_id: Uuid) -> Result<usize, TokenError> {
        self.inner.revoke_all_for_client(client_id).await
    }

    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> Result<usize, TokenError> {
        self.inner.delete_expired(cutoff).await
    }
}

fn short_lived() -> TokenLifecycleConfig {
    TokenLifecycleConfig::default()
        .with_access_ttl(Duration::seconds(5))
        .with_refresh_ttl(Duration::seconds(10))
}

#[tokio::test]
async fn test_issue_creates_active_record() {
    let clock = ManualClock::new(t0());
    let store = Arc::new(InMemoryRefreshTokenStore::new());
    let manager = manager_with(store.clone(), &clock, short_lived());
    let client_id = Uuid::new_v4();

    let record = manager.issue(client_id).await.unwrap();

    assert_eq!(record.client_id, client_id);
    assert_eq!(record.created_at, t0());
    assert_eq!(record.expires_at, t0() + Duration::seconds(10));
    assert!(record.expires_at > record.created_at);
    assert!(!record.revoked);
    assert_eq!(store.find_by_id(record.id).await.unwrap(), Some(record));
}

#[tokio::test]
async fn test_issue_retries_on_id_collision() {
    let clock = ManualClock::new(t0());
    let store = Arc::new(CollidingStore::new(2));
    let manager = manager_with(store.clone(), &clock, short_lived());

    let record = manager.issue(Uuid::new_v4()).await.unwrap();

    assert!(store.find_by_id(record.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_issue_gives_up_after_bounded_attempts() {
    let clock = ManualClock::new(t0());
    let store = Arc::new(CollidingStore::new(10));
    let manager = manager_with(store.clone(), &clock, short_lived());

    let err = manager.issue(Uuid::new_v4()).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Duplicate);
    // default config allows three attempts
    assert_eq!(store.collisions_left.load(Ordering::SeqCst), 7);
}

#[tokio::test]
async fn test_rotate_revokes_predecessor() {
    let clock = ManualClock::new(t0());
    let store = Arc::new(InMemoryRefreshTokenStore::new());
    let manager = manager_with(store.clone(), &clock, short_lived());
    let client_id = Uuid::new_v4();

    let t1 = manager.issue(client_id).await.unwrap();
    clock.advance(Duration::seconds(5));
    let t2 = manager.rotate(&t1, client_id).await.unwrap();

    assert_ne!(t1.id, t2.id);
    assert_eq!(t2.expires_at, t0() + Duration::seconds(15));
    assert!(store.find_by_id(t1.id).await.unwrap().unwrap().revoked);
    assert_eq!(manager.active_tokens(client_id).await.unwrap(), vec![t2]);
}

#[tokio::test]
async fn test_rotate_retries_successor_collision() {
    let clock = ManualClock::new(t0());
    let store = Arc::new(CollidingStore::new(0));
    let manager = manager_with(store.clone(), &clock, short_lived());
    let client_id = Uuid::new_v4();

    let t1 = manager.issue(client_id).await.unwrap();
    store.collisions_left.store(1, Ordering::SeqCst);

    let t2 = manager.rotate(&t1, client_id).await.unwrap();

    assert!(store.find_by_id(t2.id).await.unwrap().is_some());
    assert!(store.find_by_id(t1.id).await.unwrap().unwrap().revoked);
}

#[tokio::test]
async fn test_rotation_lifecycle_scenario() {
    let clock = ManualClock::new(t0());
    let store = Arc::new(InMemoryRefreshTokenStore::new());
    let manager = manager_with(store.clone(), &clock, short_lived());
    let client_id = Uuid::new_v4();

    // t=0: issue with ttl 10
    let t1 = manager.issue(client_id).await.unwrap();

    // t=5: rotate
    clock.set(t0() + Duration::seconds(5));
    let t2 = manager.rotate(&t1, client_id).await.unwrap();
    assert_eq!(t2.expires_at, t0() + Duration::seconds(15));

    // t=6: second rotation of the stale record fails
    clock.set(t0() + Duration::seconds(6));
    let err = manager.rotate(&t1, client_id).await.unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Invalid | ErrorKind::NotFound));

    // t=16: both records are past expiry
    clock.set(t0() + Duration::seconds(16));
    assert_eq!(manager.clean_up_expired().await.unwrap(), 2);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_rotate_rejects_revoked_and_expired() {
    let clock = ManualClock::new(t0());
    let store = Arc::new(InMemoryRefreshTokenStore::new());
    let manager = manager_with(store.clone(), &clock, short_lived());
    let client_id = Uuid::new_v4();

    let revoked = manager.issue(client_id).await.unwrap();
    manager.revoke(&revoked).await.unwrap();
    let revoked = store.find_by_id(revoked.id).await.unwrap().unwrap();
    assert!(manager.rotate(&revoked, client_id).await.unwrap_err().is_invalid());

    let expiring = manager.issue(client_id).await.unwrap();
    clock.advance(Duration::seconds(10));
    assert!(manager.rotate(&expiring, client_id).await.unwrap_err().is_invalid());
}

#[tokio::test]
async fn test_rotate_rejects_other_clients_token() {
    let clock = ManualClock::new(t0());
    let store = Arc::new(InMemoryRefreshTokenStore::new());
    let manager = manager_with(store.clone(), &clock, short_lived());

    let record = manager.issue(Uuid::new_v4()).await.unwrap();
    let err = manager.rotate(&record, Uuid::new_v4()).await.unwrap_err();

    assert!(err.is_invalid());
    assert!(!store.find_by_id(record.id).await.unwrap().unwrap().revoked);
}

#[tokio::test]
async fn test_rotate_deleted_record_reports_not_found() {
    let clock = ManualClock::new(t0());
    let store = Arc::new(InMemoryRefreshTokenStore::new());
    let manager = manager_with(store.clone(), &clock, short_lived());
    let client_id = Uuid::new_v4();

    let unknown = RefreshTokenRecord::new(client_id, t0(), Duration::seconds(10));
    let err = manager.rotate(&unknown, client_id).await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.subject, unknown.id.to_string());
}

#[tokio::test]
async fn test_concurrent_rotation_has_single_winner() {
    let clock = ManualClock::new(t0());
    let store = Arc::new(InMemoryRefreshTokenStore::new());
    let manager = Arc::new(manager_with(store.clone(), &clock, short_lived()));
    let client_id = Uuid::new_v4();
    let t1 = manager.issue(client_id).await.unwrap();

    let (a, b) = tokio::join!(manager.rotate(&t1, client_id), manager.rotate(&t1, client_id));

    let outcomes = [a, b];
    let successes = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);

    let loser = outcomes.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert!(matches!(loser.kind, ErrorKind::Invalid | ErrorKind::NotFound));
    assert_eq!(manager.active_tokens(client_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_revoke_is_idempotent_and_reports_missing() {
    let clock = ManualClock::new(t0());
    let store = Arc::new(InMemoryRefreshTokenStore::new());
    let manager = manager_with(store.clone(), &clock, short_lived());

    let record = manager.issue(Uuid::new_v4()).await.unwrap();
    manager.revoke(&record).await.unwrap();
    manager.revoke(&record).await.unwrap();

    let missing = RefreshTokenRecord::new(Uuid::new_v4(), t0(), Duration::seconds(10));
    assert!(manager.revoke(&missing).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_revoke_all_blocks_later_rotation() {
    let clock = ManualClock::new(t0());
    let store = Arc::new(InMemoryRefreshTokenStore::new());
    let manager = manager_with(store.clone(), &clock, short_lived());
    let client_id = Uuid::new_v4();

    let a = manager.issue(client_id).await.unwrap();
    let b = manager.issue(client_id).await.unwrap();

    assert_eq!(manager.revoke_all(client_id).await.unwrap(), 2);
    assert_eq!(manager.revoke_all(client_id).await.unwrap(), 0);
    assert_eq!(manager.revoke_all(Uuid::new_v4()).await.unwrap(), 0);

    // the caller still holds the pre-revocation snapshots
    for record in [&a, &b] {
        let err = manager.rotate(record, client_id).await.unwrap_err();
        assert!(err.is_invalid());
    }
    assert!(manager.active_tokens(client_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_clean_up_keeps_unexpired_records() {
    let clock = ManualClock::new(t0());
    let store = Arc::new(InMemoryRefreshTokenStore::new());
    let manager = manager_with(store.clone(), &clock, short_lived());
    let client_id = Uuid::new_v4();

    let old = manager.issue(client_id).await.unwrap();
    clock.advance(Duration::seconds(3));
    let young = manager.issue(client_id).await.unwrap();

    // old expires at t=10; at exactly t=10 it must survive
    clock.set(old.expires_at);
    assert_eq!(manager.clean_up_expired().await.unwrap(), 0);

    clock.advance(Duration::seconds(1));
    assert_eq!(manager.clean_up_expired().await.unwrap(), 1);
    assert!(store.find_by_id(old.id).await.unwrap().is_none());
    assert!(store.find_by_id(young.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_clean_up_honours_retention() {
    let clock = ManualClock::new(t0());
    let store = Arc::new(InMemoryRefreshTokenStore::new());
    let config = short_lived().with_cleanup_retention(Duration::seconds(60));
    let manager = manager_with(store.clone(), &clock, config);

    manager.issue(Uuid::new_v4()).await.unwrap();

    clock.set(t0() + Duration::seconds(30));
    assert_eq!(manager.clean_up_expired().await.unwrap(), 0);

    clock.set(t0() + Duration::seconds(71));
    assert_eq!(manager.clean_up_expired().await.unwrap(), 1);
}

#[tokio::test]
async fn test_issue_pair_and_refresh() {
    let clock = ManualClock::new(t0());
    let store = Arc::new(InMemoryRefreshTokenStore::new());
    let manager = manager_with(store.clone(), &clock, short_lived());
    let client_id = Uuid::new_v4();

    let pair = manager.issue_pair(client_id).await.unwrap();
    assert_eq!(pair.access_expires_at, t0() + Duration::seconds(5));
    assert_eq!(pair.refresh_expires_at, t0() + Duration::seconds(10));
    assert_eq!(manager.validate_access(&pair.access_token).unwrap().client_id, client_id);

    clock.advance(Duration::seconds(2));
    let next = manager.refresh(&pair.refresh_token).await.unwrap();

    assert_ne!(next.refresh_token_id, pair.refresh_token_id);
    assert!(store.find_by_id(pair.refresh_token_id).await.unwrap().unwrap().revoked);

    // replaying the old refresh token is rejected by the stored record
    let err = manager.refresh(&pair.refresh_token).await.unwrap_err();
    assert!(err.is_invalid());
}

#[tokio::test]
async fn test_refresh_with_deleted_record_is_not_found() {
    let clock = ManualClock::new(t0());
    let store = Arc::new(InMemoryRefreshTokenStore::new());
    let manager = manager_with(store.clone(), &clock, short_lived());

    let pair = manager.issue_pair(Uuid::new_v4()).await.unwrap();
    clock.advance(Duration::seconds(11));
    manager.clean_up_expired().await.unwrap();

    assert!(manager.refresh(&pair.refresh_token).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_validate_access_checks_expiry() {
    let clock = ManualClock::new(t0());
    let store = Arc::new(InMemoryRefreshTokenStore::new());
    let manager = manager_with(store, &clock, short_lived());
    let client_id = Uuid::new_v4();

    let claims = manager.issue_access(client_id);
    let pair = manager.issue_pair(client_id).await.unwrap();
    assert_eq!(claims.expires_at, pair.access_expires_at);

    clock.advance(Duration::seconds(4));
    assert!(manager.validate_access(&pair.access_token).is_ok());

    clock.advance(Duration::seconds(1));
    let err = manager.validate_access(&pair.access_token).unwrap_err();
    assert!(err.is_invalid());
    assert_eq!(err.subject, client_id.to_string());

    assert!(manager.validate_access(&pair.refresh_token).is_err());
}

#[tokio::test]
async fn test_token_for_resolves_back_to_record() {
    let clock = ManualClock::new(t0());
    let store = Arc::new(InMemoryRefreshTokenStore::new());
    let manager = manager_with(store, &clock, short_lived());

    let record = manager.issue(Uuid::new_v4()).await.unwrap();
    let token = manager.token_for(&record).unwrap();

    assert_eq!(manager.resolve_refresh(&token).await.unwrap(), record);
}
