mod cleanup_tests;
mod service_tests;

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use crate::repositories::RefreshTokenStore;
use crate::services::clock::ManualClock;
use crate::services::token::{JwtTokenCodec, TokenLifecycleConfig, TokenLifecycleManager};

pub(crate) const TEST_SECRET: &str = "test-secret-for-token-lifecycle";
pub(crate) const TEST_ISSUER: &str = "connection-auth";

pub(crate) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
}

pub(crate) fn manager_with<S: RefreshTokenStore>(
    store: Arc<S>,
    clock: &ManualClock,
    config: TokenLifecycleConfig,
) -> TokenLifecycleManager<S> {
    TokenLifecycleManager::new(
        store,
        Arc::new(JwtTokenCodec::new(TEST_SECRET, TEST_ISSUER)),
        Arc::new(clock.clone()),
        config,
    )
}
