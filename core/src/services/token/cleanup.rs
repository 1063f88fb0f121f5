//! Token cleanup service for periodic removal of expired refresh tokens
//!
//! Runs `TokenLifecycleManager::clean_up_expired` on a fixed interval. Cleanup
//! only removes records that can no longer be used, so it is safe alongside
//! issuance and rotation.

use std::sync::Arc;
use std::time::Duration;

use conn_shared::TokenConfig;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::errors::DomainError;
use crate::repositories::RefreshTokenStore;

use super::service::TokenLifecycleManager;

/// Configuration for token cleanup service
#[derive(Debug, Clone)]
pub struct TokenCleanupConfig {
    /// How often to run cleanup
    pub interval: Duration,
    /// Whether to enable automatic cleanup
    pub enabled: bool,
}

impl Default for TokenCleanupConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
            enabled: true,
        }
    }
}

impl From<&TokenConfig> for TokenCleanupConfig {
    fn from(config: &TokenConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.cleanup_interval_secs.max(1)),
            enabled: config.cleanup_enabled,
        }
    }
}

/// Service for cleaning up expired refresh tokens
pub struct TokenCleanupService<S: RefreshTokenStore + 'static> {
    manager: Arc<TokenLifecycleManager<S>>,
    config: TokenCleanupConfig,
}

impl<S: RefreshTokenStore + 'static> TokenCleanupService<S> {
    /// Create a new token cleanup service
    pub fn new(manager: Arc<TokenLifecycleManager<S>>, config: TokenCleanupConfig) -> Self {
        Self { manager, config }
    }

    /// Run a single cleanup cycle
    ///
    /// Store failures are recorded in the result rather than returned, so a
    /// failing cycle never stops the background loop.
    pub async fn run_cleanup(&self) -> CleanupResult {
        if !self.config.enabled {
            return CleanupResult::default();
        }

        let mut result = CleanupResult::default();

        match self.manager.clean_up_expired().await {
            Ok(count) => {
                result.expired_tokens_deleted = count;
                if count > 0 {
                    info!(deleted = count, "Deleted expired refresh tokens");
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to cleanup expired tokens");
                result.errors.push(format!("Token cleanup error: {}", e));
            }
        }

        result
    }

    /// Start the cleanup service as a background task
    ///
    /// Returns `None` when cleanup is disabled. The first cycle runs immediately.
    pub fn spawn(self: Arc<Self>) -> Option<CleanupWorker> {
        if !self.config.enabled {
            warn!("Token cleanup service is disabled");
            return None;
        }

        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let period = self.config.interval;

        let join_handle = tokio::spawn(async move {
            info!(interval_secs = period.as_secs(), "Token cleanup service started");

            let mut interval_timer = tokio::time::interval(period);
            interval_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut stop_rx => {
                        info!("Token cleanup service stopped");
                        break;
                    }
                    _ = interval_timer.tick() => {
                        let result = self.run_cleanup().await;
                        if !result.is_success() {
                            warn!(errors = ?result.errors, "Cleanup completed with errors");
                        }
                    }
                }
            }
        });

        Some(CleanupWorker {
            stop_tx: Some(stop_tx),
            join_handle: Some(join_handle),
        })
    }
}

/// Handle to a running cleanup loop; dropping it aborts the loop
pub struct CleanupWorker {
    stop_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

impl CleanupWorker {
    /// Signals the worker to stop and waits for the current cycle to finish
    pub async fn stop(mut self) -> Result<(), DomainError> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        if let Some(join_handle) = self.join_handle.take() {
            join_handle.await.map_err(|err| DomainError::Internal {
                message: format!("cleanup worker join: {}", err),
            })?;
        }

        Ok(())
    }
}

impl Drop for CleanupWorker {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(join_handle) = self.join_handle.take() {
            join_handle.abort();
        }
    }
}

/// Result of a cleanup operation
#[derive(Debug, Default)]
pub struct CleanupResult {
    /// Number of expired refresh tokens deleted
    pub expired_tokens_deleted: usize,
    /// Any errors encountered during cleanup
    pub errors: Vec<String>,
}

impl CleanupResult {
    /// Check if the cleanup was successful (no errors)
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}
