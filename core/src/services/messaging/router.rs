//! Matching of asynchronous responses to pending callers
//!
//! Every pending call is resolved exactly once: by its response, by a failure,
//! or by expiry once its deadline passes. Whichever comes first wins and later
//! arrivals are dropped. A waiting caller expires its own call at the deadline;
//! the sweep expires calls nobody is waiting on and forgets old tombstones.
//! Finished ids are remembered for a while so late duplicates can be told apart
//! from ids that never existed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::errors::{CommandError, DomainError};

/// Outcome delivered to a waiter
pub type CallOutcome = Result<Value, CommandError>;

/// Lifecycle of a correlation id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Pending,
    Resolved,
    Failed,
    TimedOut,
}

impl CallState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CallState::Pending)
    }
}

struct PendingEntry {
    deadline: Instant,
    slot: oneshot::Sender<CallOutcome>,
}

struct Tombstone {
    state: CallState,
    expires_at: Instant,
}

#[derive(Default)]
struct Registry {
    pending: HashMap<String, PendingEntry>,
    finished: HashMap<String, Tombstone>,
}

struct Shared {
    registry: Mutex<Registry>,
    tombstone_ttl: Duration,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move a pending call to a terminal state and hand back its slot
    ///
    /// `Err` carries the previous state when the id was already finished, or
    /// `None` when it was never registered.
    fn take(
        &self,
        correlation_id: &str,
        state: CallState,
        now: Instant,
    ) -> Result<oneshot::Sender<CallOutcome>, Option<CallState>> {
        let mut registry = self.lock();

        let entry = match registry.pending.remove(correlation_id) {
            Some(entry) => entry,
            None => return Err(registry.finished.get(correlation_id).map(|t| t.state)),
        };

        registry.finished.insert(
            correlation_id.to_string(),
            Tombstone {
                state,
                expires_at: now + self.tombstone_ttl,
            },
        );

        Ok(entry.slot)
    }

    fn finish(&self, correlation_id: &str, state: CallState, outcome: CallOutcome) -> bool {
        match self.take(correlation_id, state, Instant::now()) {
            Ok(slot) => {
                // The waiter may have given up; the transition still counts
                let _ = slot.send(outcome);
                debug!(correlation_id = %correlation_id, state = ?state, "Pending call finished");
                true
            }
            Err(Some(previous)) => {
                warn!(
                    correlation_id = %correlation_id,
                    state = ?previous,
                    "Dropping late or duplicate response"
                );
                false
            }
            Err(None) => {
                warn!(correlation_id = %correlation_id, "Dropping response for unknown correlation id");
                false
            }
        }
    }

    /// Time out a call whose deadline has passed; no-op if it already finished
    fn expire(&self, correlation_id: &str) -> bool {
        match self.take(correlation_id, CallState::TimedOut, Instant::now()) {
            Ok(slot) => {
                warn!(correlation_id = %correlation_id, "Pending call timed out");
                let _ = slot.send(Err(CommandError::timeout(correlation_id)));
                true
            }
            Err(_) => false,
        }
    }
}

/// Registry of calls awaiting a response
pub struct CorrelationRouter {
    shared: Arc<Shared>,
}

impl Default for CorrelationRouter {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

impl CorrelationRouter {
    /// Creates a router remembering finished ids for `tombstone_ttl`
    pub fn new(tombstone_ttl: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(Registry::default()),
                tombstone_ttl,
            }),
        }
    }

    /// Register a pending call expiring `timeout` from now
    ///
    /// # Returns
    /// * `Ok(PendingCall)` - Handle the caller waits on
    /// * `Err(CommandError)` - kind `Duplicate` if the id is pending or recently
    ///   finished, `Invalid` if the deadline cannot be represented
    pub fn register(
        &self,
        correlation_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<PendingCall, CommandError> {
        let correlation_id = correlation_id.into();
        let deadline = Instant::now()
            .checked_add(timeout)
            .ok_or_else(|| CommandError::invalid(&correlation_id, "timeout too large"))?;
        let (slot, receiver) = oneshot::channel();

        let mut registry = self.shared.lock();
        if registry.pending.contains_key(&correlation_id)
            || registry.finished.contains_key(&correlation_id)
        {
            return Err(CommandError::duplicate_correlation(&correlation_id));
        }
        registry
            .pending
            .insert(correlation_id.clone(), PendingEntry { deadline, slot });
        drop(registry);

        debug!(correlation_id = %correlation_id, timeout_ms = timeout.as_millis() as u64, "Registered pending call");

        Ok(PendingCall {
            correlation_id,
            deadline,
            receiver,
            router: Arc::downgrade(&self.shared),
        })
    }

    /// Complete a pending call with its result
    ///
    /// Returns `false`, and drops the result, if the id is unknown or already finished.
    pub fn resolve(&self, correlation_id: &str, result: Value) -> bool {
        self.shared.finish(correlation_id, CallState::Resolved, Ok(result))
    }

    /// Complete a pending call with an error
    ///
    /// Returns `false` if the id is unknown or already finished.
    pub fn fail(&self, correlation_id: &str, error: CommandError) -> bool {
        self.shared.finish(correlation_id, CallState::Failed, Err(error))
    }

    /// Time out every call past its deadline and forget old tombstones
    ///
    /// Returns the number of calls timed out.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();

        let expired: Vec<String> = self
            .shared
            .lock()
            .pending
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();

        let count = expired.iter().filter(|id| self.shared.expire(id)).count();

        self.shared
            .lock()
            .finished
            .retain(|_, tombstone| tombstone.expires_at > now);

        count
    }

    /// Current state of a correlation id, if it is pending or remembered
    pub fn state(&self, correlation_id: &str) -> Option<CallState> {
        let registry = self.shared.lock();
        if registry.pending.contains_key(correlation_id) {
            return Some(CallState::Pending);
        }
        registry.finished.get(correlation_id).map(|t| t.state)
    }

    /// Number of calls still waiting
    pub fn pending_count(&self) -> usize {
        self.shared.lock().pending.len()
    }

    /// Run `sweep` every `interval` on a background task
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> SweeperHandle {
        let router = Arc::clone(self);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let join_handle = tokio::spawn(async move {
            info!(interval_ms = interval.as_millis() as u64, "Correlation sweeper started");

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        router.sweep();
                    }
                }
            }
        });

        SweeperHandle {
            stop_tx: Some(stop_tx),
            join_handle: Some(join_handle),
        }
    }
}

/// A registered call; await `wait` for its outcome
pub struct PendingCall {
    correlation_id: String,
    deadline: Instant,
    receiver: oneshot::Receiver<CallOutcome>,
    router: Weak<Shared>,
}

impl PendingCall {
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Suspend until the call reaches a terminal state
    ///
    /// Returns a timeout error at the deadline even when no sweeper is running.
    pub async fn wait(mut self) -> CallOutcome {
        let received = tokio::select! {
            received = &mut self.receiver => Some(received),
            _ = tokio::time::sleep_until(self.deadline) => None,
        };

        let received = match received {
            Some(received) => received,
            None => {
                if let Some(router) = self.router.upgrade() {
                    router.expire(&self.correlation_id);
                }
                // Either the expiry or an outcome that beat it is in the slot now
                (&mut self.receiver).await
            }
        };

        received.unwrap_or_else(|_| {
            Err(CommandError::transport(
                &self.correlation_id,
                "correlation router dropped",
            ))
        })
    }
}

/// Handle to a running sweeper; dropping it aborts the sweeper
pub struct SweeperHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Signals the sweeper to stop and waits for it to finish
    pub async fn stop(mut self) -> Result<(), DomainError> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        if let Some(join_handle) = self.join_handle.take() {
            join_handle.await.map_err(|err| DomainError::Internal {
                message: format!("correlation sweeper join: {}", err),
            })?;
        }

        Ok(())
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(join_handle) = self.join_handle.take() {
            join_handle.abort();
        }
    }
}
