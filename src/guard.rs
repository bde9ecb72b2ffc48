use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::AbortHandle;

/// How long a key stays active when its lease is never dropped. A lost
/// release must not leave a control disabled forever.
const DEFAULT_EXPIRY: Duration = Duration::from_secs(10);

struct ActiveAction {
    generation: u64,
    timer: AbortHandle,
}

type ActionMap = Arc<Mutex<HashMap<String, ActiveAction>>>;

fn lock(actions: &ActionMap) -> MutexGuard<'_, HashMap<String, ActiveAction>> {
    actions.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Tracks which mutation keys are currently in flight.
///
/// A second `begin` on an active key is rejected rather than queued: the
/// duplicate trigger is dropped at the call site. Every entry carries its
/// own expiry timer that clears the key if the holder never gets around to
/// releasing it; a key can only re-arm after expiry, so timers never stack.
pub struct ActionGuard {
    actions: ActionMap,
    expiry: Duration,
    next_generation: AtomicU64,
}

impl ActionGuard {
    pub fn new() -> Self {
        Self::with_expiry(DEFAULT_EXPIRY)
    }

    pub fn with_expiry(expiry: Duration) -> Self {
        Self {
            actions: Arc::new(Mutex::new(HashMap::new())),
            expiry,
            next_generation: AtomicU64::new(0),
        }
    }

    pub fn is_active(&self, key: &str) -> bool {
        lock(&self.actions).contains_key(key)
    }

    pub fn active_count(&self) -> usize {
        lock(&self.actions).len()
    }

    /// Marks `key` active and returns a lease that releases it on drop.
    /// Returns `None` while another lease for the same key is live.
    ///
    /// Must be called from within a tokio runtime (the expiry timer is a
    /// spawned task).
    pub fn begin(&self, key: &str) -> Option<ActionLease> {
        let mut actions = lock(&self.actions);
        if actions.contains_key(key) {
            return None;
        }
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let timer = self.spawn_expiry(key.to_string(), generation);
        actions.insert(key.to_string(), ActiveAction { generation, timer });
        Some(ActionLease {
            key: key.to_string(),
            generation,
            actions: Arc::clone(&self.actions),
        })
    }

    fn spawn_expiry(&self, key: String, generation: u64) -> AbortHandle {
        let actions = Arc::clone(&self.actions);
        let expiry = self.expiry;
        let task = tokio::spawn(async move {
            tokio::time::sleep(expiry).await;
            let mut actions = lock(&actions);
            let expired = actions
                .get(&key)
                .is_some_and(|active| active.generation == generation);
            if expired {
                actions.remove(&key);
                tracing::warn!(%key, "action lease expired without release");
            }
        });
        task.abort_handle()
    }
}

impl Default for ActionGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Live claim on an action key. Dropping it releases the key and cancels
/// the expiry timer, on success and error paths alike.
pub struct ActionLease {
    key: String,
    generation: u64,
    actions: ActionMap,
}

impl ActionLease {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for ActionLease {
    fn drop(&mut self) {
        let mut actions = lock(&self.actions);
        // The key may have expired and been re-acquired since; only the
        // matching generation may release it.
        let held = actions
            .get(&self.key)
            .is_some_and(|active| active.generation == self.generation);
        if held {
            if let Some(active) = actions.remove(&self.key) {
                active.timer.abort();
            }
        }
    }
}
