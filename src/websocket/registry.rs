//! Keyed broadcast registry.
//!
//! Maps a canonical subscription key to a list of listener callbacks and fans each
//! published payload out to every listener registered under that key.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::warn;

/// Listener callback invoked with a reference to each published payload.
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Handle returned by [`BroadcastRegistry::add_listener`]; pass it back to
/// [`BroadcastRegistry::remove_listener`] to detach exactly that registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Fan-out table from subscription key to listeners.
///
/// The lock is held only while the table is mutated or snapshotted. Dispatch runs on a
/// snapshot taken outside the lock, so a listener may subscribe or unsubscribe from
/// inside its own callback without deadlocking.
pub struct BroadcastRegistry<T> {
    listeners: Mutex<HashMap<String, Vec<(ListenerId, Listener<T>)>>>,
    next_id: AtomicU64,
}

impl<T> Default for BroadcastRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BroadcastRegistry<T> {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a listener under `key`. The same closure may be registered more than
    /// once; each registration gets its own id and is invoked separately.
    pub fn add_listener(&self, key: &str, listener: Listener<T>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut table = match self.listeners.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        table
            .entry(key.to_string())
            .or_default()
            .push((id, listener));
        id
    }

    /// Remove one registration. Unknown ids are a no-op, so double removal is safe.
    pub fn remove_listener(&self, key: &str, id: ListenerId) {
        let mut table = match self.listeners.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(entries) = table.get_mut(key) {
            entries.retain(|(entry_id, _)| *entry_id != id);
            if entries.is_empty() {
                table.remove(key);
            }
        }
    }

    /// Number of listeners currently registered under `key`.
    pub fn listener_count(&self, key: &str) -> usize {
        let table = match self.listeners.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        table.get(key).map(Vec::len).unwrap_or(0)
    }

    /// Invoke every listener registered under `key`, in registration order.
    ///
    /// A panicking listener is isolated: the panic is caught, logged, and the remaining
    /// listeners still run. Returns the number of listeners invoked.
    pub fn dispatch(&self, key: &str, payload: &T) -> usize {
        let snapshot: Vec<(ListenerId, Listener<T>)> = {
            let table = match self.listeners.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            match table.get(key) {
                Some(entries) => entries.clone(),
                None => return 0,
            }
        };

        for (id, listener) in &snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(payload))).is_err() {
                warn!(key, listener_id = id.0, "listener panicked during dispatch");
            }
        }
        snapshot.len()
    }
}
