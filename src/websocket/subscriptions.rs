//! Reference-counted subscription bookkeeping.
//!
//! Tracks which topics the client wants from the server, how many local listeners share
//! each topic, and whether the topic's subscribe frame has reached the current
//! connection. Pair streams and table streams keep separate books but share the
//! mechanics.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::shared::types::{PairIdentity, ScannerFilter};

/// One topic's bookkeeping entry.
#[derive(Debug, Clone)]
struct Topic<P> {
    /// Payload to put on the wire when (re)subscribing.
    payload: P,
    /// Local listeners sharing this topic.
    listeners: usize,
    /// Whether the subscribe frame went out on the live connection.
    wire_active: bool,
}

/// Ref-counted topic table for one subscription family.
#[derive(Debug)]
pub struct SubscriptionBook<P> {
    topics: Mutex<HashMap<String, Topic<P>>>,
}

impl<P: Clone> Default for SubscriptionBook<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Clone> SubscriptionBook<P> {
    pub fn new() -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
        }
    }

    /// Add one listener under `key`. Returns `true` when this is the topic's first
    /// listener, i.e. a subscribe frame should go out.
    pub fn add(&self, key: &str, payload: P) -> bool {
        let mut topics = self.lock();
        match topics.get_mut(key) {
            Some(topic) => {
                topic.listeners += 1;
                false
            }
            None => {
                topics.insert(
                    key.to_string(),
                    Topic {
                        payload,
                        listeners: 1,
                        wire_active: false,
                    },
                );
                true
            }
        }
    }

    /// Drop one listener under `key`. Returns the topic's payload when the last
    /// listener leaves, i.e. an unsubscribe frame should go out. The entry is removed
    /// in that case. Unknown keys are a no-op.
    pub fn remove(&self, key: &str) -> Option<P> {
        let mut topics = self.lock();
        let topic = topics.get_mut(key)?;
        topic.listeners = topic.listeners.saturating_sub(1);
        if topic.listeners == 0 {
            topics.remove(key).map(|t| t.payload)
        } else {
            None
        }
    }

    /// Record whether `key`'s subscribe frame reached the live connection.
    pub fn set_wire_active(&self, key: &str, active: bool) {
        if let Some(topic) = self.lock().get_mut(key) {
            topic.wire_active = active;
        }
    }

    /// Clear every topic's wire flag. Called when the connection drops.
    pub fn mark_all_inactive(&self) {
        for topic in self.lock().values_mut() {
            topic.wire_active = false;
        }
    }

    /// Payloads that still have listeners but no live wire subscription.
    /// This is the replay set after a reconnect.
    pub fn pending_payloads(&self) -> Vec<(String, P)> {
        self.lock()
            .iter()
            .filter(|(_, topic)| topic.listeners > 0 && !topic.wire_active)
            .map(|(key, topic)| (key.clone(), topic.payload.clone()))
            .collect()
    }

    /// Listener count for `key`; zero for unknown keys.
    pub fn listener_count(&self, key: &str) -> usize {
        self.lock().get(key).map(|t| t.listeners).unwrap_or(0)
    }

    /// Number of live topics.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Topic<P>>> {
        match self.topics.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Subscription state for both stream families.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    /// Pair streams, keyed by `PairIdentity::subscription_key`.
    pub pairs: SubscriptionBook<PairIdentity>,
    /// Table streams, keyed by `ScannerFilter::subscription_key`.
    pub filters: SubscriptionBook<ScannerFilter>,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every wire flag; the next reconnect replays both families.
    pub fn mark_all_inactive(&self) {
        self.pairs.mark_all_inactive();
        self.filters.mark_all_inactive();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> PairIdentity {
        PairIdentity::new("0xP", "0xT", "ETH")
    }

    #[test]
    fn test_only_first_add_requests_a_frame() {
        let book = SubscriptionBook::new();
        let key = identity().subscription_key();
        assert!(book.add(&key, identity()));
        assert!(!book.add(&key, identity()));
        assert!(!book.add(&key, identity()));
        assert_eq!(book.listener_count(&key), 3);
    }

    #[test]
    fn test_only_last_remove_returns_payload() {
        let book = SubscriptionBook::new();
        let key = identity().subscription_key();
        book.add(&key, identity());
        book.add(&key, identity());

        assert!(book.remove(&key).is_none());
        let payload = book.remove(&key);
        assert_eq!(payload, Some(identity()));
        assert!(book.is_empty());
    }

    #[test]
    fn test_remove_unknown_key_is_noop() {
        let book: SubscriptionBook<PairIdentity> = SubscriptionBook::new();
        assert!(book.remove("nope").is_none());
    }

    #[test]
    fn test_resubscribe_after_teardown_requests_frame_again() {
        let book = SubscriptionBook::new();
        let key = identity().subscription_key();
        book.add(&key, identity());
        book.remove(&key);
        assert!(book.add(&key, identity()));
    }

    #[test]
    fn test_replay_set_tracks_wire_flag() {
        let book = SubscriptionBook::new();
        let key = identity().subscription_key();
        book.add(&key, identity());
        assert_eq!(book.pending_payloads().len(), 1);

        book.set_wire_active(&key, true);
        assert!(book.pending_payloads().is_empty());

        book.mark_all_inactive();
        let pending = book.pending_payloads();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].0, key);
    }

    #[test]
    fn test_manager_marks_both_families_inactive() {
        let manager = SubscriptionManager::new();
        let pair_key = identity().subscription_key();
        let filter = ScannerFilter::trending_tokens();
        let filter_key = filter.subscription_key();

        manager.pairs.add(&pair_key, identity());
        manager.filters.add(&filter_key, filter);
        manager.pairs.set_wire_active(&pair_key, true);
        manager.filters.set_wire_active(&filter_key, true);

        manager.mark_all_inactive();
        assert_eq!(manager.pairs.pending_payloads().len(), 1);
        assert_eq!(manager.filters.pending_payloads().len(), 1);
    }
}
