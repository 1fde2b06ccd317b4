//! Notification ledger: one notification per (match, destination).
//!
//! A unit first [`claim`](NotificationLedger::claim)s the pair. While the claim
//! is alive no other unit can take it; [`LedgerClaim::commit`] records the pair
//! as notified, and dropping an uncommitted claim releases it so a later cycle
//! can retry.

use crate::bounded_cache::{evict_arbitrary, EvictionFn};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

type PairKey = (String, String);

struct LedgerState {
    notified: HashMap<String, HashSet<String>>,
    pending:  HashSet<PairKey>,
}

#[derive(Clone)]
pub struct NotificationLedger {
    state:    Arc<Mutex<LedgerState>>,
    capacity: usize,
    evict:    EvictionFn<String, HashSet<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimRefused {
    AlreadyNotified,
    InFlight,
}

#[must_use = "an unused claim is released immediately"]
pub struct LedgerClaim {
    ledger:    NotificationLedger,
    key:       PairKey,
    committed: bool,
}

impl NotificationLedger {
    /// `capacity` bounds the number of remembered matches.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(LedgerState { notified: HashMap::new(), pending: HashSet::new() })),
            capacity: capacity.max(1),
            evict: evict_arbitrary,
        }
    }

    pub fn claim(&self, match_id: &str, destination: &str) -> Result<LedgerClaim, ClaimRefused> {
        let mut state = self.state.lock();
        let already = state
            .notified
            .get(match_id)
            .is_some_and(|dests| dests.contains(destination));
        if already {
            return Err(ClaimRefused::AlreadyNotified);
        }
        let key = (match_id.to_string(), destination.to_string());
        if !state.pending.insert(key.clone()) {
            return Err(ClaimRefused::InFlight);
        }
        Ok(LedgerClaim { ledger: self.clone(), key, committed: false })
    }

    pub fn was_notified(&self, match_id: &str, destination: &str) -> bool {
        self.state
            .lock()
            .notified
            .get(match_id)
            .is_some_and(|dests| dests.contains(destination))
    }

    /// Remembered matches.
    pub fn len(&self) -> usize {
        self.state.lock().notified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Notified (match, destination) pairs.
    pub fn pair_count(&self) -> usize {
        self.state.lock().notified.values().map(HashSet::len).sum()
    }

    fn record(&self, (match_id, destination): &PairKey) {
        let mut state = self.state.lock();
        state.pending.remove(&(match_id.clone(), destination.clone()));
        if !state.notified.contains_key(match_id) && state.notified.len() >= self.capacity {
            if let Some(victim) = (self.evict)(&state.notified) {
                state.notified.remove(&victim);
            }
        }
        state
            .notified
            .entry(match_id.clone())
            .or_default()
            .insert(destination.clone());
    }

    fn release(&self, key: &PairKey) {
        self.state.lock().pending.remove(key);
    }
}

impl LedgerClaim {
    pub fn commit(mut self) {
        self.ledger.record(&self.key);
        self.committed = true;
    }
}

impl Drop for LedgerClaim {
    fn drop(&mut self) {
        if !self.committed {
            self.ledger.release(&self.key);
        }
    }
}
