use crate::pipeline::lock;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Condvar, Mutex};

#[derive(Debug)]
enum SlotState<V> {
    Pending,
    /// `None` when the leader finished without a value (error or panic); followers recompute.
    Done(Option<V>),
}

#[derive(Debug)]
pub(crate) struct Slot<V> {
    state: Mutex<SlotState<V>>,
    ready: Condvar,
}

impl<V: Clone> Slot<V> {
    fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Pending),
            ready: Condvar::new(),
        }
    }

    /// Block until the leader finishes.
    pub(crate) fn wait(&self) -> Option<V> {
        let mut state = lock(&self.state);
        loop {
            match &*state {
                SlotState::Done(v) => return v.clone(),
                SlotState::Pending => {
                    state = self
                        .ready
                        .wait(state)
                        .unwrap_or_else(std::sync::PoisonError::into_inner);
                }
            }
        }
    }

    fn finish(&self, value: Option<V>) {
        *lock(&self.state) = SlotState::Done(value);
        self.ready.notify_all();
    }
}

/// Per-key in-flight requests. The first caller for a key leads and computes; callers arriving
/// before it finishes wait for its result instead.
#[derive(Debug)]
pub(crate) struct InFlight<K, V> {
    slots: Mutex<HashMap<K, Arc<Slot<V>>>>,
}

impl<K, V> Default for InFlight<K, V> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

pub(crate) enum Claim<'a, K: Eq + Hash + Clone, V: Clone> {
    Leader(LeaderGuard<'a, K, V>),
    Follower(Arc<Slot<V>>),
}

impl<K: Eq + Hash + Clone, V: Clone> InFlight<K, V> {
    pub(crate) fn claim(&self, key: &K) -> Claim<'_, K, V> {
        let mut slots = lock(&self.slots);
        if let Some(slot) = slots.get(key) {
            return Claim::Follower(Arc::clone(slot));
        }
        let slot = Arc::new(Slot::new());
        slots.insert(key.clone(), Arc::clone(&slot));
        Claim::Leader(LeaderGuard {
            owner: self,
            key: key.clone(),
            slot,
            done: false,
        })
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        lock(&self.slots).len()
    }

    fn release(&self, key: &K) {
        lock(&self.slots).remove(key);
    }
}

/// Held by the computing caller. Dropping it without [`LeaderGuard::complete`] wakes followers
/// with no value.
pub(crate) struct LeaderGuard<'a, K: Eq + Hash + Clone, V: Clone> {
    owner: &'a InFlight<K, V>,
    key: K,
    slot: Arc<Slot<V>>,
    done: bool,
}

impl<K: Eq + Hash + Clone, V: Clone> LeaderGuard<'_, K, V> {
    pub(crate) fn complete(mut self, value: V) {
        self.finish(Some(value));
    }

    fn finish(&mut self, value: Option<V>) {
        if self.done {
            return;
        }
        self.done = true;
        self.owner.release(&self.key);
        self.slot.finish(value);
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Drop for LeaderGuard<'_, K, V> {
    fn drop(&mut self) {
        self.finish(None);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/coalesce.rs"]
mod tests;
