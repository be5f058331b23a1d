use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Bounded map evicting the oldest inserted entry first.
///
/// Re-inserting a key replaces its value and makes it the newest entry.
#[derive(Debug, Clone)]
pub(crate) struct BoundedCache<K, V> {
    capacity: usize,
    next_seq: u64,
    entries: HashMap<K, (u64, V)>,
    // Insertion sequence -> key, oldest first.
    order: BTreeMap<u64, K>,
}

impl<K, V> BoundedCache<K, V>
where
    K: Clone + Eq + Hash,
{
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            next_seq: 0,
            entries: HashMap::new(),
            order: BTreeMap::new(),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key).map(|(_, v)| v)
    }

    /// Insert `value`, returning the entries evicted to stay within capacity.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Vec<(K, V)> {
        let seq = self.next_seq;
        self.next_seq += 1;
        if let Some((old_seq, _)) = self.entries.insert(key.clone(), (seq, value)) {
            self.order.remove(&old_seq);
        }
        self.order.insert(seq, key);

        let mut evicted = Vec::new();
        while self.entries.len() > self.capacity {
            let Some((_, oldest)) = self.order.pop_first() else {
                break;
            };
            if let Some((_, v)) = self.entries.remove(&oldest) {
                evicted.push((oldest, v));
            }
        }
        evicted
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Entries oldest first.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.order
            .values()
            .filter_map(|k| self.entries.get(k).map(|(_, v)| (k, v)))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/cache.rs"]
mod tests;
