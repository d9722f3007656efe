use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Count-bounded store that evicts the least recently used entry.
///
/// `insert` hands the evicted pair back to the caller, which owns the
/// notification.
pub(crate) struct LruStore<K, V> {
    capacity: usize,
    tick: u64,
    entries: HashMap<K, (V, u64)>,
    order: BTreeMap<u64, K>,
}

impl<K: Eq + Hash + Clone, V> LruStore<K, V> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tick: 0,
            entries: HashMap::new(),
            order: BTreeMap::new(),
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    pub(crate) fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        let tick = self.next_tick();
        if let Some((_, old_tick)) = self.entries.insert(key.clone(), (value, tick)) {
            self.order.remove(&old_tick);
        }
        self.order.insert(tick, key);
        if self.entries.len() > self.capacity {
            return self.pop_oldest();
        }
        None
    }

    /// Marks the entry as most recently used.
    pub(crate) fn get(&mut self, key: &K) -> Option<&V> {
        let tick = self.next_tick();
        let (_, slot) = self.entries.get_mut(key)?;
        let old = std::mem::replace(slot, tick);
        if let Some(k) = self.order.remove(&old) {
            self.order.insert(tick, k);
        }
        self.entries.get(key).map(|(v, _)| v)
    }

    pub(crate) fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|(v, _)| v)
    }

    pub(crate) fn remove(&mut self, key: &K) -> Option<V> {
        let (value, tick) = self.entries.remove(key)?;
        self.order.remove(&tick);
        Some(value)
    }

    fn pop_oldest(&mut self) -> Option<(K, V)> {
        let (_, key) = self.order.pop_first()?;
        let (value, _) = self.entries.remove(&key)?;
        Some((key, value))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn evicts_least_recently_used() {
        let mut s = LruStore::new(2);
        assert!(s.insert("a", 1).is_none());
        assert!(s.insert("b", 2).is_none());
        assert_eq!(s.get(&"a"), Some(&1));
        assert_eq!(s.insert("c", 3), Some(("b", 2)));
        assert_eq!(s.len(), 2);
        assert!(s.peek(&"b").is_none());
    }

    #[test]
    fn replacing_a_key_does_not_evict() {
        let mut s = LruStore::new(1);
        assert!(s.insert("a", 1).is_none());
        assert!(s.insert("a", 2).is_none());
        assert_eq!(s.peek(&"a"), Some(&2));
        assert_eq!(s.remove(&"a"), Some(2));
        assert_eq!(s.len(), 0);
    }

    #[test]
    fn zero_capacity_is_clamped_to_one() {
        let s: LruStore<u8, u8> = LruStore::new(0);
        assert_eq!(s.capacity(), 1);
    }
}
