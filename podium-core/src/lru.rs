//! A small bounded LRU keyed by exact string, used to cache speech
//! embeddings (spec.md §4.4 step 2, §9 "LRU cache").

use std::collections::VecDeque;

/// Capacity-bounded, deterministic LRU. Intrusive in the sense that it
/// keeps both the value and the recency order in one structure rather than
/// wrapping an external crate, matching spec.md §9's "small intrusive LRU".
pub struct LruCache<V> {
    capacity: usize,
    order: VecDeque<String>,
    entries: std::collections::HashMap<String, V>,
}

impl<V: Clone> LruCache<V> {
    pub fn new(capacity: usize) -> Self {
        LruCache {
            capacity,
            order: VecDeque::new(),
            entries: std::collections::HashMap::new(),
        }
    }

    /// Look up `key`, promoting it to most-recently-used on hit.
    pub fn get(&mut self, key: &str) -> Option<V> {
        if let Some(v) = self.entries.get(key).cloned() {
            self.touch(key);
            Some(v)
        } else {
            None
        }
    }

    /// Insert or refresh an entry, evicting the least-recently-used entry
    /// if over capacity.
    pub fn put(&mut self, key: String, value: V) {
        if self.entries.contains_key(&key) {
            self.entries.insert(key.clone(), value);
            self.touch(&key);
            return;
        }
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, value);
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push_back(key.to_string());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.entries.clear();
    }
}
