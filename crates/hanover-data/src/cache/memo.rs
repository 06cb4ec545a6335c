//! Bounded in-memory memo of decoded query results.

use polars::prelude::DataFrame;
use std::collections::HashMap;
use std::collections::VecDeque;

/// Default number of query results kept in memory.
pub const DEFAULT_CAPACITY: usize = 16;

/// Least-recently-used memo of decoded frames.
///
/// Sits in front of the SQLite store so repeated pipeline calls within a
/// session skip the decode step. This is the only mutable shared state in
/// the system; it is not thread-safe and is owned by a single engine.
#[derive(Debug)]
pub struct ResultCache {
    capacity: usize,
    entries: HashMap<String, DataFrame>,
    order: VecDeque<String>,
}

impl ResultCache {
    /// Create a memo with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a memo holding at most `capacity` results.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Fetch a result and mark it most recently used.
    pub fn get(&mut self, key: &str) -> Option<DataFrame> {
        if !self.entries.contains_key(key) {
            return None;
        }
        self.touch(key);
        self.entries.get(key).cloned()
    }

    /// Insert a result, evicting the least recently used entry if full.
    pub fn put(&mut self, key: &str, frame: DataFrame) {
        if self.entries.insert(key.to_string(), frame).is_some() {
            self.touch(key);
            return;
        }
        self.order.push_back(key.to_string());
        while self.entries.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.entries.remove(&evicted);
            }
        }
    }

    /// Number of results currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the memo is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all held results.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push_back(key.to_string());
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}
