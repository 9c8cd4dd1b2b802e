//! Prepared-statement cache (spec.md §5 "Shared-resource policy").
//!
//! A bounded LRU keyed by a hash of the SQL text, guarded by a single
//! `Mutex`. Hit moves the entry to the tail; insertion past capacity
//! evicts from the head. No teacher file owns statement caching — the
//! teacher delegates to `sqlx`'s pool-internal cache — so the eviction
//! policy here is built directly from spec.md's prose (see DESIGN.md).

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

/// Hashes SQL text into the cache key spec.md names (`hash(sql_text)`).
#[must_use]
pub fn hash_sql(sql_text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    sql_text.hash(&mut hasher);
    hasher.finish()
}

struct Entry {
    handle: u64,
    prev: Option<u64>,
    next: Option<u64>,
}

struct Inner {
    entries: HashMap<u64, Entry>,
    head: Option<u64>,
    tail: Option<u64>,
    capacity: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl Inner {
    fn unlink(&mut self, key: u64) {
        let (prev, next) = {
            let entry = &self.entries[&key];
            (entry.prev, entry.next)
        };
        match prev {
            Some(p) => self.entries.get_mut(&p).unwrap().next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.entries.get_mut(&n).unwrap().prev = prev,
            None => self.tail = prev,
        }
    }

    fn push_tail(&mut self, key: u64) {
        let old_tail = self.tail;
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.prev = old_tail;
            entry.next = None;
        }
        if let Some(t) = old_tail {
            self.entries.get_mut(&t).unwrap().next = Some(key);
        } else {
            self.head = Some(key);
        }
        self.tail = Some(key);
    }

    fn touch(&mut self, key: u64) {
        self.unlink(key);
        self.push_tail(key);
    }

    fn evict_head(&mut self) {
        if let Some(head) = self.head {
            self.unlink(head);
            self.entries.remove(&head);
            self.evictions += 1;
        }
    }
}

/// A bounded, LRU-evicted cache from SQL-text hash to a prepared-statement
/// handle.
pub struct StatementCache {
    inner: Mutex<Inner>,
}

impl StatementCache {
    /// Creates a cache holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                head: None,
                tail: None,
                capacity: capacity.max(1),
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
        }
    }

    /// Looks up `sql_text`'s cached handle, moving it to the tail (most
    /// recently used) on a hit.
    pub fn get(&self, sql_text: &str) -> Option<u64> {
        let key = hash_sql(sql_text);
        let mut inner = self.inner.lock().unwrap();
        if inner.entries.contains_key(&key) {
            inner.touch(key);
            inner.hits += 1;
            Some(inner.entries[&key].handle)
        } else {
            inner.misses += 1;
            None
        }
    }

    /// Inserts `sql_text` → `handle`, evicting from the head if the
    /// cache is over capacity.
    pub fn insert(&self, sql_text: &str, handle: u64) {
        let key = hash_sql(sql_text);
        let mut inner = self.inner.lock().unwrap();
        if inner.entries.contains_key(&key) {
            inner.entries.get_mut(&key).unwrap().handle = handle;
            inner.touch(key);
            return;
        }
        inner.entries.insert(
            key,
            Entry {
                handle,
                prev: None,
                next: None,
            },
        );
        inner.push_tail(key);
        let capacity = inner.capacity;
        while inner.entries.len() > capacity {
            inner.evict_head();
        }
    }

    /// Total cache hits since construction.
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.inner.lock().unwrap().hits
    }

    /// Total cache misses since construction.
    #[must_use]
    pub fn misses(&self) -> u64 {
        self.inner.lock().unwrap().misses
    }

    /// Total evictions since construction.
    #[must_use]
    pub fn evictions(&self) -> u64 {
        self.inner.lock().unwrap().evictions
    }

    /// Current entry count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    /// Whether the cache currently holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
