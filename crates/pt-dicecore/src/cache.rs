//! Process-wide caches for compiled rule artifacts.
//!
//! Keys are the source text, so a cached entry can never be stale; entries
//! only leave through LRU eviction. A cache holds at most its entry count;
//! the byte budget handed to `lru_mem` is a ceiling for oversized keys.

use std::sync::{Arc, Mutex};

use lru_mem::{HeapSize, LruCache};

/// Byte allowance per entry, covering the key and bookkeeping.
const ENTRY_BYTES: usize = 4096;

/// Default number of entries per cache.
pub const DEFAULT_ENTRIES: usize = 50;

struct Shared<T>(Arc<T>);

impl<T> HeapSize for Shared<T> {
    fn heap_size(&self) -> usize {
        0
    }
}

/// An LRU cache of compiled values keyed by their source text.
pub struct CompileCache<T> {
    lru: Mutex<LruCache<String, Shared<T>>>,
    entries: usize,
}

impl<T> CompileCache<T> {
    /// Create a cache holding at most `entries` items.
    pub fn new(entries: usize) -> Self {
        let entries = entries.max(1);
        Self {
            lru: Mutex::new(LruCache::new(entries.saturating_mul(ENTRY_BYTES))),
            entries,
        }
    }

    /// Maximum number of entries kept.
    pub fn capacity(&self) -> usize {
        self.entries
    }

    /// Return the cached value for `key`, compiling and inserting it on a miss.
    ///
    /// Compile errors are returned and not cached.
    pub fn get_or_compile<E>(
        &self,
        key: &str,
        compile: impl FnOnce() -> Result<T, E>,
    ) -> Result<Arc<T>, E> {
        {
            let mut lru = self.lru.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(hit) = lru.get(key) {
                return Ok(Arc::clone(&hit.0));
            }
        }
        let value = Arc::new(compile()?);
        let mut lru = self.lru.lock().unwrap_or_else(|e| e.into_inner());
        // An entry larger than the whole cache is simply not kept.
        let _ = lru.insert(key.to_string(), Shared(Arc::clone(&value)));
        while lru.len() > self.entries {
            lru.remove_lru();
        }
        Ok(value)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.lru.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
