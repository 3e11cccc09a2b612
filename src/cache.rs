use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Source of "now" for expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub fetched_at: Instant,
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    pub fn is_valid(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.fetched_at) < self.ttl
    }
}

/// Key→value cache with per-entry expiry.
///
/// Entries are replaced wholesale on refresh. The lock is never held while a
/// producer runs, so two callers may fetch the same key concurrently; the
/// later insert wins.
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, Arc<CacheEntry<V>>>>,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Returns the cached value for `key` if still valid, otherwise awaits
    /// `producer` and stores its result.
    pub async fn get<F, Fut>(&self, key: K, ttl: Duration, producer: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        if let Some(value) = self.peek(&key) {
            return value;
        }

        let value = producer().await;
        let entry = Arc::new(CacheEntry {
            value: value.clone(),
            fetched_at: self.clock.now(),
            ttl,
        });
        self.lock().insert(key, entry);
        value
    }

    /// The cached value for `key` if present and unexpired. Never fetches.
    pub fn peek(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        self.lock()
            .get(key)
            .filter(|e| e.is_valid(now))
            .map(|e| e.value.clone())
    }

    /// Snapshot of every unexpired value.
    pub fn valid_values(&self) -> Vec<V> {
        let now = self.clock.now();
        self.lock()
            .values()
            .filter(|e| e.is_valid(now))
            .map(|e| e.value.clone())
            .collect()
    }

    pub fn invalidate(&self, key: &K) {
        self.lock().remove(key);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Arc<CacheEntry<V>>>> {
        // A panic while holding the guard cannot leave a half-written entry.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
