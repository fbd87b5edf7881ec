//! Bounded, time-expiring cache of prior search results.
//!
//! Keys are normalized (lowercased, trimmed) query strings. Entries older
//! than the TTL are ignored by `get` but left in place; capacity is enforced
//! by evicting the oldest-inserted key. Re-putting a key refreshes its data
//! and timestamp without moving it in the eviction order.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::catalog::Product;

/// Default entry lifetime (5 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_millis(300_000);

/// Default number of cached queries.
pub const DEFAULT_CAPACITY: usize = 50;

/// Time source for expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self { now: Arc::new(Mutex::new(Instant::now())) }
    }
}

impl ManualClock {
    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.lock().map(|now| *now).unwrap_or_else(|poisoned| *poisoned.into_inner())
    }
}

#[derive(Debug, Clone)]
struct QueryCacheEntry {
    data: Vec<Product>,
    timestamp: Instant,
}

/// In-memory query cache owned by the page session.
#[derive(Debug)]
pub struct QueryCache<C: Clock = SystemClock> {
    entries: HashMap<String, QueryCacheEntry>,
    order: VecDeque<String>,
    ttl: Duration,
    capacity: usize,
    clock: C,
}

impl Default for QueryCache<SystemClock> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_CAPACITY)
    }
}

impl QueryCache<SystemClock> {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self::with_clock(ttl, capacity, SystemClock)
    }
}

impl<C: Clock> QueryCache<C> {
    pub fn with_clock(ttl: Duration, capacity: usize, clock: C) -> Self {
        Self { entries: HashMap::new(), order: VecDeque::new(), ttl, capacity, clock }
    }

    /// Lowercased, trimmed cache key.
    pub fn normalize(query: &str) -> String {
        query.trim().to_lowercase()
    }

    /// Cached results for a query, if present and younger than the TTL.
    pub fn get(&self, query: &str) -> Option<&[Product]> {
        let entry = self.entries.get(&Self::normalize(query))?;
        let age = self.clock.now().saturating_duration_since(entry.timestamp);
        if age < self.ttl {
            tracing::debug!(query, "query cache hit");
            Some(&entry.data)
        } else {
            tracing::debug!(query, age_ms = age.as_millis() as u64, "query cache entry stale");
            None
        }
    }

    /// Cache a result set.
    ///
    /// Empty result sets are never stored so a later retry can reach the
    /// network again. Returns whether the entry was stored.
    pub fn put(&mut self, query: &str, data: Vec<Product>) -> bool {
        if data.is_empty() {
            return false;
        }

        let key = Self::normalize(query);
        let entry = QueryCacheEntry { data, timestamp: self.clock.now() };
        if self.entries.insert(key.clone(), entry).is_none() {
            self.order.push_back(key);
        }

        while self.entries.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            tracing::debug!(query = %oldest, "query cache evicted oldest entry");
        }

        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}
