//! Injected caches: per-symbol model orders and a generic TTL map.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};

use crate::core::TimeSeries;
use crate::models::arima::{select_members, ModelOrders, OrderSearch};

/// Source of the current time for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Thread-safe map whose entries expire `ttl` after insertion.
///
/// Expired entries are invisible to `get` and dropped by `purge_expired`
/// or the next insert of the same key.
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, (DateTime<Utc>, V)>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    /// Cache on the system clock.
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    /// Live value for `key`, if any.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let entries = self.entries.read();
        entries
            .get(key)
            .filter(|(inserted, _)| now - *inserted < self.ttl)
            .map(|(_, v)| v.clone())
    }

    pub fn insert(&self, key: K, value: V) {
        let now = self.clock.now();
        self.entries.write().insert(key, (now, value));
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries.write().remove(key).map(|(_, v)| v)
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Drop expired entries; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, (inserted, _)| now - *inserted < self.ttl);
        before - entries.len()
    }

    /// Stored entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Per-symbol model orders, computed lazily.
///
/// Readers clone an `Arc` under a short read lock. Selection runs outside
/// the lock and is published with a single write. A selection where any
/// member fell back is returned but never published.
#[derive(Debug, Default)]
pub struct OrderCache {
    orders: RwLock<HashMap<String, Arc<ModelOrders>>>,
}

impl OrderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, symbol: &str) -> Option<Arc<ModelOrders>> {
        self.orders.read().get(symbol).cloned()
    }

    /// Cached orders for `symbol`, selecting them from `series` on a miss.
    ///
    /// When two callers race on a miss, the first published result wins.
    pub fn get_or_select(
        &self,
        symbol: &str,
        series: &TimeSeries,
        search: &OrderSearch,
    ) -> Arc<ModelOrders> {
        if let Some(orders) = self.get(symbol) {
            return orders;
        }

        let selection = select_members(series, search);
        let selected = Arc::new(selection.orders());
        if selection.used_fallback() {
            tracing::debug!(symbol, "fallback orders not cached");
            return selected;
        }
        let mut orders = self.orders.write();
        orders
            .entry(symbol.to_string())
            .or_insert(selected)
            .clone()
    }

    /// Re-run selection for `symbol` and replace whatever was cached.
    ///
    /// A selection that fell back leaves the cached entry untouched.
    pub fn refresh(
        &self,
        symbol: &str,
        series: &TimeSeries,
        search: &OrderSearch,
    ) -> Arc<ModelOrders> {
        let selection = select_members(series, search);
        let selected = Arc::new(selection.orders());
        if selection.used_fallback() {
            tracing::debug!(symbol, "fallback orders not cached");
            return selected;
        }
        self.orders
            .write()
            .insert(symbol.to_string(), Arc::clone(&selected));
        selected
    }

    pub fn set(&self, symbol: &str, orders: ModelOrders) {
        self.orders
            .write()
            .insert(symbol.to_string(), Arc::new(orders));
    }

    pub fn remove(&self, symbol: &str) -> Option<Arc<ModelOrders>> {
        self.orders.write().remove(symbol)
    }

    pub fn clear(&self) {
        self.orders.write().clear();
    }

    pub fn len(&self) -> usize {
        self.orders.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.read().is_empty()
    }
}
