// src/cache.rs
//! Process-local TTL cache for market snapshots, keyed by the ticker set.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use metrics::counter;
use tokio::time::Instant;

use crate::fetch::MarketSnapshot;

#[derive(Debug)]
struct Entry {
    stored_at: Instant,
    value: Option<MarketSnapshot>,
}

/// Absolute TTL (no sliding refresh). Absent snapshots are cached too, so a dead
/// market source is not hammered on every request.
#[derive(Debug)]
pub struct MarketCache {
    ttl: Duration,
    inner: Mutex<HashMap<String, Entry>>,
}

impl MarketCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Order-independent key: the ticker set is already sorted.
    pub fn key_for(tickers: &BTreeSet<String>) -> String {
        tickers.iter().cloned().collect::<Vec<_>>().join(",")
    }

    /// `Some(value)` on a fresh hit (the value itself may be `None`).
    pub fn get(&self, tickers: &BTreeSet<String>) -> Option<Option<MarketSnapshot>> {
        let key = Self::key_for(tickers);
        let mut g = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        match g.get(&key) {
            Some(e) if e.stored_at.elapsed() < self.ttl => {
                counter!("market_cache_hits_total").increment(1);
                Some(e.value.clone())
            }
            Some(_) => {
                g.remove(&key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, tickers: &BTreeSet<String>, value: Option<MarketSnapshot>) {
        if self.ttl.is_zero() {
            return;
        }
        let key = Self::key_for(tickers);
        let mut g = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        g.insert(
            key,
            Entry {
                stored_at: Instant::now(),
                value,
            },
        );
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).clear();
    }
}
