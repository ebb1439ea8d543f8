//! # Listing Cache
//!
//! TTL-bounded cache of listing pages, keyed by query shape.
//!
//! Keys encode everything that changes the result set:
//! `products_{offset}_{limit}` for plain listings and
//! `search_{term}_{offset}_{limit}` for title searches. Entries expire by
//! age alone; there is no size bound because the key space is tiny (a user
//! pages through at most a few dozen distinct queries per TTL window).
//!
//! Expired entries are dropped lazily on [`get`](ListingCache::get), with an
//! optional background sweeper for hosts that care about idle memory.

use crate::types::Product;
use bridge_traits::Clock;
use chrono::{DateTime, Utc};
use core_runtime::config::CoreConfig;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

struct CacheEntry {
    products: Vec<Product>,
    total: u64,
    stored_at: DateTime<Utc>,
}

pub struct ListingCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ListingCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    /// Builds a cache with the configured TTL and time source.
    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(config.cache_ttl, Arc::clone(&config.clock))
    }

    /// Cache key for a plain listing page.
    pub fn listing_key(offset: u32, limit: u32) -> String {
        format!("products_{}_{}", offset, limit)
    }

    /// Cache key for a search page.
    pub fn search_key(term: &str, offset: u32, limit: u32) -> String {
        format!("search_{}_{}_{}", term, offset, limit)
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        let age = self.clock.now() - entry.stored_at;
        age.num_milliseconds() >= self.ttl.as_millis() as i64
    }

    /// Returns the cached page for `key`, dropping it first if it has aged
    /// out.
    pub async fn get(&self, key: &str) -> Option<(Vec<Product>, u64)> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !self.is_expired(entry) => {
                    trace!(key, "Cache hit");
                    return Some((entry.products.clone(), entry.total));
                }
                Some(_) => {}
                None => {
                    trace!(key, "Cache miss");
                    return None;
                }
            }
        }

        // Entry existed but expired; upgrade to a write lock and drop it.
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(key) {
            if self.is_expired(entry) {
                debug!(key, "Cache entry expired");
                entries.remove(key);
            } else {
                // Refreshed by a concurrent put between our locks
                return Some((entry.products.clone(), entry.total));
            }
        }
        None
    }

    /// Stores a page, resetting its age.
    pub async fn put(&self, key: String, products: Vec<Product>, total: u64) {
        let mut entries = self.entries.write().await;
        trace!(key = %key, count = products.len(), "Cache store");
        entries.insert(
            key,
            CacheEntry {
                products,
                total,
                stored_at: self.clock.now(),
            },
        );
    }

    /// Removes every entry regardless of age.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Removes all expired entries and returns how many were dropped.
    pub async fn sweep(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| {
            let age = self.clock.now() - entry.stored_at;
            age.num_milliseconds() < self.ttl.as_millis() as i64
        });
        let dropped = before - entries.len();
        if dropped > 0 {
            debug!(dropped, "Swept expired cache entries");
        }
        dropped
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Spawns a background task that sweeps at the given interval until the
    /// returned handle is aborted or the cache is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                cache.sweep().await;
            }
        })
    }
}
