// SPDX-License-Identifier: Apache-2.0

use crate::effect_adapters::clock_adapters::{Clock, SystemClock};
use nccid_model::{CacheKey, DatasetVersion, View};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

struct CacheEntry {
    value: Arc<View>,
    /// `None` when `now + ttl` is past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

type Slot = Arc<Mutex<Option<CacheEntry>>>;

#[derive(Default)]
pub struct ViewCacheMetrics {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub computations: AtomicU64,
    pub compute_failures: AtomicU64,
    pub evictions: AtomicU64,
    pub stale_bypasses: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ViewCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub computations: u64,
    pub compute_failures: u64,
    pub evictions: u64,
    pub stale_bypasses: u64,
    pub keys: usize,
}

/// Derived-view cache with per-key single-flight.
///
/// Each key owns a slot guarded by its own async mutex. The first caller on
/// a cold or expired slot computes while holding the slot; concurrent callers
/// for that key queue on the same lock and read the stored value when they
/// get it. The key map lock is only held to find or create a slot, so
/// unrelated keys never wait on each other's computations.
pub struct ViewCache {
    slots: Mutex<HashMap<CacheKey, Slot>>,
    newest_version: AtomicU64,
    clock: Arc<dyn Clock>,
    pub metrics: ViewCacheMetrics,
}

impl Default for ViewCache {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl ViewCache {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            newest_version: AtomicU64::new(0),
            clock,
            metrics: ViewCacheMetrics::default(),
        }
    }

    /// Returns the cached view for `key`, computing it at most once at a time.
    ///
    /// Failed computations are not stored: the error goes to the caller that
    /// ran `compute`, and the next waiter computes again.
    ///
    /// A key older than the newest version seen is computed for the caller
    /// and never stored, so a reader holding a superseded snapshot cannot
    /// repopulate the cache after a sweep.
    pub async fn get<E, F>(&self, key: CacheKey, ttl: Duration, compute: F) -> Result<Arc<View>, E>
    where
        F: FnOnce() -> Result<View, E>,
    {
        let version = key.version.get();
        let newest = self.newest_version.fetch_max(version, Ordering::AcqRel);
        if newest < version {
            self.retain_version(key.version).await;
        } else if version < newest {
            self.metrics.stale_bypasses.fetch_add(1, Ordering::Relaxed);
            debug!(
                kind = key.kind().as_str(),
                version,
                newest,
                "superseded view computed uncached"
            );
            return self.run_compute(compute).map(Arc::new);
        }

        let slot = {
            let mut slots = self.slots.lock().await;
            Arc::clone(slots.entry(key.clone()).or_default())
        };
        let mut entry = slot.lock().await;
        if let Some(cached) = entry.as_ref() {
            if cached.is_fresh(self.clock.now()) {
                self.metrics.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Arc::clone(&cached.value));
            }
            *entry = None;
            self.metrics.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(kind = key.kind().as_str(), version, "expired view evicted");
        }

        let value = Arc::new(self.run_compute(compute)?);
        *entry = Some(CacheEntry {
            value: Arc::clone(&value),
            expires_at: self.clock.now().checked_add(ttl),
        });
        Ok(value)
    }

    fn run_compute<E, F>(&self, compute: F) -> Result<View, E>
    where
        F: FnOnce() -> Result<View, E>,
    {
        self.metrics.misses.fetch_add(1, Ordering::Relaxed);
        let result = compute();
        let counter = if result.is_ok() {
            &self.metrics.computations
        } else {
            &self.metrics.compute_failures
        };
        counter.fetch_add(1, Ordering::Relaxed);
        result
    }

    /// Drops every key older than `version`. Returns how many were removed.
    pub async fn retain_version(&self, version: DatasetVersion) -> usize {
        self.newest_version
            .fetch_max(version.get(), Ordering::AcqRel);
        let mut slots = self.slots.lock().await;
        let before = slots.len();
        slots.retain(|key, _| key.version >= version);
        let removed = before - slots.len();
        if removed > 0 {
            self.metrics
                .evictions
                .fetch_add(removed as u64, Ordering::Relaxed);
            debug!(removed, version = version.get(), "superseded views evicted");
        }
        removed
    }

    /// Number of tracked keys, including ones whose computation is in flight.
    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn stats(&self) -> ViewCacheStats {
        ViewCacheStats {
            hits: self.metrics.hits.load(Ordering::Relaxed),
            misses: self.metrics.misses.load(Ordering::Relaxed),
            computations: self.metrics.computations.load(Ordering::Relaxed),
            compute_failures: self.metrics.compute_failures.load(Ordering::Relaxed),
            evictions: self.metrics.evictions.load(Ordering::Relaxed),
            stale_bypasses: self.metrics.stale_bypasses.load(Ordering::Relaxed),
            keys: self.len().await,
        }
    }
}
