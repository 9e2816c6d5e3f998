//! Read statistics for the datasource registry
//!
//! Counters are atomics so a registry shared across tasks can record without
//! locking. They track cache hits/misses, reader failures and bytes fetched.

use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics collector for datasource reads
#[derive(Debug, Default)]
pub struct ReadStats {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    read_failures: AtomicU64,
    bytes_read: AtomicU64,
}

/// Snapshot of read statistics at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub read_failures: u64,
    pub bytes_read: u64,
}

impl ReadStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a reader call that returned an error
    pub fn record_read_failure(&self) {
        self.read_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record bytes fetched by a reader (cache hits are not counted)
    pub fn record_bytes_read(&self, bytes: u64) {
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Get a snapshot of the current counters
    pub fn get_stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            read_failures: self.read_failures.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// Cache hit rate as a percentage (0.0 to 100.0)
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            (self.cache_hits as f64 / total as f64) * 100.0
        }
    }
}
