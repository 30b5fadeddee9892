//! Batch metrics counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-local counters for one batch run
#[derive(Debug, Default)]
pub struct Metrics {
    lines_read: AtomicU64,
    parse_failures: AtomicU64,
    records_dropped: AtomicU64,
    quality_repairs: AtomicU64,
    cache_hits: AtomicU64,
    lookups_attempted: AtomicU64,
    lookup_failures: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines_read(&self, count: u64) {
        self.lines_read.fetch_add(count, Ordering::Relaxed);
    }

    pub fn parse_failure(&self) {
        self.parse_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.records_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn quality_repairs(&self, count: u64) {
        self.quality_repairs.fetch_add(count, Ordering::Relaxed);
    }

    pub fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn lookup_attempted(&self) {
        self.lookups_attempted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn lookup_failed(&self) {
        self.lookup_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            lines_read: self.lines_read.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
            quality_repairs: self.quality_repairs.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            lookups_attempted: self.lookups_attempted.load(Ordering::Relaxed),
            lookup_failures: self.lookup_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub lines_read: u64,
    pub parse_failures: u64,
    pub records_dropped: u64,
    pub quality_repairs: u64,
    pub cache_hits: u64,
    pub lookups_attempted: u64,
    pub lookup_failures: u64,
}
