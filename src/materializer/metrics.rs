use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Tracks counters for asset materialization
#[derive(Debug, Default)]
pub struct LoadMetrics {
    load_times: RwLock<HashMap<String, Duration>>,
    fetches: AtomicU64,
    dedup_hits: AtomicU64,
    failures: AtomicU64,
    bytes_fetched: AtomicU64,
}

impl LoadMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record how long a node took from fetch start to insertion
    pub fn record_load_time(&self, name: String, duration: Duration) {
        self.load_times.write().insert(name, duration);
    }

    /// Record a completed fetch of `bytes` bytes
    pub fn record_fetch(&self, bytes: usize) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.bytes_fetched.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Record a load call answered from the tracked set
    pub fn record_dedup_hit(&self) {
        self.dedup_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fetches(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    pub fn dedup_hits(&self) -> u64 {
        self.dedup_hits.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn bytes_fetched(&self) -> u64 {
        self.bytes_fetched.load(Ordering::Relaxed)
    }

    pub fn load_time(&self, name: &str) -> Option<Duration> {
        self.load_times.read().get(name).cloned()
    }

    pub fn all_load_times(&self) -> HashMap<String, Duration> {
        self.load_times.read().clone()
    }
}

/// A thread-safe wrapper around LoadMetrics
#[derive(Debug, Clone, Default)]
pub struct LoadMetricsHandle(Arc<LoadMetrics>);

impl LoadMetricsHandle {
    pub fn new() -> Self {
        Self(Arc::new(LoadMetrics::new()))
    }
}

impl std::ops::Deref for LoadMetricsHandle {
    type Target = LoadMetrics;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
