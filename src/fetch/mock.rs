//! In-memory fetcher for testing
//!
//! Serves registered bytes after a configurable latency and records the time
//! window of every fetch, so tests can check ordering and overlap.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;

use super::{AssetFetcher, FetchError, GatewayConfig, ProgressSink, TransferProgress};

/// Number of progress callbacks emitted per transfer
const PROGRESS_STEPS: u64 = 4;

/// Time span of one completed fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchWindow {
    pub key: String,
    pub started: Instant,
    pub finished: Instant,
}

impl FetchWindow {
    pub fn overlaps(&self, other: &FetchWindow) -> bool {
        self.started < other.finished && other.started < self.finished
    }
}

/// Mock fetcher backed by in-memory maps
#[derive(Debug)]
pub struct MockFetcher {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    urls: RwLock<HashMap<String, Vec<u8>>>,
    failing: RwLock<HashSet<String>>,
    latency: Duration,
    report_totals: bool,
    gateway: GatewayConfig,
    windows: Mutex<Vec<FetchWindow>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            urls: RwLock::new(HashMap::new()),
            failing: RwLock::new(HashSet::new()),
            latency: Duration::from_millis(20),
            report_totals: true,
            gateway: GatewayConfig::default(),
            windows: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_gateway(mut self, gateway: GatewayConfig) -> Self {
        self.gateway = gateway;
        self
    }

    /// Report loaded bytes only, as a transfer without a length header would
    pub fn without_totals(mut self) -> Self {
        self.report_totals = false;
        self
    }

    pub fn insert_blob(&self, blob_id: impl Into<String>, data: Vec<u8>) {
        self.blobs.write().insert(blob_id.into(), data);
    }

    pub fn insert_url(&self, url: impl Into<String>, data: Vec<u8>) {
        self.urls.write().insert(url.into(), data);
    }

    /// Make every fetch of `key` (blob id or URL) fail
    pub fn fail(&self, key: impl Into<String>) {
        self.failing.write().insert(key.into());
    }

    /// Completed fetch windows in completion order
    pub fn windows(&self) -> Vec<FetchWindow> {
        self.windows.lock().clone()
    }

    /// Number of fetches issued, successful or not
    pub fn fetch_count(&self) -> usize {
        self.windows.lock().len()
    }

    /// Number of fetches issued for one key
    pub fn fetches_of(&self, key: &str) -> usize {
        self.windows.lock().iter().filter(|w| w.key == key).count()
    }

    /// Highest number of fetches that were ever in flight at once
    pub fn max_concurrent(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn serve(
        &self,
        key: &str,
        data: Option<Vec<u8>>,
        progress: ProgressSink<'_>,
    ) -> Result<Vec<u8>, FetchError> {
        let started = Instant::now();
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        let result = self.transfer(key, data, progress).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.windows.lock().push(FetchWindow {
            key: key.to_string(),
            started,
            finished: Instant::now(),
        });
        result
    }

    async fn transfer(
        &self,
        key: &str,
        data: Option<Vec<u8>>,
        progress: ProgressSink<'_>,
    ) -> Result<Vec<u8>, FetchError> {
        let step = self.latency / PROGRESS_STEPS as u32;

        if self.failing.read().contains(key) {
            tokio::time::sleep(self.latency).await;
            return Err(FetchError::Transfer {
                key: key.to_string(),
                message: "connection reset".to_string(),
            });
        }

        let data = data.ok_or_else(|| FetchError::NotFound(key.to_string()))?;
        let total = data.len() as u64;
        for i in 1..=PROGRESS_STEPS {
            tokio::time::sleep(step).await;
            progress(TransferProgress {
                loaded: total * i / PROGRESS_STEPS,
                total: self.report_totals.then_some(total),
            });
        }
        Ok(data)
    }
}

#[async_trait]
impl AssetFetcher for MockFetcher {
    async fn fetch_blob(
        &self,
        blob_id: &str,
        progress: ProgressSink<'_>,
    ) -> Result<Vec<u8>, FetchError> {
        let data = self.blobs.read().get(blob_id).cloned();
        if let Some(bytes) = &data {
            self.gateway.check_size(blob_id, bytes.len() as u64)?;
        }
        self.serve(blob_id, data, progress).await
    }

    async fn fetch_url(
        &self,
        url: &str,
        progress: ProgressSink<'_>,
    ) -> Result<Vec<u8>, FetchError> {
        let data = self.urls.read().get(url).cloned();
        self.serve(url, data, progress).await
    }
}
