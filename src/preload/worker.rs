//! Threaded prefetch backend.
//!
//! - Bounded worker pool (2-4 threads) serving a flume request queue
//! - Warm-up reads the head of local files so the OS page cache holds them
//! - LRU of recently warmed URLs (xxhash keys) skips redundant work
//! - Results go back over a flume channel and are drained on the UI thread

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use flume::{Receiver, Sender};
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, trace, warn};
use xxhash_rust::xxh3::xxh3_64;

use super::preloader::{PrefetchCompletion, PrefetchOutcome, PrefetchRequest, Prefetcher};

/// Default number of worker threads.
pub const DEFAULT_WORKERS: usize = 2;

/// Maximum number of worker threads.
const MAX_WORKERS: usize = 4;

/// Maximum number of pending requests in the queue.
const MAX_QUEUE_SIZE: usize = 64;

/// Default number of warmed URLs remembered.
pub const DEFAULT_WARM_ENTRIES: usize = 256;

/// Bytes read from the head of a local file to warm it.
const WARM_READ_BYTES: u64 = 64 * 1024;

fn url_key(url: &str) -> u64 {
    xxh3_64(url.as_bytes())
}

/// Prefetch backend backed by worker threads.
pub struct WorkerPrefetcher {
    request_tx: Sender<PrefetchRequest>,
    result_tx: Sender<PrefetchCompletion>,
    result_rx: Receiver<PrefetchCompletion>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    /// URL keys currently being warmed.
    in_flight: Arc<RwLock<HashSet<u64>>>,
    /// Recently warmed URL keys.
    warm: Arc<Mutex<LruCache<u64, ()>>>,
}

impl WorkerPrefetcher {
    pub fn new(workers: usize, warm_entries: usize) -> Self {
        let num_workers = workers.clamp(1, MAX_WORKERS);
        let capacity = NonZeroUsize::new(warm_entries.max(1)).unwrap_or(NonZeroUsize::MIN);

        let (request_tx, request_rx) = flume::bounded(MAX_QUEUE_SIZE);
        let (result_tx, result_rx) = flume::unbounded();

        let shutdown = Arc::new(AtomicBool::new(false));
        let in_flight = Arc::new(RwLock::new(HashSet::new()));
        let warm = Arc::new(Mutex::new(LruCache::new(capacity)));

        let mut handles = Vec::with_capacity(num_workers);
        for worker_id in 0..num_workers {
            let rx = request_rx.clone();
            let tx = result_tx.clone();
            let shutdown = Arc::clone(&shutdown);
            let in_flight = Arc::clone(&in_flight);
            let warm = Arc::clone(&warm);

            let spawned = thread::Builder::new()
                .name(format!("prefetch-worker-{}", worker_id))
                .spawn(move || worker_loop(worker_id, rx, tx, shutdown, in_flight, warm));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => error!(worker_id, error = ?e, "Failed to spawn prefetch worker"),
            }
        }

        debug!(num_workers = handles.len(), "Started prefetch workers");

        Self {
            request_tx,
            result_tx,
            result_rx,
            workers: handles,
            shutdown,
            in_flight,
            warm,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.in_flight.read().len()
    }

    pub fn is_warm(&self, url: &str) -> bool {
        self.warm.lock().contains(&url_key(url))
    }

    pub fn shutdown(&mut self) {
        debug!("Shutting down prefetch workers");
        self.shutdown.store(true, Ordering::SeqCst);
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }

    fn complete_now(&self, request: PrefetchRequest, outcome: PrefetchOutcome) {
        let _ = self.result_tx.send(PrefetchCompletion {
            token: request.token,
            outcome,
        });
    }
}

impl Default for WorkerPrefetcher {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS, DEFAULT_WARM_ENTRIES)
    }
}

impl Prefetcher for WorkerPrefetcher {
    fn prefetch(&self, request: PrefetchRequest) {
        let key = url_key(&request.url);

        if self.warm.lock().get(&key).is_some() {
            trace!(url = %request.url, "Already warm");
            self.complete_now(request, PrefetchOutcome::Skipped);
            return;
        }
        if !self.in_flight.write().insert(key) {
            // The running fetch reports for this URL.
            trace!(url = %request.url, "Prefetch already in flight");
            return;
        }

        match self.request_tx.try_send(request) {
            Ok(()) => {}
            Err(flume::TrySendError::Full(request)) => {
                warn!("Prefetch queue full, dropping request");
                self.in_flight.write().remove(&key);
                self.complete_now(request, PrefetchOutcome::Failed("queue full".into()));
            }
            Err(flume::TrySendError::Disconnected(request)) => {
                error!("Prefetch queue disconnected");
                self.in_flight.write().remove(&key);
                self.complete_now(request, PrefetchOutcome::Failed("workers stopped".into()));
            }
        }
    }

    fn completed(&self) -> Vec<PrefetchCompletion> {
        self.result_rx.try_iter().collect()
    }
}

impl Drop for WorkerPrefetcher {
    fn drop(&mut self) {
        if !self.shutdown.load(Ordering::Relaxed) {
            self.shutdown();
        }
    }
}

fn worker_loop(
    worker_id: usize,
    rx: Receiver<PrefetchRequest>,
    tx: Sender<PrefetchCompletion>,
    shutdown: Arc<AtomicBool>,
    in_flight: Arc<RwLock<HashSet<u64>>>,
    warm: Arc<Mutex<LruCache<u64, ()>>>,
) {
    debug!(worker_id, "Prefetch worker started");

    loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(request) => {
                let key = url_key(&request.url);
                let outcome = match warm_resource(&request.url) {
                    Ok(bytes) => {
                        trace!(worker_id, url = %request.url, bytes, "Warmed resource");
                        warm.lock().put(key, ());
                        PrefetchOutcome::Warmed
                    }
                    Err(e) => {
                        debug!(worker_id, url = %request.url, error = %e, "Warm-up failed");
                        PrefetchOutcome::Failed(format!("{e:#}"))
                    }
                };
                in_flight.write().remove(&key);

                if tx
                    .send(PrefetchCompletion {
                        token: request.token,
                        outcome,
                    })
                    .is_err()
                {
                    break;
                }
            }
            Err(flume::RecvTimeoutError::Timeout) => continue,
            Err(flume::RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!(worker_id, "Prefetch worker stopped");
}

/// Reads the head of a local resource. Remote URLs need a host-provided
/// prefetcher.
fn warm_resource(url: &str) -> Result<usize> {
    if url.starts_with("http://") || url.starts_with("https://") {
        bail!("remote source {url} needs a host prefetcher");
    }
    let path = Path::new(url.strip_prefix("file://").unwrap_or(url));
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let mut head = Vec::with_capacity(WARM_READ_BYTES as usize);
    file.take(WARM_READ_BYTES)
        .read_to_end(&mut head)
        .with_context(|| format!("Failed to read {:?}", path))?;
    Ok(head.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SlideKind;
    use crate::preload::PrefetchToken;
    use std::io::Write;
    use std::time::Instant;
    use tempfile::NamedTempFile;

    fn request(url: &str, generation: u64) -> PrefetchRequest {
        PrefetchRequest {
            token: PrefetchToken {
                generation,
                slide_id: url.into(),
            },
            index: 0,
            kind: SlideKind::Image,
            url: url.to_string(),
        }
    }

    fn wait_for(prefetcher: &WorkerPrefetcher, count: usize) -> Vec<PrefetchCompletion> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut out = Vec::new();
        while out.len() < count && Instant::now() < deadline {
            out.extend(prefetcher.completed());
            thread::sleep(Duration::from_millis(5));
        }
        out
    }

    #[test]
    fn test_warms_local_file_then_skips() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[7u8; 1024]).unwrap();
        let url = file.path().to_string_lossy().to_string();

        let prefetcher = WorkerPrefetcher::new(1, 8);
        prefetcher.prefetch(request(&url, 1));
        let done = wait_for(&prefetcher, 1);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].outcome, PrefetchOutcome::Warmed);
        assert!(prefetcher.is_warm(&url));

        prefetcher.prefetch(request(&url, 2));
        let done = wait_for(&prefetcher, 1);
        assert_eq!(done[0].outcome, PrefetchOutcome::Skipped);
        assert_eq!(done[0].token.generation, 2);
    }

    #[test]
    fn test_duplicate_in_flight_reports_nothing() {
        let prefetcher = WorkerPrefetcher::new(1, 8);
        let url = "/nonexistent/idxv/busy.png";
        prefetcher.in_flight.write().insert(url_key(url));

        prefetcher.prefetch(request(url, 1));
        thread::sleep(Duration::from_millis(50));
        assert!(prefetcher.completed().is_empty());
        assert_eq!(prefetcher.pending_count(), 1);
        assert!(!prefetcher.is_warm(url));
    }

    #[test]
    fn test_missing_file_fails_quietly() {
        let prefetcher = WorkerPrefetcher::new(2, 8);
        prefetcher.prefetch(request("/nonexistent/idxv/file.png", 1));
        let done = wait_for(&prefetcher, 1);
        assert!(matches!(done[0].outcome, PrefetchOutcome::Failed(_)));
        assert_eq!(prefetcher.pending_count(), 0);
    }

    #[test]
    fn test_remote_urls_rejected() {
        assert!(warm_resource("https://example.com/a.png").is_err());
    }

    #[test]
    fn test_worker_count_clamped() {
        let mut prefetcher = WorkerPrefetcher::new(0, 0);
        assert_eq!(prefetcher.workers.len(), 1);
        prefetcher.shutdown();
        assert!(prefetcher.workers.is_empty());
    }
}
