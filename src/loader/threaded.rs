//! Worker-thread media loader.
//!
//! Requests go over a flume queue to a single probe thread. Results come
//! back on an `async_channel`, so a host can either poll from its UI loop or
//! await them from an async task.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{bail, Result};
use flume::{Receiver, Sender};
use tracing::{debug, error, trace, warn};

use super::{LoadOutcome, LoadRequest, LoadResult, MediaLoader};
use crate::scanner::metadata::{MediaMetadata, MetadataExtractor};

pub struct ThreadedMediaLoader {
    request_tx: Sender<LoadRequest>,
    result_rx: async_channel::Receiver<LoadResult>,
    worker: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    /// Newest generation requested; older queued requests are skipped.
    latest: Arc<AtomicU64>,
}

impl ThreadedMediaLoader {
    pub fn new() -> Self {
        let (request_tx, request_rx) = flume::unbounded();
        let (result_tx, result_rx) = async_channel::unbounded();
        let shutdown = Arc::new(AtomicBool::new(false));
        let latest = Arc::new(AtomicU64::new(0));

        let worker = {
            let shutdown = Arc::clone(&shutdown);
            let latest = Arc::clone(&latest);
            thread::Builder::new()
                .name("media-loader".into())
                .spawn(move || worker_loop(request_rx, result_tx, shutdown, latest))
        };
        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!(error = ?e, "Failed to spawn media loader thread");
                None
            }
        };

        Self {
            request_tx,
            result_rx,
            worker,
            shutdown,
            latest,
        }
    }

    /// Receiver for hosts that await results instead of polling.
    pub fn results(&self) -> async_channel::Receiver<LoadResult> {
        self.result_rx.clone()
    }

    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl Default for ThreadedMediaLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaLoader for ThreadedMediaLoader {
    fn request(&self, request: LoadRequest) {
        self.latest.fetch_max(request.generation, Ordering::SeqCst);
        trace!(slide_id = %request.slide_id, generation = request.generation, "Queued media load");
        if self.request_tx.send(request).is_err() {
            warn!("Media loader thread is gone");
        }
    }

    fn poll(&self) -> Vec<LoadResult> {
        let mut results = Vec::new();
        while let Ok(result) = self.result_rx.try_recv() {
            results.push(result);
        }
        results
    }
}

impl Drop for ThreadedMediaLoader {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(
    rx: Receiver<LoadRequest>,
    tx: async_channel::Sender<LoadResult>,
    shutdown: Arc<AtomicBool>,
    latest: Arc<AtomicU64>,
) {
    debug!("Media loader started");

    loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(request) => {
                if request.generation < latest.load(Ordering::SeqCst) {
                    trace!(slide_id = %request.slide_id, generation = request.generation, "Skipping superseded load");
                    continue;
                }
                let outcome = match load(&request) {
                    Ok(meta) => LoadOutcome::Loaded {
                        natural_size: meta.natural_size,
                        page_count: meta.page_count,
                    },
                    Err(e) => {
                        debug!(slide_id = %request.slide_id, error = %e, "Media load failed");
                        LoadOutcome::Failed(format!("{e:#}"))
                    }
                };
                let result = LoadResult {
                    generation: request.generation,
                    slide_id: request.slide_id,
                    outcome,
                };
                if tx.send_blocking(result).is_err() {
                    break;
                }
            }
            Err(flume::RecvTimeoutError::Timeout) => continue,
            Err(flume::RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!("Media loader stopped");
}

fn load(request: &LoadRequest) -> Result<MediaMetadata> {
    if request.url.starts_with("http://") || request.url.starts_with("https://") {
        bail!("remote source {} needs a host loader", request.url);
    }
    let path = Path::new(request.url.strip_prefix("file://").unwrap_or(&request.url));
    MetadataExtractor::probe(path, request.kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Size, SlideKind};
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    fn png_file(width: u32, height: u32) -> NamedTempFile {
        let mut file = NamedTempFile::with_suffix(".png").unwrap();
        let mut bytes = Vec::new();
        image::RgbImage::new(width, height)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        file.write_all(&bytes).unwrap();
        file
    }

    fn request(url: &str, kind: SlideKind, generation: u64) -> LoadRequest {
        LoadRequest {
            generation,
            slide_id: url.into(),
            kind,
            url: url.to_string(),
        }
    }

    #[tokio::test]
    async fn test_loads_image_size() {
        let file = png_file(12, 34);
        let url = file.path().to_string_lossy().to_string();
        let loader = ThreadedMediaLoader::new();
        let results = loader.results();

        loader.request(request(&url, SlideKind::Image, 1));
        let result = tokio::time::timeout(Duration::from_secs(5), results.recv())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result.generation, 1);
        assert_eq!(
            result.outcome,
            LoadOutcome::Loaded {
                natural_size: Some(Size::new(12.0, 34.0)),
                page_count: None,
            }
        );
    }

    #[tokio::test]
    async fn test_broken_source_reports_failure() {
        let mut file = NamedTempFile::with_suffix(".png").unwrap();
        file.write_all(b"garbage").unwrap();
        let url = format!("file://{}", file.path().display());
        let loader = ThreadedMediaLoader::new();
        let results = loader.results();

        loader.request(request(&url, SlideKind::Image, 1));
        let result = tokio::time::timeout(Duration::from_secs(5), results.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result.outcome, LoadOutcome::Failed(_)));
    }

    #[test]
    fn test_remote_urls_fail() {
        let result = load(&request("https://example.com/a.png", SlideKind::Image, 1));
        assert!(result.is_err());
    }
}
