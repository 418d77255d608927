//! Directory scanner that turns a folder of media into a `SlideList`.
//!
//! This module provides the `FileScanner` struct which handles:
//! - Recursive directory scanning using walkdir
//! - Slide kind detection by file extension
//! - Header-only metadata probing (natural size, page count)
//! - Progress reporting via channels

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task;
use tracing::{debug, info, trace, warn};
use walkdir::WalkDir;

use crate::models::{Slide, SlideKind, SlideList};
use crate::scanner::metadata::MetadataExtractor;

#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Whether to scan directories recursively.
    pub recursive: bool,
    /// Maximum directory depth (0 = unlimited).
    pub max_depth: usize,
    /// Whether to follow symbolic links.
    pub follow_symlinks: bool,
    /// Probe headers for natural size and page count.
    pub probe_metadata: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            max_depth: 0, // unlimited
            follow_symlinks: false,
            probe_metadata: true,
        }
    }
}

/// Progress information sent during scanning.
#[derive(Debug, Clone)]
pub enum ScanProgress {
    Started { path: PathBuf },
    Discovered { count: usize },
    Probed { path: PathBuf, kind: SlideKind },
    Completed { total: usize, unsized_count: usize },
}

#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub total_files: usize,
    /// Slides whose natural size could not be determined.
    pub unsized_count: usize,
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
struct DiscoveredEntry {
    path: PathBuf,
    kind: SlideKind,
}

pub struct FileScanner {
    config: ScanConfig,
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl FileScanner {
    pub fn new() -> Self {
        Self {
            config: ScanConfig::default(),
        }
    }

    pub fn with_config(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Scans a directory and returns its slides in path order.
    pub async fn scan(dir: &Path) -> Result<SlideList> {
        let (slides, _) = Self::new().scan_directory(dir).await?;
        Ok(slides)
    }

    pub async fn scan_directory(&self, dir: &Path) -> Result<(SlideList, ScanResult)> {
        let dir = dir.to_path_buf();
        let config = self.config.clone();

        // Walk and probe on the blocking pool
        task::spawn_blocking(move || Self::scan_directory_sync(&dir, &config, None))
            .await
            .context("Scan task panicked")?
    }

    /// Scans with progress updates. Returns a receiver for progress and a
    /// handle to await the result.
    pub fn scan_with_progress(
        &self,
        dir: PathBuf,
    ) -> (
        mpsc::Receiver<ScanProgress>,
        task::JoinHandle<Result<(SlideList, ScanResult)>>,
    ) {
        let config = self.config.clone();
        let (tx, rx) = mpsc::channel(100);

        let handle = task::spawn_blocking(move || Self::scan_directory_sync(&dir, &config, Some(tx)));
        let wrapped_handle =
            task::spawn(async move { handle.await.context("Scan task panicked")? });

        (rx, wrapped_handle)
    }

    fn scan_directory_sync(
        dir: &Path,
        config: &ScanConfig,
        tx: Option<mpsc::Sender<ScanProgress>>,
    ) -> Result<(SlideList, ScanResult)> {
        let report = |progress: ScanProgress| {
            if let Some(tx) = &tx {
                let _ = tx.blocking_send(progress);
            }
        };

        info!("Starting scan of {:?}", dir);
        report(ScanProgress::Started {
            path: dir.to_path_buf(),
        });

        let discovered = Self::discover_files(dir, config)?;
        info!("Discovered {} media files", discovered.len());
        report(ScanProgress::Discovered {
            count: discovered.len(),
        });

        let mut slides = Vec::with_capacity(discovered.len());
        let mut unsized_count = 0;
        for entry in &discovered {
            let slide = Self::build_slide(entry, config.probe_metadata);
            if slide.natural_size.is_none() && !slide.is_document() {
                unsized_count += 1;
            }
            report(ScanProgress::Probed {
                path: entry.path.clone(),
                kind: entry.kind,
            });
            slides.push(slide);
        }

        let result = ScanResult {
            total_files: slides.len(),
            unsized_count,
            paths: discovered.into_iter().map(|e| e.path).collect(),
        };
        report(ScanProgress::Completed {
            total: result.total_files,
            unsized_count: result.unsized_count,
        });

        info!(
            "Scan complete: {} slides, {} without natural size",
            result.total_files, result.unsized_count
        );

        let slides = SlideList::new(slides).context("Scanned paths produced duplicate ids")?;
        Ok((slides, result))
    }

    fn discover_files(dir: &Path, config: &ScanConfig) -> Result<Vec<DiscoveredEntry>> {
        if !dir.is_dir() {
            anyhow::bail!("{:?} is not a directory", dir);
        }

        let mut walker = WalkDir::new(dir).follow_links(config.follow_symlinks);
        if !config.recursive {
            walker = walker.max_depth(1);
        } else if config.max_depth > 0 {
            walker = walker.max_depth(config.max_depth);
        }

        let mut entries = Vec::new();
        for entry in walker.into_iter() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }
            let Some(kind) = SlideKind::from_path(entry.path()) else {
                continue;
            };
            entries.push(DiscoveredEntry {
                path: entry.path().to_path_buf(),
                kind,
            });
        }

        // Sort by path for consistent ordering
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        debug!("Walk of {:?} yielded {} candidates", dir, entries.len());
        Ok(entries)
    }

    fn build_slide(entry: &DiscoveredEntry, probe: bool) -> Slide {
        let source = entry.path.to_string_lossy().into_owned();
        let mut slide = Slide::new(source.clone(), entry.kind, source);
        if !probe {
            return slide;
        }

        let meta = MetadataExtractor::extract(&entry.path, entry.kind);
        if let Some(size) = meta.natural_size {
            slide = slide.with_natural_size(size.width, size.height);
        }
        if let Some(pages) = meta.page_count {
            slide = slide.with_page_count(pages);
        }
        trace!(path = ?entry.path, kind = %entry.kind, "Probed slide");
        slide
    }
}
