//! Download action for the active slide.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use directories::UserDirs;
use tracing::{debug, info};

use crate::models::{SlideId, SlideKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub slide_id: SlideId,
    pub kind: SlideKind,
    /// Caller's source reference.
    pub source: String,
    /// Resolved URL of the source.
    pub url: String,
}

/// Performs the download. Returns where the file landed when the handler
/// saved it locally.
pub trait DownloadHandler {
    fn download(&self, request: &DownloadRequest) -> Result<Option<PathBuf>>;
}

impl<F> DownloadHandler for F
where
    F: Fn(&DownloadRequest) -> Result<Option<PathBuf>>,
{
    fn download(&self, request: &DownloadRequest) -> Result<Option<PathBuf>> {
        self(request)
    }
}

/// Default handler: copies local sources into a directory.
#[derive(Debug, Clone)]
pub struct SaveToDirectory {
    dir: PathBuf,
}

impl SaveToDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The user's download directory, or the current directory when the
    /// platform has none.
    pub fn user_default() -> Self {
        let dir = UserDirs::new()
            .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        debug!("Default download directory: {:?}", dir);
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadHandler for SaveToDirectory {
    fn download(&self, request: &DownloadRequest) -> Result<Option<PathBuf>> {
        if request.url.starts_with("http://") || request.url.starts_with("https://") {
            bail!("remote source {} needs a download handler", request.url);
        }
        let source = Path::new(request.url.strip_prefix("file://").unwrap_or(&request.url));
        let file_name = source
            .file_name()
            .with_context(|| format!("Source {:?} has no file name", source))?;

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create download directory {:?}", self.dir))?;
        let destination = unique_destination(&self.dir, Path::new(file_name));
        fs::copy(source, &destination)
            .with_context(|| format!("Failed to copy {:?} to {:?}", source, destination))?;

        info!(slide_id = %request.slide_id, "Saved download to {:?}", destination);
        Ok(Some(destination))
    }
}

/// `name.ext`, then `name (1).ext`, `name (2).ext`, ...
fn unique_destination(dir: &Path, file_name: &Path) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }
    let stem = file_name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = file_name.extension().map(|e| e.to_string_lossy().into_owned());

    (1u32..)
        .map(|n| {
            let name = match &ext {
                Some(ext) => format!("{stem} ({n}).{ext}"),
                None => format!("{stem} ({n})"),
            };
            dir.join(name)
        })
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}
