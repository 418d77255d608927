use std::fmt;
use std::path::Path;

/// Caller-assigned identity of a slide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlideId(String);

impl SlideId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SlideId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SlideId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlideKind {
    Image,
    Video,
    Document,
}

impl SlideKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "webp" | "gif" | "bmp" | "tiff" | "tif" => Some(Self::Image),
            "webm" | "mp4" | "mkv" | "avi" | "mov" => Some(Self::Video),
            "pdf" => Some(Self::Document),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Document => "document",
        }
    }
}

impl fmt::Display for SlideKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Width/height pair in layout units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn from_pixels(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            None
        } else {
            Some(Self::new(width as f64, height as f64))
        }
    }

    /// True when either side is zero, negative or not a number.
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn aspect_ratio(&self) -> f64 {
        if self.height <= 0.0 {
            1.0
        } else {
            self.width / self.height
        }
    }
}

/// One media entry as handed over by the caller.
///
/// Slides are immutable once registered. Anything the viewer learns about a
/// slide later (probed size, load failures) lives in the viewer's own state.
#[derive(Debug, Clone, PartialEq)]
pub struct Slide {
    pub id: SlideId,
    pub kind: SlideKind,
    pub natural_size: Option<Size>,
    pub page_count: Option<u32>,
    /// Opaque source reference, turned into a URL by the caller's resolver.
    pub source: String,
}

impl Slide {
    pub fn new(id: impl Into<SlideId>, kind: SlideKind, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            natural_size: None,
            page_count: None,
            source: source.into(),
        }
    }

    pub fn image(id: impl Into<SlideId>, source: impl Into<String>) -> Self {
        Self::new(id, SlideKind::Image, source)
    }

    pub fn video(id: impl Into<SlideId>, source: impl Into<String>) -> Self {
        Self::new(id, SlideKind::Video, source)
    }

    pub fn document(id: impl Into<SlideId>, source: impl Into<String>, pages: u32) -> Self {
        Self::new(id, SlideKind::Document, source).with_page_count(pages)
    }

    pub fn with_natural_size(mut self, width: f64, height: f64) -> Self {
        self.natural_size = Some(Size::new(width, height));
        self
    }

    pub fn with_page_count(mut self, pages: u32) -> Self {
        self.page_count = Some(pages);
        self
    }

    pub fn is_video(&self) -> bool {
        self.kind == SlideKind::Video
    }

    pub fn is_document(&self) -> bool {
        self.kind == SlideKind::Document
    }
}
