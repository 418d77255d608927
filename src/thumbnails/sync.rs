use tracing::{debug, trace};

use crate::carousel::{IndexChange, NavigationCause, NavigationController};

/// Where the strip should place the entry it scrolls to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAlign {
    Center,
    Nearest,
}

/// Host-side thumbnail strip. Scrolling is a snap, never animated.
pub trait ThumbnailStrip {
    fn scroll_into_view(&mut self, index: usize, align: ScrollAlign);
}

/// Strip that ignores scroll requests (thumbnails not mounted).
#[derive(Debug, Default)]
pub struct NullStrip;

impl ThumbnailStrip for NullStrip {
    fn scroll_into_view(&mut self, _index: usize, _align: ScrollAlign) {}
}

/// Keeps the strip aligned with the carousel.
///
/// Index changes flow one way into the strip. The only path back is
/// `click`, which routes through `NavigationController::go_to_index`.
pub struct ThumbnailSync {
    enabled: bool,
    strip: Box<dyn ThumbnailStrip>,
    scrolls: u64,
    last_scrolled: Option<usize>,
}

impl std::fmt::Debug for ThumbnailSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThumbnailSync")
            .field("enabled", &self.enabled)
            .field("scrolls", &self.scrolls)
            .field("last_scrolled", &self.last_scrolled)
            .finish()
    }
}

impl ThumbnailSync {
    pub fn new(enabled: bool, strip: Box<dyn ThumbnailStrip>) -> Self {
        Self {
            enabled,
            strip,
            scrolls: 0,
            last_scrolled: None,
        }
    }

    pub fn disabled() -> Self {
        Self::new(false, Box::new(NullStrip))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn scroll_count(&self) -> u64 {
        self.scrolls
    }

    pub fn last_scrolled(&self) -> Option<usize> {
        self.last_scrolled
    }

    /// One scroll per index change.
    pub fn on_index_change(&mut self, change: &IndexChange) {
        if !self.enabled {
            return;
        }
        self.strip.scroll_into_view(change.current, ScrollAlign::Center);
        self.scrolls += 1;
        self.last_scrolled = Some(change.current);
        trace!(index = change.current, "Thumbnail strip scrolled");
    }

    /// Strip entry `k` was clicked.
    pub fn click(&self, navigation: &mut NavigationController, k: usize) -> Option<IndexChange> {
        if !self.enabled {
            return None;
        }
        debug!(index = k, "Thumbnail clicked");
        navigation.go_to_position(k, NavigationCause::Thumbnail)
    }
}
