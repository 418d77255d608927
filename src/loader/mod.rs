//! Media loading for the active slide.
//!
//! Only the active slide is loaded. Every request carries a generation; a
//! result is applied only when its generation and slide id still match the
//! active slide, so superseded loads are discarded.

pub mod threaded;

use std::cell::RefCell;

use tracing::trace;

use crate::models::{Size, SlideId, SlideKind};

pub use threaded::ThreadedMediaLoader;

/// Per-slide load status shown to renderers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    /// Inline failure placeholder for this slide only.
    Failed(String),
}

impl LoadState {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub generation: u64,
    pub slide_id: SlideId,
    pub kind: SlideKind,
    /// Resolved URL of the slide source.
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded {
        natural_size: Option<Size>,
        page_count: Option<u32>,
    },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadResult {
    pub generation: u64,
    pub slide_id: SlideId,
    pub outcome: LoadOutcome,
}

/// Backend that loads the active slide's media.
pub trait MediaLoader {
    fn request(&self, request: LoadRequest);

    /// Results that arrived since the last call.
    fn poll(&self) -> Vec<LoadResult>;
}

/// Loader for hosts that decode media themselves: every request completes
/// immediately without probing.
#[derive(Debug, Default)]
pub struct PassthroughLoader {
    ready: RefCell<Vec<LoadResult>>,
}

impl MediaLoader for PassthroughLoader {
    fn request(&self, request: LoadRequest) {
        trace!(slide_id = %request.slide_id, generation = request.generation, "Passthrough load");
        self.ready.borrow_mut().push(LoadResult {
            generation: request.generation,
            slide_id: request.slide_id,
            outcome: LoadOutcome::Loaded {
                natural_size: None,
                page_count: None,
            },
        });
    }

    fn poll(&self) -> Vec<LoadResult> {
        std::mem::take(&mut *self.ready.borrow_mut())
    }
}
