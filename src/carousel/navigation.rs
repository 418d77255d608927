//! Carousel index ownership.
//!
//! `NavigationController` is the single clamp authority for the active index.
//! Every input path (buttons, keyboard, swipe, thumbnail click, programmatic)
//! funnels through `go_to_index`, which either wraps (loop) or clamps and
//! reports the resulting `IndexChange`, if any.

use tracing::{debug, trace};

use crate::models::{Slide, SlideId, SlideList};

/// What triggered an index change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationCause {
    Open,
    Button,
    Keyboard,
    Swipe,
    Thumbnail,
    Programmatic,
    Replace,
}

/// Emitted synchronously whenever the active index or the slide under it
/// changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexChange {
    pub previous: Option<usize>,
    pub previous_id: Option<SlideId>,
    pub current: usize,
    pub current_id: SlideId,
    pub cause: NavigationCause,
}

#[derive(Debug, Clone)]
pub struct NavigationController {
    slides: SlideList,
    index: usize,
    loop_navigation: bool,
}

impl NavigationController {
    pub fn new(slides: SlideList, loop_navigation: bool) -> Self {
        Self {
            slides,
            index: 0,
            loop_navigation,
        }
    }

    pub fn slides(&self) -> &SlideList {
        &self.slides
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn loop_navigation(&self) -> bool {
        self.loop_navigation
    }

    pub fn set_loop(&mut self, loop_navigation: bool) {
        self.loop_navigation = loop_navigation;
    }

    /// Current index, `None` for an empty list.
    pub fn current_index(&self) -> Option<usize> {
        if self.slides.is_empty() {
            None
        } else {
            Some(self.index)
        }
    }

    pub fn current_slide(&self) -> Option<&Slide> {
        self.slides.get(self.index)
    }

    pub fn can_go_next(&self) -> bool {
        let len = self.slides.len();
        len > 1 && (self.loop_navigation || self.index + 1 < len)
    }

    pub fn can_go_prev(&self) -> bool {
        let len = self.slides.len();
        len > 1 && (self.loop_navigation || self.index > 0)
    }

    /// Maps any requested target into range: wraps when looping, clamps
    /// otherwise. `None` only for an empty list.
    pub fn resolve_index(&self, target: isize) -> Option<usize> {
        let len = self.slides.len();
        if len == 0 {
            return None;
        }
        let resolved = if self.loop_navigation {
            target.rem_euclid(len as isize)
        } else {
            target.clamp(0, len as isize - 1)
        };
        Some(resolved as usize)
    }

    /// Same as `resolve_index` for a non-negative position of any size.
    pub fn resolve_position(&self, target: usize) -> Option<usize> {
        let len = self.slides.len();
        if len == 0 {
            return None;
        }
        let resolved = if self.loop_navigation {
            target % len
        } else {
            target.min(len - 1)
        };
        Some(resolved)
    }

    pub fn go_to_index(&mut self, target: isize, cause: NavigationCause) -> Option<IndexChange> {
        let resolved = self.resolve_index(target)?;
        self.go_to_resolved(resolved, cause)
    }

    /// Entry point for thumbnail and open targets, which are positions.
    pub fn go_to_position(&mut self, target: usize, cause: NavigationCause) -> Option<IndexChange> {
        let resolved = self.resolve_position(target)?;
        self.go_to_resolved(resolved, cause)
    }

    fn go_to_resolved(&mut self, resolved: usize, cause: NavigationCause) -> Option<IndexChange> {
        if resolved == self.index {
            trace!(resolved, "Navigation target is current index");
            return None;
        }
        let current_id = self.slides.get(resolved)?.id.clone();
        Some(self.move_to(resolved, current_id, cause))
    }

    pub fn go_to_next(&mut self, cause: NavigationCause) -> Option<IndexChange> {
        if !self.can_go_next() {
            return None;
        }
        self.go_to_index(self.index as isize + 1, cause)
    }

    pub fn go_to_prev(&mut self, cause: NavigationCause) -> Option<IndexChange> {
        if !self.can_go_prev() {
            return None;
        }
        self.go_to_index(self.index as isize - 1, cause)
    }

    /// Positions the carousel for a fresh open. Always reports a change
    /// (with no previous slide) so listeners see the initial index.
    pub fn start_at(&mut self, target: usize) -> Option<IndexChange> {
        let resolved = self.resolve_position(target)?;
        self.index = resolved;
        let slide = self.slides.get(resolved)?;
        debug!(index = resolved, slide_id = %slide.id, "Carousel started");
        Some(IndexChange {
            previous: None,
            previous_id: None,
            current: resolved,
            current_id: slide.id.clone(),
            cause: NavigationCause::Open,
        })
    }

    /// Swaps in a new list. The current slide keeps its place if it is still
    /// present; otherwise the old index is clamped into the new range.
    pub fn replace(&mut self, slides: SlideList) -> Option<IndexChange> {
        let previous_id = self.current_slide().map(|s| s.id.clone());
        let previous = self.current_index();

        let next_index = previous_id
            .as_ref()
            .and_then(|id| slides.position(id))
            .or_else(|| slides.last_index().map(|last| self.index.min(last)))
            .unwrap_or(0);

        self.slides = slides;
        self.index = next_index;

        let current = self.slides.get(next_index)?;
        if previous == Some(next_index) && previous_id.as_ref() == Some(&current.id) {
            return None;
        }
        Some(IndexChange {
            previous,
            previous_id,
            current: next_index,
            current_id: current.id.clone(),
            cause: NavigationCause::Replace,
        })
    }

    fn move_to(&mut self, index: usize, current_id: SlideId, cause: NavigationCause) -> IndexChange {
        let previous = self.index;
        let previous_id = self.slides.get(previous).map(|s| s.id.clone());
        self.index = index;
        debug!(from = previous, to = index, ?cause, "Carousel index changed");
        IndexChange {
            previous: Some(previous),
            previous_id,
            current: index,
            current_id,
            cause,
        }
    }
}
