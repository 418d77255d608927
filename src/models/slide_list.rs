use std::collections::HashSet;

use crate::error::{Result, ViewerError};
use crate::models::{Slide, SlideId};

/// Ordered, id-unique sequence of slides. Insertion order is display order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlideList {
    slides: Vec<Slide>,
}

impl SlideList {
    pub fn new(slides: Vec<Slide>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(slides.len());
        for slide in &slides {
            if !seen.insert(&slide.id) {
                return Err(ViewerError::DuplicateSlideId(slide.id.clone()));
            }
        }
        Ok(Self { slides })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Slide> {
        self.slides.get(index)
    }

    pub fn position(&self, id: &SlideId) -> Option<usize> {
        self.slides.iter().position(|s| &s.id == id)
    }

    pub fn contains(&self, id: &SlideId) -> bool {
        self.position(id).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Slide> {
        self.slides.iter()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.slides.len().checked_sub(1)
    }
}

impl<'a> IntoIterator for &'a SlideList {
    type Item = &'a Slide;
    type IntoIter = std::slice::Iter<'a, Slide>;

    fn into_iter(self) -> Self::IntoIter {
        self.slides.iter()
    }
}
