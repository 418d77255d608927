//! Adjacent-slide preloading.
//!
//! On every index change the preloader asks its `Prefetcher` backend to warm
//! the resources of the immediate neighbours. Only fetch warm-up happens
//! here; nothing is decoded for inactive slides.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::carousel::IndexChange;
use crate::models::{SlideId, SlideKind, SlideList};
use crate::urls::UrlResolver;

/// Identifies the index change a prefetch belongs to. Completions carrying
/// an older generation are stale.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrefetchToken {
    pub generation: u64,
    pub slide_id: SlideId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchRequest {
    pub token: PrefetchToken,
    pub index: usize,
    pub kind: SlideKind,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefetchOutcome {
    Warmed,
    /// Backend already had the resource warm or in flight.
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchCompletion {
    pub token: PrefetchToken,
    pub outcome: PrefetchOutcome,
}

/// Backend that performs the actual warm-up. Fire-and-forget.
pub trait Prefetcher {
    fn prefetch(&self, request: PrefetchRequest);

    /// Completions gathered since the last call.
    fn completed(&self) -> Vec<PrefetchCompletion> {
        Vec::new()
    }
}

/// Backend that does nothing; used when preloading is off.
#[derive(Debug, Default)]
pub struct NoopPrefetcher;

impl Prefetcher for NoopPrefetcher {
    fn prefetch(&self, request: PrefetchRequest) {
        trace!(url = %request.url, "Prefetch ignored");
    }
}

/// Neighbour indices of `index`: wrapped when looping, dropped across a
/// non-looping boundary, never the index itself and never twice.
pub fn adjacent_indices(index: usize, len: usize, loop_navigation: bool) -> Vec<usize> {
    let mut out = Vec::with_capacity(2);
    if len == 0 || index >= len {
        return out;
    }
    for delta in [-1isize, 1] {
        let target = index as isize + delta;
        let resolved = if loop_navigation {
            target.rem_euclid(len as isize) as usize
        } else if target < 0 || target >= len as isize {
            continue;
        } else {
            target as usize
        };
        if resolved != index && !out.contains(&resolved) {
            out.push(resolved);
        }
    }
    out
}

pub struct Preloader {
    enabled: bool,
    generation: u64,
    backend: Box<dyn Prefetcher>,
    warmed: HashSet<SlideId>,
    failed: u64,
    stale: u64,
}

impl std::fmt::Debug for Preloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preloader")
            .field("enabled", &self.enabled)
            .field("generation", &self.generation)
            .field("warmed", &self.warmed.len())
            .finish()
    }
}

impl Preloader {
    pub fn new(enabled: bool, backend: Box<dyn Prefetcher>) -> Self {
        Self {
            enabled,
            generation: 0,
            backend,
            warmed: HashSet::new(),
            failed: 0,
            stale: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_warmed(&self, id: &SlideId) -> bool {
        self.warmed.contains(id)
    }

    pub fn failed_count(&self) -> u64 {
        self.failed
    }

    pub fn stale_count(&self) -> u64 {
        self.stale
    }

    /// Requests warm-up of the neighbours of the new index. Returns the
    /// indices that were requested.
    pub fn on_index_change(
        &mut self,
        change: &IndexChange,
        slides: &SlideList,
        loop_navigation: bool,
        resolver: &UrlResolver,
    ) -> Vec<usize> {
        self.prefetch_around(change.current, slides, loop_navigation, resolver)
    }

    /// Starts a new generation and requests the neighbours of `index`.
    pub fn prefetch_around(
        &mut self,
        index: usize,
        slides: &SlideList,
        loop_navigation: bool,
        resolver: &UrlResolver,
    ) -> Vec<usize> {
        if !self.enabled {
            return Vec::new();
        }
        self.generation += 1;

        let targets = adjacent_indices(index, slides.len(), loop_navigation);
        for &index in &targets {
            let Some(slide) = slides.get(index) else {
                continue;
            };
            let request = PrefetchRequest {
                token: PrefetchToken {
                    generation: self.generation,
                    slide_id: slide.id.clone(),
                },
                index,
                kind: slide.kind,
                url: resolver.url(&slide.source),
            };
            trace!(index, slide_id = %slide.id, generation = self.generation, "Prefetching neighbour");
            self.backend.prefetch(request);
        }
        targets
    }

    /// Drops everything in flight, e.g. when the list is replaced or the
    /// viewer closes.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.warmed.clear();
    }

    /// Applies backend completions. Stale ones are discarded and failures are
    /// swallowed. Returns how many completions were applied.
    pub fn drain_completions(&mut self) -> usize {
        let mut applied = 0;
        for completion in self.backend.completed() {
            if completion.token.generation != self.generation {
                self.stale += 1;
                trace!(
                    slide_id = %completion.token.slide_id,
                    generation = completion.token.generation,
                    current = self.generation,
                    "Discarding stale prefetch completion"
                );
                continue;
            }
            match completion.outcome {
                PrefetchOutcome::Warmed | PrefetchOutcome::Skipped => {
                    self.warmed.insert(completion.token.slide_id);
                }
                PrefetchOutcome::Failed(reason) => {
                    self.failed += 1;
                    debug!(slide_id = %completion.token.slide_id, %reason, "Prefetch failed");
                }
            }
            applied += 1;
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carousel::{NavigationCause, NavigationController};
    use crate::models::Slide;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default, Clone)]
    struct Recording {
        requests: Rc<RefCell<Vec<PrefetchRequest>>>,
        completions: Rc<RefCell<Vec<PrefetchCompletion>>>,
    }

    impl Prefetcher for Recording {
        fn prefetch(&self, request: PrefetchRequest) {
            self.requests.borrow_mut().push(request);
        }

        fn completed(&self) -> Vec<PrefetchCompletion> {
            std::mem::take(&mut *self.completions.borrow_mut())
        }
    }

    fn slides(n: usize) -> SlideList {
        SlideList::new(
            (0..n)
                .map(|i| Slide::image(format!("s{i}"), format!("s{i}.png")))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_adjacent_indices() {
        assert_eq!(adjacent_indices(0, 3, false), vec![1]);
        assert_eq!(adjacent_indices(2, 3, false), vec![1]);
        assert_eq!(adjacent_indices(1, 3, false), vec![0, 2]);
        assert_eq!(adjacent_indices(0, 3, true), vec![2, 1]);
        assert_eq!(adjacent_indices(0, 2, true), vec![1]);
        assert_eq!(adjacent_indices(0, 1, true), Vec::<usize>::new());
        assert_eq!(adjacent_indices(0, 0, false), Vec::<usize>::new());
    }

    #[test]
    fn test_requests_neighbours_with_resolved_urls() {
        let backend = Recording::default();
        let mut preloader = Preloader::new(true, Box::new(backend.clone()));
        let list = slides(5);
        let mut nav = NavigationController::new(list.clone(), false);
        let change = nav.go_to_index(2, NavigationCause::Button).unwrap();
        let resolver = UrlResolver::new(|p| format!("/media/{p}"));

        let requested = preloader.on_index_change(&change, &list, false, &resolver);
        assert_eq!(requested, vec![1, 3]);
        let requests = backend.requests.borrow();
        assert_eq!(requests[0].url, "/media/s1.png");
        assert_eq!(requests[1].token.slide_id.as_str(), "s3");
        assert!(requests.iter().all(|r| r.token.generation == 1));
    }

    #[test]
    fn test_disabled_is_noop() {
        let backend = Recording::default();
        let mut preloader = Preloader::new(false, Box::new(backend.clone()));
        let list = slides(3);
        let mut nav = NavigationController::new(list.clone(), false);
        let change = nav.go_to_index(1, NavigationCause::Button).unwrap();
        assert!(preloader
            .on_index_change(&change, &list, false, &UrlResolver::default())
            .is_empty());
        assert!(backend.requests.borrow().is_empty());
    }

    #[test]
    fn test_stale_completions_discarded_and_failures_swallowed() {
        let backend = Recording::default();
        let mut preloader = Preloader::new(true, Box::new(backend.clone()));
        let list = slides(4);
        let mut nav = NavigationController::new(list.clone(), false);
        let resolver = UrlResolver::default();

        let first = nav.go_to_index(1, NavigationCause::Button).unwrap();
        preloader.on_index_change(&first, &list, false, &resolver);
        let second = nav.go_to_index(2, NavigationCause::Button).unwrap();
        preloader.on_index_change(&second, &list, false, &resolver);

        backend.completions.borrow_mut().extend([
            PrefetchCompletion {
                token: PrefetchToken {
                    generation: 1,
                    slide_id: "s0".into(),
                },
                outcome: PrefetchOutcome::Warmed,
            },
            PrefetchCompletion {
                token: PrefetchToken {
                    generation: 2,
                    slide_id: "s3".into(),
                },
                outcome: PrefetchOutcome::Failed("404".into()),
            },
            PrefetchCompletion {
                token: PrefetchToken {
                    generation: 2,
                    slide_id: "s1".into(),
                },
                outcome: PrefetchOutcome::Warmed,
            },
        ]);

        assert_eq!(preloader.drain_completions(), 2);
        assert_eq!(preloader.stale_count(), 1);
        assert_eq!(preloader.failed_count(), 1);
        assert!(!preloader.is_warmed(&"s0".into()));
        assert!(preloader.is_warmed(&"s1".into()));

        preloader.invalidate();
        assert!(!preloader.is_warmed(&"s1".into()));
    }
}
