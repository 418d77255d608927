//! Active-slide derivation.
//!
//! Nothing here is stored: whether a slide is active is always recomputed
//! from the carousel index and the open flag.

use crate::carousel::navigation::{IndexChange, NavigationController};
use crate::models::SlideId;

/// Which slide lost and which gained the active flag in one index change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationTransition {
    pub deactivated: Option<SlideId>,
    pub activated: SlideId,
}

pub struct ActivationGate;

impl ActivationGate {
    pub fn is_active(slide_index: usize, navigation: &NavigationController, open: bool) -> bool {
        open && navigation.current_index() == Some(slide_index)
    }

    pub fn active_id<'a>(navigation: &'a NavigationController, open: bool) -> Option<&'a SlideId> {
        if !open {
            return None;
        }
        navigation.current_slide().map(|s| &s.id)
    }

    /// `None` when the same slide stays active (e.g. a list replace that only
    /// moved it).
    pub fn transition(change: &IndexChange) -> Option<ActivationTransition> {
        if change.previous_id.as_ref() == Some(&change.current_id) {
            return None;
        }
        Some(ActivationTransition {
            deactivated: change.previous_id.clone(),
            activated: change.current_id.clone(),
        })
    }
}
