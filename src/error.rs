use thiserror::Error;

use crate::models::SlideId;

/// Errors surfaced by the viewer's host-facing operations.
///
/// Navigation and zoom never fail; they clamp or do nothing instead.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("slide id {0} appears more than once")]
    DuplicateSlideId(SlideId),

    #[error("invalid step table: {0}")]
    InvalidStepTable(String),

    #[error("no slide is active")]
    NoActiveSlide,

    #[error("fullscreen is not available on this host")]
    FullscreenUnavailable,

    #[error("fullscreen request rejected: {0}")]
    FullscreenRejected(String),

    #[error("download of {slide_id} failed: {reason}")]
    Download { slide_id: SlideId, reason: String },

    #[error("loading {slide_id} failed: {reason}")]
    MediaLoad { slide_id: SlideId, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = ViewerError> = std::result::Result<T, E>;
