//! Fullscreen delegation to the host platform.

use crate::error::{Result, ViewerError};

/// Host capability to put the shell's root element into fullscreen.
pub trait FullscreenHost {
    fn is_supported(&self) -> bool;
    fn enter(&mut self) -> Result<()>;
    fn exit(&mut self) -> Result<()>;
}

/// Host without fullscreen support.
#[derive(Debug, Default)]
pub struct UnsupportedFullscreen;

impl FullscreenHost for UnsupportedFullscreen {
    fn is_supported(&self) -> bool {
        false
    }

    fn enter(&mut self) -> Result<()> {
        Err(ViewerError::FullscreenUnavailable)
    }

    fn exit(&mut self) -> Result<()> {
        Err(ViewerError::FullscreenUnavailable)
    }
}
