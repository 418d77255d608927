//! Viewer shell and its host seams.
//!
//! - `viewer` - open/close lifecycle, input routing and index fan-out
//! - `keybindings` - host-neutral keys mapped to viewer actions
//! - `focus` - focus cycling over the shell controls
//! - `download` / `fullscreen` - actions delegated to the host

pub mod download;
pub mod focus;
pub mod fullscreen;
pub mod keybindings;
pub mod viewer;

pub use download::{DownloadHandler, DownloadRequest, SaveToDirectory};
pub use focus::{Control, FocusRing};
pub use fullscreen::{FullscreenHost, UnsupportedFullscreen};
pub use keybindings::{Key, KeyMap, ViewerAction};
pub use viewer::{
    KeyOutcome, OpenTarget, SwipeDirection, TickReport, ViewerShell, ViewerShellBuilder,
    ViewerSnapshot,
};
