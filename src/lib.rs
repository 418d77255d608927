//! idxv: a headless media carousel with per-slide zoom.
//!
//! The crate owns the viewer state (active index, zoom/pan per slide,
//! preloading, thumbnail sync, fit geometry) and leaves drawing to the host
//! through per-kind renderers.

pub mod carousel;
pub mod config;
pub mod error;
pub mod layout;
pub mod loader;
pub mod models;
pub mod preload;
pub mod render;
pub mod scanner;
pub mod thumbnails;
pub mod timer;
pub mod ui;
pub mod urls;
pub mod zoom;

pub use carousel::{IndexChange, NavigationCause, NavigationController};
pub use config::ViewerConfig;
pub use error::{Result, ViewerError};
pub use models::{Size, Slide, SlideId, SlideKind, SlideList};
pub use render::{Frame, RendererSet, SlideRenderer, TextRenderer};
pub use ui::{OpenTarget, ViewerShell, ViewerSnapshot};
pub use urls::UrlResolver;
