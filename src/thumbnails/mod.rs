//! Thumbnail strip synchronization.
//!
//! - `ThumbnailStrip` - host strip that can scroll an entry into view
//! - `ThumbnailSync` - reacts to index changes and forwards clicks

pub mod sync;

pub use sync::{NullStrip, ScrollAlign, ThumbnailStrip, ThumbnailSync};
