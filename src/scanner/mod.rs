//! Directory scanning for the standalone viewer host.
//!
//! - `FileScanner` - walks a folder and builds a `SlideList`
//! - `MetadataExtractor` - header-only natural size and page count probing

pub mod file_scanner;
pub mod metadata;

pub use file_scanner::{FileScanner, ScanConfig, ScanProgress, ScanResult};
pub use metadata::{MediaMetadata, MetadataExtractor};
