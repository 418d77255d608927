//! Best-effort warm-up of the slides next to the active one.
//!
//! - `Preloader` - reacts to index changes and tracks request generations
//! - `WorkerPrefetcher` - threaded backend for local sources

pub mod preloader;
pub mod worker;

pub use preloader::{
    adjacent_indices, NoopPrefetcher, PrefetchCompletion, PrefetchOutcome, PrefetchRequest,
    PrefetchToken, Prefetcher, Preloader,
};
pub use worker::WorkerPrefetcher;
