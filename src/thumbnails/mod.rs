//! Thumbnail pipeline.
//!
//! - `generator` - square center-cropped previews
//! - `cache` - in-memory cache keyed by file path
//! - `queue` - worker pool that fills the cache and reports broken files

pub mod cache;
pub mod generator;
pub mod queue;

pub use cache::ThumbnailCache;
pub use queue::{ThumbnailJob, ThumbnailOutcome, ThumbnailQueue};
