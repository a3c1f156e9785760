//! Folder-scoped image browsing engine.
//!
//! Given a directory, `ibex` enumerates candidate image files, validates and
//! decodes them, generates square thumbnails for scrubbing, and maintains a
//! live current-image viewport (zoom/pan/rotate) that updates as the user
//! navigates. Widget rendering, dialogs, and preference storage stay outside;
//! the engine talks to them through the traits in [`platform`].
//!
//! The coordinating thread owns a [`CollectionBuilder`] and calls
//! [`CollectionBuilder::pump`] to apply results arriving from the worker
//! pools. Observers subscribe to [`events::BrowseEvent`] instead of binding
//! to mutable state.

pub mod access;
pub mod collection;
pub mod config;
pub mod decode;
pub mod error;
pub mod events;
pub mod image_loader;
pub mod mutation;
pub mod platform;
pub mod thumbnails;
pub mod viewport;

pub use access::{GrantStore, PathActivator, TokenActivator};
pub use collection::{CollectionBuilder, ImageCollection, ImageEntry, Navigate, Validity};
pub use config::{DisplayMetrics, EngineConfig};
pub use decode::DecodeError;
pub use error::BrowseError;
pub use events::BrowseEvent;
pub use mutation::{DeleteOutcome, MutationEngine, RotateOutcome};
pub use viewport::{Vec2, ViewportTransform};

/// Install a `tracing` subscriber reading `RUST_LOG`, defaulting this crate
/// to `info`. Call once from the embedding application.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ibex=info".parse().expect("static directive parses")),
        )
        .init();
}
