//! Collection building and coordination.
//!
//! - `entry` - one tracked file with validity state
//! - `enumerate` - directory listing and filtering
//! - `list` - the ordered collection with its cursor invariant
//! - `builder` - the coordinating handle driving decode and thumbnails

pub mod builder;
pub mod entry;
pub mod enumerate;
pub mod list;

pub use builder::{CollectionBuilder, Navigate};
pub use entry::{ImageEntry, Validity, SUPPORTED_EXTENSIONS};
pub use list::ImageCollection;
