//! Error taxonomy for the browsing engine.
//!
//! Unreadable files are a soft condition: they never surface as an error to
//! the embedder, only as entries disappearing from the collection. Everything
//! else produces one human-readable failure per operation and leaves the
//! in-memory state consistent with the pre-operation state.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrowseError {
    /// The file exists but cannot be decoded as an image.
    #[error("cannot decode {path:?}")]
    Unreadable { path: PathBuf },

    /// Folder access is not granted (or was revoked). Retryable via a new
    /// access prompt, never fatal.
    #[error("access to {folder:?} is not granted")]
    PermissionDenied { folder: PathBuf },

    /// Disk write/delete failure during save or trash.
    #[error("i/o failure on {path:?}")]
    IoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The directory listing itself failed.
    #[error("failed to list {dir:?}")]
    EnumerationFailure {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
