//! Directory enumeration.
//!
//! Listing is intentionally shallow and cheap: no per-file validation
//! happens here, so folder-open latency is proportional to the directory
//! listing alone. Validation arrives later through the thumbnail pipeline.

use std::path::{Path, PathBuf};

use tokio::task;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::entry::ImageEntry;
use crate::error::BrowseError;

/// List the image entries of `dir` (non-recursive), sorted by file name in
/// case-sensitive lexical order.
pub fn list_folder(dir: &Path) -> Result<Vec<ImageEntry>, BrowseError> {
    let mut entries = Vec::new();

    for item in WalkDir::new(dir).max_depth(1).follow_links(false) {
        let item = match item {
            Ok(item) => item,
            Err(e) => {
                // A failure on the root means the listing itself failed.
                if e.path() == Some(dir) {
                    return Err(BrowseError::EnumerationFailure {
                        dir: dir.to_path_buf(),
                        source: e.into(),
                    });
                }
                warn!(error = %e, "Skipping unreadable directory entry");
                continue;
            }
        };

        if item.file_type().is_dir() {
            continue;
        }
        if let Some(entry) = ImageEntry::new(item.into_path()) {
            entries.push(entry);
        }
    }

    entries.sort_by(|a, b| a.file_name().cmp(b.file_name()));
    debug!(count = entries.len(), ?dir, "Enumerated folder");
    Ok(entries)
}

/// Run the listing off the coordinating thread.
pub async fn list_folder_async(dir: PathBuf) -> Result<Vec<ImageEntry>, BrowseError> {
    let task_dir = dir.clone();
    task::spawn_blocking(move || list_folder(&task_dir))
        .await
        .map_err(|e| BrowseError::EnumerationFailure {
            dir,
            source: std::io::Error::other(e),
        })?
}
