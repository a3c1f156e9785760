//! External collaborator interfaces.
//!
//! The engine treats file/folder choosers, confirmation dialogs, and the
//! trash facility as opaque platform services. Embedders implement these
//! traits with their toolkit of choice; tests use stubs.

use std::path::{Path, PathBuf};

use crate::error::BrowseError;

/// Native file-open dialog.
pub trait FileChooser {
    /// Present a chooser filtered to the given lowercase extensions.
    /// `None` means the user cancelled.
    fn choose_file(&self, extensions: &[&str]) -> Option<PathBuf>;
}

/// Native folder-open dialog, used both for browsing and for obtaining
/// folder-scoped access grants.
pub trait FolderChooser {
    /// Present a chooser starting at `initial` with an explanatory message.
    /// `None` means the user declined.
    fn choose_folder(&self, initial: Option<&Path>, message: &str) -> Option<PathBuf>;
}

/// Destructive-action confirmation dialog.
pub trait DeleteConfirmer {
    fn confirm_delete(&self, path: &Path) -> bool;
}

/// Trash/recycle facility.
pub trait TrashFacility {
    fn trash(&self, path: &Path) -> Result<(), BrowseError>;
}

/// The operating system trash.
pub struct SystemTrash;

impl TrashFacility for SystemTrash {
    fn trash(&self, path: &Path) -> Result<(), BrowseError> {
        trash::delete(path).map_err(|e| BrowseError::IoFailure {
            path: path.to_path_buf(),
            source: std::io::Error::other(e),
        })
    }
}
