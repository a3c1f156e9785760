//! File mutations: delete to trash, rotate-and-save.
//!
//! Mutations go through the Collection Builder so the index-adjustment
//! invariant stays centralized: the engine never edits the collection
//! directly, it asks the builder to reconcile after the file system change.
//! Failures leave both the file and the in-memory state untouched.

pub mod encode;

use std::path::PathBuf;

use tracing::{debug, info};

use crate::collection::CollectionBuilder;
use crate::error::BrowseError;
use crate::image_loader;
use crate::platform::{DeleteConfirmer, FolderChooser, TrashFacility};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// No current entry, or the user declined the confirmation.
    Cancelled,
    Deleted {
        removed: PathBuf,
        /// Index now selected, `None` when the collection emptied.
        new_index: Option<usize>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateOutcome {
    /// Accumulated rotation normalized to 0 degrees; nothing to do.
    NoOp,
    Saved {
        degrees: u32,
    },
}

/// Operations that mutate the file system while keeping the collection
/// consistent. External collaborators (trash, confirmation dialog, folder
/// chooser for write grants) are injected at construction.
pub struct MutationEngine {
    trash: Box<dyn TrashFacility>,
    confirm: Box<dyn DeleteConfirmer>,
    chooser: Box<dyn FolderChooser>,
}

impl MutationEngine {
    pub fn new(
        trash: Box<dyn TrashFacility>,
        confirm: Box<dyn DeleteConfirmer>,
        chooser: Box<dyn FolderChooser>,
    ) -> Self {
        Self {
            trash,
            confirm,
            chooser,
        }
    }

    /// Move the current entry to the trash after confirmation. On success
    /// the entry leaves the collection and cache and the selection moves to
    /// the following image (or the last valid index, or clears). On failure
    /// the collection is left unchanged.
    pub fn delete_current(
        &self,
        browser: &mut CollectionBuilder,
    ) -> Result<DeleteOutcome, BrowseError> {
        let Some(entry) = browser.current_entry().cloned() else {
            return Ok(DeleteOutcome::Cancelled);
        };
        if !self.confirm.confirm_delete(&entry.path) {
            debug!(path = ?entry.path, "Delete declined");
            return Ok(DeleteOutcome::Cancelled);
        }

        if let Err(e) = self.trash.trash(&entry.path) {
            browser.emit_error(format!("Could not delete {}: {e}", entry.path.display()));
            return Err(e);
        }

        let new_index = browser.remove_current_deleted();
        info!(path = ?entry.path, "Moved to trash");
        Ok(DeleteOutcome::Deleted {
            removed: entry.path,
            new_index,
        })
    }

    /// Physically rotate the current file by the viewport's accumulated
    /// rotation and re-encode it in its original container format. A no-op
    /// when the rotation normalizes to 0. Requires a write grant on the
    /// containing folder, requested through the chooser when absent. On
    /// success the rotation resets, the image reloads, and its thumbnail is
    /// regenerated.
    pub fn rotate_and_save(
        &self,
        browser: &mut CollectionBuilder,
    ) -> Result<RotateOutcome, BrowseError> {
        let degrees = browser.viewport().normalized_rotation();
        if degrees == 0 {
            return Ok(RotateOutcome::NoOp);
        }
        let Some(entry) = browser.current_entry().cloned() else {
            return Ok(RotateOutcome::NoOp);
        };
        let path = entry.path;

        if let Some(parent) = path.parent() {
            if !browser.grants().is_granted(parent) && browser.grants().resolve(parent).is_none() {
                let granted = self
                    .chooser
                    .choose_folder(Some(parent), "Grant write access to save the rotated image")
                    .map(|folder| browser.grants().grant_minted(&folder))
                    .unwrap_or(false);
                if !granted || !browser.grants().is_granted(parent) {
                    browser.emit_error(format!(
                        "No write access to {}",
                        parent.display()
                    ));
                    return Err(BrowseError::PermissionDenied {
                        folder: parent.to_path_buf(),
                    });
                }
            }
        }

        let img = image_loader::open_image(&path).map_err(|e| {
            browser.emit_error(format!("Could not read {}: {e}", path.display()));
            BrowseError::Unreadable { path: path.clone() }
        })?;

        // Pixels are physically rotated; the re-encode writes no
        // orientation tag, so no stale tag can be reapplied.
        let rotated = match degrees {
            90 => img.rotate90(),
            180 => img.rotate180(),
            270 => img.rotate270(),
            _ => return Ok(RotateOutcome::NoOp),
        };

        if let Err(e) = encode::write_in_place(&rotated, &path) {
            browser.emit_error(format!("Could not save {}: {e}", path.display()));
            return Err(e);
        }

        browser.viewport_mut().clear_rotation();
        browser.reload_current();
        browser.refresh_thumbnail(&path);
        info!(?path, degrees, "Rotated and saved");
        Ok(RotateOutcome::Saved { degrees })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{GrantStore, PathActivator};
    use crate::collection::Navigate;
    use crate::config::{DisplayMetrics, EngineConfig};
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::tempdir;

    struct AlwaysConfirm;
    impl DeleteConfirmer for AlwaysConfirm {
        fn confirm_delete(&self, _path: &Path) -> bool {
            true
        }
    }

    struct NeverConfirm;
    impl DeleteConfirmer for NeverConfirm {
        fn confirm_delete(&self, _path: &Path) -> bool {
            false
        }
    }

    struct RemoveTrash;
    impl TrashFacility for RemoveTrash {
        fn trash(&self, path: &Path) -> Result<(), BrowseError> {
            std::fs::remove_file(path).map_err(|source| BrowseError::IoFailure {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    struct FailingTrash;
    impl TrashFacility for FailingTrash {
        fn trash(&self, path: &Path) -> Result<(), BrowseError> {
            Err(BrowseError::IoFailure {
                path: path.to_path_buf(),
                source: std::io::Error::other("trash unavailable"),
            })
        }
    }

    struct DenyChooser;
    impl FolderChooser for DenyChooser {
        fn choose_folder(&self, _initial: Option<&Path>, _message: &str) -> Option<PathBuf> {
            None
        }
    }

    struct GrantParentChooser;
    impl FolderChooser for GrantParentChooser {
        fn choose_folder(&self, initial: Option<&Path>, _message: &str) -> Option<PathBuf> {
            initial.map(Path::to_path_buf)
        }
    }

    fn write_png(path: &Path, w: u32, h: u32) {
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba([120, 140, 160, 255]));
        img.save(path).unwrap();
    }

    fn builder(config_dir: &Path) -> CollectionBuilder {
        let grants = GrantStore::load(config_dir.join("grants.json"), Arc::new(PathActivator));
        CollectionBuilder::new(EngineConfig::default(), DisplayMetrics::default(), grants)
    }

    fn deleting_engine() -> MutationEngine {
        MutationEngine::new(
            Box::new(RemoveTrash),
            Box::new(AlwaysConfirm),
            Box::new(DenyChooser),
        )
    }

    #[tokio::test]
    async fn delete_removes_entry_and_advances_selection() {
        let config = tempdir().unwrap();
        let photos = tempdir().unwrap();
        for name in ["a.png", "b.png", "c.png"] {
            write_png(&photos.path().join(name), 10, 10);
        }

        let mut b = builder(config.path());
        b.open_folder(photos.path()).await.unwrap();
        b.navigate(Navigate::To(1));

        let engine = deleting_engine();
        let outcome = engine.delete_current(&mut b).unwrap();

        assert_eq!(
            outcome,
            DeleteOutcome::Deleted {
                removed: photos.path().join("b.png"),
                new_index: Some(1),
            }
        );
        assert_eq!(b.collection().len(), 2);
        // The cursor now points at the following image.
        assert_eq!(
            b.current_entry().unwrap().file_name().to_string_lossy(),
            "c.png"
        );
        assert!(!photos.path().join("b.png").exists());
    }

    #[tokio::test]
    async fn delete_last_entry_steps_back() {
        let config = tempdir().unwrap();
        let photos = tempdir().unwrap();
        write_png(&photos.path().join("a.png"), 10, 10);
        write_png(&photos.path().join("b.png"), 10, 10);

        let mut b = builder(config.path());
        b.open_folder(photos.path()).await.unwrap();
        b.navigate(Navigate::To(1));

        let outcome = deleting_engine().delete_current(&mut b).unwrap();
        assert_eq!(
            outcome,
            DeleteOutcome::Deleted {
                removed: photos.path().join("b.png"),
                new_index: Some(0),
            }
        );
        assert_eq!(b.collection().current_index(), 0);
    }

    #[tokio::test]
    async fn delete_only_entry_clears_selection() {
        let config = tempdir().unwrap();
        let photos = tempdir().unwrap();
        write_png(&photos.path().join("only.png"), 10, 10);

        let mut b = builder(config.path());
        b.open_folder(photos.path()).await.unwrap();

        let outcome = deleting_engine().delete_current(&mut b).unwrap();
        assert_eq!(
            outcome,
            DeleteOutcome::Deleted {
                removed: photos.path().join("only.png"),
                new_index: None,
            }
        );
        assert!(b.collection().is_empty());
        assert!(b.current_entry().is_none());
        assert!(b.current_image().is_none());
    }

    #[tokio::test]
    async fn declined_confirmation_changes_nothing() {
        let config = tempdir().unwrap();
        let photos = tempdir().unwrap();
        write_png(&photos.path().join("a.png"), 10, 10);

        let mut b = builder(config.path());
        b.open_folder(photos.path()).await.unwrap();

        let engine = MutationEngine::new(
            Box::new(RemoveTrash),
            Box::new(NeverConfirm),
            Box::new(DenyChooser),
        );
        assert_eq!(engine.delete_current(&mut b).unwrap(), DeleteOutcome::Cancelled);
        assert_eq!(b.collection().len(), 1);
        assert!(photos.path().join("a.png").exists());
    }

    #[tokio::test]
    async fn failed_trash_leaves_collection_unchanged() {
        let config = tempdir().unwrap();
        let photos = tempdir().unwrap();
        write_png(&photos.path().join("a.png"), 10, 10);

        let mut b = builder(config.path());
        b.open_folder(photos.path()).await.unwrap();

        let engine = MutationEngine::new(
            Box::new(FailingTrash),
            Box::new(AlwaysConfirm),
            Box::new(DenyChooser),
        );
        let result = engine.delete_current(&mut b);
        assert!(matches!(result, Err(BrowseError::IoFailure { .. })));
        assert_eq!(b.collection().len(), 1);
        assert!(photos.path().join("a.png").exists());
    }

    #[tokio::test]
    async fn rotate_and_save_swaps_dimensions_and_resets() {
        let config = tempdir().unwrap();
        let photos = tempdir().unwrap();
        let path = photos.path().join("a.png");
        write_png(&path, 30, 20);

        let mut b = builder(config.path());
        assert!(b.grants().grant_minted(photos.path()));
        b.open_folder(photos.path()).await.unwrap();

        b.viewport_mut().rotate_right();
        let engine = deleting_engine();
        let outcome = engine.rotate_and_save(&mut b).unwrap();

        assert_eq!(outcome, RotateOutcome::Saved { degrees: 90 });
        assert_eq!(image::image_dimensions(&path).unwrap(), (20, 30));
        assert_eq!(b.viewport().rotation_degrees(), 0);
    }

    #[tokio::test]
    async fn four_right_rotations_round_trip() {
        let config = tempdir().unwrap();
        let photos = tempdir().unwrap();
        let path = photos.path().join("a.png");
        write_png(&path, 30, 20);

        let mut b = builder(config.path());
        assert!(b.grants().grant_minted(photos.path()));
        b.open_folder(photos.path()).await.unwrap();

        let engine = deleting_engine();
        for _ in 0..4 {
            b.viewport_mut().rotate_right();
            let outcome = engine.rotate_and_save(&mut b).unwrap();
            assert_eq!(outcome, RotateOutcome::Saved { degrees: 90 });
            assert_eq!(b.viewport().rotation_degrees(), 0);
        }
        assert_eq!(image::image_dimensions(&path).unwrap(), (30, 20));
    }

    #[tokio::test]
    async fn half_turn_preserves_dimensions() {
        // rotateRight twice -> 180 degrees; saving keeps width x height.
        let config = tempdir().unwrap();
        let photos = tempdir().unwrap();
        let path = photos.path().join("a.png");
        write_png(&path, 30, 20);

        let mut b = builder(config.path());
        assert!(b.grants().grant_minted(photos.path()));
        b.open_folder(photos.path()).await.unwrap();

        b.viewport_mut().rotate_right();
        b.viewport_mut().rotate_right();
        assert_eq!(b.viewport().rotation_degrees(), 180);

        let outcome = deleting_engine().rotate_and_save(&mut b).unwrap();
        assert_eq!(outcome, RotateOutcome::Saved { degrees: 180 });
        assert_eq!(image::image_dimensions(&path).unwrap(), (30, 20));
        assert_eq!(b.viewport().rotation_degrees(), 0);
    }

    #[tokio::test]
    async fn zero_rotation_is_noop() {
        let config = tempdir().unwrap();
        let photos = tempdir().unwrap();
        write_png(&photos.path().join("a.png"), 10, 10);

        let mut b = builder(config.path());
        b.open_folder(photos.path()).await.unwrap();

        // Four rights normalize back to zero without saving.
        for _ in 0..4 {
            b.viewport_mut().rotate_right();
        }
        let outcome = deleting_engine().rotate_and_save(&mut b).unwrap();
        assert_eq!(outcome, RotateOutcome::NoOp);
    }

    #[tokio::test]
    async fn rotate_without_grant_is_permission_denied() {
        let config = tempdir().unwrap();
        let photos = tempdir().unwrap();
        let path = photos.path().join("a.png");
        write_png(&path, 30, 20);

        let mut b = builder(config.path());
        b.open_folder(photos.path()).await.unwrap();
        b.viewport_mut().rotate_right();

        let engine = MutationEngine::new(
            Box::new(RemoveTrash),
            Box::new(AlwaysConfirm),
            Box::new(DenyChooser),
        );
        let result = engine.rotate_and_save(&mut b);
        assert!(matches!(result, Err(BrowseError::PermissionDenied { .. })));
        // Rotation state and file are untouched.
        assert_eq!(b.viewport().rotation_degrees(), 90);
        assert_eq!(image::image_dimensions(&path).unwrap(), (30, 20));
    }

    #[tokio::test]
    async fn rotate_acquires_grant_through_chooser() {
        let config = tempdir().unwrap();
        let photos = tempdir().unwrap();
        let path = photos.path().join("a.png");
        write_png(&path, 30, 20);

        let mut b = builder(config.path());
        b.open_folder(photos.path()).await.unwrap();
        b.viewport_mut().rotate_left();

        let engine = MutationEngine::new(
            Box::new(RemoveTrash),
            Box::new(AlwaysConfirm),
            Box::new(GrantParentChooser),
        );
        let outcome = engine.rotate_and_save(&mut b).unwrap();
        assert_eq!(outcome, RotateOutcome::Saved { degrees: 270 });
        assert_eq!(image::image_dimensions(&path).unwrap(), (20, 30));
        assert!(b.grants().is_granted(photos.path()));
    }
}
