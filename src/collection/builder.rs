//! The coordinating handle for a live collection.
//!
//! Whoever owns the `CollectionBuilder` is the coordinating thread: it is
//! the only place collection, cache, and viewport mutations are applied.
//! Worker results (full decodes, thumbnails, broken-file reports) queue up
//! on channels and are applied by [`CollectionBuilder::pump`], which the
//! embedder calls from its main loop. Every open operation bumps a scan
//! generation; results carrying an older generation are discarded.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbaImage;
use tracing::{debug, info, warn};

use super::entry::{ImageEntry, Validity};
use super::enumerate;
use super::list::ImageCollection;
use crate::access::GrantStore;
use crate::config::{DisplayMetrics, EngineConfig};
use crate::decode::{AdaptiveDecoder, DecodeError};
use crate::error::BrowseError;
use crate::events::{BrowseEvent, EventBus};
use crate::platform::FolderChooser;
use crate::thumbnails::{ThumbnailCache, ThumbnailJob, ThumbnailQueue};
use crate::viewport::ViewportTransform;

/// A navigation request: relative steps wrap modulo the collection length.
#[derive(Debug, Clone, Copy)]
pub enum Navigate {
    Delta(i64),
    To(usize),
}

struct CurrentBitmap {
    path: PathBuf,
    pixels: Arc<RgbaImage>,
}

pub struct CollectionBuilder {
    collection: ImageCollection,
    cache: ThumbnailCache,
    thumbs: ThumbnailQueue,
    decoder: AdaptiveDecoder,
    grants: GrantStore,
    config: EngineConfig,
    display: DisplayMetrics,
    events: EventBus,
    viewport: ViewportTransform,
    current_bitmap: Option<CurrentBitmap>,
    /// Path of the most recently requested full decode.
    requested: Option<PathBuf>,
    /// Bumped once per open operation; async results carry it.
    scan_generation: u64,
}

impl CollectionBuilder {
    pub fn new(config: EngineConfig, display: DisplayMetrics, grants: GrantStore) -> Self {
        let cache = ThumbnailCache::new(config.thumb_cache_capacity);
        let thumbs = ThumbnailQueue::new(config.thumb_workers, cache.clone());
        let decoder = AdaptiveDecoder::new(config.decode_workers);

        Self {
            collection: ImageCollection::new(),
            cache,
            thumbs,
            decoder,
            grants,
            config,
            display,
            events: EventBus::new(),
            viewport: ViewportTransform::default(),
            current_bitmap: None,
            requested: None,
            scan_generation: 0,
        }
    }

    pub fn collection(&self) -> &ImageCollection {
        &self.collection
    }

    pub fn thumbnails(&self) -> &ThumbnailCache {
        &self.cache
    }

    pub fn grants(&self) -> &GrantStore {
        &self.grants
    }

    pub fn viewport(&self) -> &ViewportTransform {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut ViewportTransform {
        &mut self.viewport
    }

    pub fn current_entry(&self) -> Option<&ImageEntry> {
        self.collection.current()
    }

    /// The decoded bitmap for the displayed image, with the path it belongs
    /// to. During navigation this may briefly lag the selection until the
    /// new decode lands.
    pub fn current_image(&self) -> Option<(&Path, &RgbaImage)> {
        self.current_bitmap
            .as_ref()
            .map(|c| (c.path.as_path(), c.pixels.as_ref()))
    }

    /// Whether thumbnail work is still in flight.
    pub fn is_busy(&self) -> bool {
        self.thumbs.is_busy()
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> async_channel::Receiver<BrowseEvent> {
        self.events.subscribe()
    }

    /// Open a single file: it becomes the collection and starts decoding
    /// immediately, then the containing folder is enumerated behind it -
    /// via an existing grant when possible, otherwise through the chooser.
    /// On denial or enumeration failure the single-entry collection stands.
    pub async fn open_file(
        &mut self,
        path: &Path,
        chooser: &dyn FolderChooser,
    ) -> Result<(), BrowseError> {
        let entry = ImageEntry::new(path.to_path_buf()).ok_or_else(|| BrowseError::Unreadable {
            path: path.to_path_buf(),
        })?;
        info!(?path, "Opening file");

        self.scan_generation += 1;
        self.thumbs.cancel_pending();
        self.publish(vec![entry], 0);

        let Some(parent) = path.parent().map(Path::to_path_buf) else {
            return Ok(());
        };

        if !self.grants.is_granted(&parent) && self.grants.resolve(&parent).is_none() {
            match chooser.choose_folder(Some(&parent), "Grant access to browse this folder") {
                Some(folder) => {
                    if !self.grants.grant_minted(&folder) || !self.grants.is_granted(&parent) {
                        debug!(?parent, "Grant does not cover parent; keeping single image");
                        return Ok(());
                    }
                }
                None => {
                    debug!(?parent, "Folder access declined; keeping single image");
                    return Ok(());
                }
            }
        }

        match enumerate::list_folder_async(parent.clone()).await {
            Ok(entries) if !entries.is_empty() => {
                let index = entries.iter().position(|e| e.path == *path).unwrap_or(0);
                self.publish(entries, index);
            }
            Ok(_) => {}
            Err(e) => {
                warn!(?parent, error = %e, "Enumeration failed; keeping single image");
                self.events.emit(BrowseEvent::OperationFailed {
                    message: e.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Open a folder: the listing is published immediately (no per-file
    /// validation) and thumbnails stream in behind it.
    pub async fn open_folder(&mut self, dir: &Path) -> Result<(), BrowseError> {
        info!(?dir, "Opening folder");
        self.scan_generation += 1;
        self.thumbs.cancel_pending();

        match enumerate::list_folder_async(dir.to_path_buf()).await {
            Ok(entries) => {
                self.publish(entries, 0);
                Ok(())
            }
            Err(e) => {
                self.publish(Vec::new(), 0);
                self.events.emit(BrowseEvent::OperationFailed {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Move the selection, wrapping in both directions, and start a fresh
    /// decode plus viewport reset.
    pub fn navigate(&mut self, nav: Navigate) {
        let moved = match nav {
            Navigate::Delta(delta) => self.collection.navigate_delta(delta),
            Navigate::To(index) => self.collection.navigate_to(index),
        };
        if moved.is_some() {
            self.select(true);
        }
    }

    /// Apply completed async work: full decodes (stale ones discarded),
    /// thumbnail completions, and broken-file eviction as one synchronized
    /// step. Returns true when anything changed.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;

        for reply in self.decoder.drain() {
            if reply.generation != self.decoder.latest_generation() {
                debug!(path = ?reply.path, "Discarding stale decode");
                continue;
            }
            match reply.result {
                Ok(pixels) => {
                    let is_current = self
                        .collection
                        .current()
                        .map(|e| e.path == reply.path)
                        .unwrap_or(false);
                    if is_current {
                        if let Some(index) = self.collection.position_of(&reply.path) {
                            self.collection.set_validity(index, Validity::Valid);
                        }
                        self.current_bitmap = Some(CurrentBitmap {
                            path: reply.path.clone(),
                            pixels: Arc::new(pixels),
                        });
                        self.events.emit(BrowseEvent::ImageLoaded { path: reply.path });
                        changed = true;
                    }
                }
                Err(DecodeError::Unreadable(path)) => {
                    if self.collection.position_of(&path).is_some() {
                        self.evict_broken(vec![path]);
                        changed = true;
                    }
                }
            }
        }

        for outcome in self.thumbs.poll() {
            if !outcome.ok {
                continue; // handled through the broken accumulator
            }
            match self.collection.position_of(&outcome.path) {
                Some(index) => {
                    self.collection.set_validity(index, Validity::Valid);
                    self.events.emit(BrowseEvent::ThumbnailReady {
                        path: outcome.path,
                    });
                    changed = true;
                }
                None => {
                    // Completed after its entry left the collection.
                    self.cache.remove(&outcome.path);
                }
            }
        }

        let broken: Vec<PathBuf> = self
            .thumbs
            .take_broken()
            .into_iter()
            .filter(|(path, generation)| {
                *generation == self.scan_generation && self.collection.position_of(path).is_some()
            })
            .map(|(path, _)| path)
            .collect();
        if !broken.is_empty() {
            self.evict_broken(broken);
            changed = true;
        }

        changed
    }

    /// Decode at native resolution (capped) instead of the display-fit
    /// target. Toggling re-decodes the current image.
    pub fn set_full_resolution(&mut self, full_resolution: bool) {
        if self.config.full_resolution != full_resolution {
            self.config.full_resolution = full_resolution;
            self.reload_current();
        }
    }

    pub fn full_resolution(&self) -> bool {
        self.config.full_resolution
    }

    /// Re-request the full decode of the current entry without touching the
    /// viewport or selection.
    pub(crate) fn reload_current(&mut self) {
        if let Some(entry) = self.collection.current() {
            let path = entry.path.clone();
            self.requested = Some(path.clone());
            self.decoder
                .begin(path, self.config.full_resolution, self.display);
        }
    }

    /// Drop and regenerate the cached thumbnail for one entry.
    pub fn refresh_thumbnail(&mut self, path: &Path) {
        self.cache.remove(path);
        self.thumbs.submit(ThumbnailJob {
            path: path.to_path_buf(),
            edge_px: self.thumb_edge_px(),
            generation: self.scan_generation,
        });
    }

    /// Remove the current entry after a successful trash, fix the cursor,
    /// and select whatever took its place. Returns the new index.
    pub(crate) fn remove_current_deleted(&mut self) -> Option<usize> {
        let entry = self.collection.current().cloned()?;
        self.cache.remove(&entry.path);
        if self
            .current_bitmap
            .as_ref()
            .map(|c| c.path == entry.path)
            .unwrap_or(false)
        {
            self.current_bitmap = None;
        }

        let new_index = self.collection.remove_current();
        self.events.emit(BrowseEvent::EntriesEvicted {
            paths: vec![entry.path],
        });
        self.select(true);
        new_index
    }

    pub(crate) fn emit_error(&self, message: String) {
        self.events.emit(BrowseEvent::OperationFailed { message });
    }

    /// Replace the collection and submit thumbnail jobs for every entry.
    /// An in-flight decode for the newly selected path is left running.
    fn publish(&mut self, entries: Vec<ImageEntry>, index: usize) {
        let edge_px = self.thumb_edge_px();
        let jobs: Vec<ThumbnailJob> = entries
            .iter()
            .map(|e| ThumbnailJob {
                path: e.path.clone(),
                edge_px,
                generation: self.scan_generation,
            })
            .collect();

        self.collection = ImageCollection::from_entries(entries);
        if index > 0 {
            self.collection.navigate_to(index);
        }
        self.events.emit(BrowseEvent::CollectionReplaced {
            len: self.collection.len(),
        });

        match self.collection.current().map(|e| e.path.clone()) {
            Some(path) if Some(&path) == self.requested.as_ref() => {
                // Same image, new surroundings: keep the decode in flight.
                self.events.emit(BrowseEvent::SelectionChanged {
                    index: self.collection.current_index(),
                    path,
                });
            }
            _ => self.select(true),
        }

        self.thumbs.submit_all(jobs);
    }

    /// Apply a selection: reset the viewport, request the decode, notify.
    fn select(&mut self, reset_viewport: bool) {
        match self.collection.current() {
            Some(entry) => {
                let path = entry.path.clone();
                if reset_viewport {
                    self.viewport.reset();
                }
                self.requested = Some(path.clone());
                self.decoder
                    .begin(path.clone(), self.config.full_resolution, self.display);
                self.events.emit(BrowseEvent::SelectionChanged {
                    index: self.collection.current_index(),
                    path,
                });
            }
            None => {
                self.current_bitmap = None;
                self.requested = None;
                self.viewport.reset();
                self.events.emit(BrowseEvent::SelectionCleared);
            }
        }
    }

    /// Evict broken entries in one step, adjusting the cursor, and reselect
    /// if the eviction moved the selection.
    fn evict_broken(&mut self, paths: Vec<PathBuf>) {
        let selected_before = self.collection.current().map(|e| e.path.clone());

        let removed = self.collection.remove_paths(&paths);
        if removed == 0 {
            return;
        }
        warn!(count = removed, "Evicting unreadable entries");

        for path in &paths {
            self.cache.remove(path);
        }
        if let Some(current) = &self.current_bitmap {
            if paths.contains(&current.path) {
                self.current_bitmap = None;
            }
        }
        self.events.emit(BrowseEvent::EntriesEvicted { paths });

        let selected_after = self.collection.current().map(|e| e.path.clone());
        if selected_after != selected_before {
            self.select(true);
        }
    }

    fn thumb_edge_px(&self) -> u32 {
        ((self.config.thumb_edge as f64 * self.display.scale_factor).round() as u32).max(1)
    }
}
