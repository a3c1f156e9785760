//! In-memory thumbnail cache keyed by file path.
//!
//! Keys are the xxhash of the path; values are shared bitmaps. The cache is
//! the sole owner - consumers clone the `Arc` to borrow a bitmap for the
//! duration of a draw or encode call. Absence of an entry means the
//! thumbnail was not generated yet or the file is broken; no placeholder is
//! stored for broken files.

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use image::RgbaImage;
use lru::LruCache;
use parking_lot::RwLock;
use xxhash_rust::xxh3::xxh3_64;

/// Default entry capacity of the LRU layer.
const DEFAULT_CAPACITY: usize = 4096;

fn path_key(path: &Path) -> u64 {
    xxh3_64(path.to_string_lossy().as_bytes())
}

/// Shared thumbnail cache. Cloning shares the same storage.
#[derive(Clone)]
pub struct ThumbnailCache {
    inner: Arc<RwLock<LruCache<u64, Arc<RgbaImage>>>>,
}

impl ThumbnailCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity is at least one");
        Self {
            inner: Arc::new(RwLock::new(LruCache::new(capacity))),
        }
    }

    pub fn insert(&self, path: &Path, thumb: RgbaImage) {
        self.inner.write().put(path_key(path), Arc::new(thumb));
    }

    pub fn get(&self, path: &Path) -> Option<Arc<RgbaImage>> {
        self.inner.write().get(&path_key(path)).cloned()
    }

    /// Presence check that does not touch LRU order.
    pub fn contains(&self, path: &Path) -> bool {
        self.inner.read().peek(&path_key(path)).is_some()
    }

    pub fn remove(&self, path: &Path) -> bool {
        self.inner.write().pop(&path_key(path)).is_some()
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ThumbnailCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn thumb(edge: u32) -> RgbaImage {
        RgbaImage::from_pixel(edge, edge, image::Rgba([1, 2, 3, 255]))
    }

    #[test]
    fn insert_get_remove() {
        let cache = ThumbnailCache::default();
        let path = PathBuf::from("/photos/a.png");

        assert!(cache.get(&path).is_none());
        cache.insert(&path, thumb(64));
        assert!(cache.contains(&path));
        assert_eq!(cache.get(&path).unwrap().width(), 64);

        assert!(cache.remove(&path));
        assert!(!cache.contains(&path));
        assert!(!cache.remove(&path));
    }

    #[test]
    fn clones_share_storage() {
        let cache = ThumbnailCache::default();
        let other = cache.clone();
        let path = PathBuf::from("/photos/b.png");

        cache.insert(&path, thumb(32));
        assert!(other.contains(&path));
        assert_eq!(other.len(), 1);
    }

    #[test]
    fn capacity_bounds_entries() {
        let cache = ThumbnailCache::new(2);
        cache.insert(Path::new("/a"), thumb(8));
        cache.insert(Path::new("/b"), thumb(8));
        cache.insert(Path::new("/c"), thumb(8));

        assert_eq!(cache.len(), 2);
        // Least recently used entry was evicted.
        assert!(!cache.contains(Path::new("/a")));
    }
}
