//! The ordered collection and its cursor.
//!
//! Invariant: `0 <= current < len` whenever the collection is non-empty,
//! and `current == 0` when it is empty. Every mutation below preserves it;
//! nothing else in the crate mutates the list directly.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::entry::{ImageEntry, Validity};

#[derive(Debug, Default)]
pub struct ImageCollection {
    entries: Vec<ImageEntry>,
    current: usize,
}

impl ImageCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from entries, sorting by file name.
    pub fn from_entries(mut entries: Vec<ImageEntry>) -> Self {
        entries.sort_by(|a, b| a.file_name().cmp(b.file_name()));
        Self {
            entries,
            current: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ImageEntry] {
        &self.entries
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> Option<&ImageEntry> {
        self.entries.get(self.current)
    }

    pub fn position_of(&self, path: &Path) -> Option<usize> {
        self.entries.iter().position(|e| e.path == *path)
    }

    pub fn set_validity(&mut self, index: usize, validity: Validity) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.validity = validity;
        }
    }

    /// Move the cursor by `delta`, wrapping modulo the length in both
    /// directions. Returns the new index, or `None` when empty.
    pub fn navigate_delta(&mut self, delta: i64) -> Option<usize> {
        let n = self.entries.len();
        if n == 0 {
            return None;
        }
        self.current = (self.current as i64 + delta).rem_euclid(n as i64) as usize;
        Some(self.current)
    }

    /// Move the cursor to an absolute index. Out-of-range is a no-op.
    pub fn navigate_to(&mut self, index: usize) -> Option<usize> {
        if index >= self.entries.len() {
            return None;
        }
        self.current = index;
        Some(index)
    }

    /// Remove every entry whose path is in `paths`, adjusting the cursor:
    /// each removal at a position `<=` the cursor decrements it by one,
    /// floored at zero. Returns how many entries were removed.
    pub fn remove_paths(&mut self, paths: &[PathBuf]) -> usize {
        let doomed: HashSet<&PathBuf> = paths.iter().collect();
        let mut removed = 0;
        let mut i = 0;
        while i < self.entries.len() {
            if doomed.contains(&self.entries[i].path) {
                self.entries.remove(i);
                removed += 1;
                if i <= self.current && self.current > 0 {
                    self.current -= 1;
                }
            } else {
                i += 1;
            }
        }

        if self.entries.is_empty() {
            self.current = 0;
        } else if self.current >= self.entries.len() {
            self.current = self.entries.len() - 1;
        }
        removed
    }

    /// Remove the current entry (after a delete), leaving the cursor at the
    /// same index - now pointing at the following entry - or at the last
    /// valid index when the removed entry was last. Returns the new index,
    /// or `None` when the collection became empty.
    pub fn remove_current(&mut self) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }
        let index = self.current;
        self.entries.remove(index);

        if self.entries.is_empty() {
            self.current = 0;
            return None;
        }
        self.current = index.min(self.entries.len() - 1);
        Some(self.current)
    }
}
