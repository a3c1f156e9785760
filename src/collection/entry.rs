//! One file tracked by a collection.

use std::ffi::OsStr;
use std::path::PathBuf;

/// Extensions the engine will attempt to browse (case-insensitive).
pub const SUPPORTED_EXTENSIONS: [&str; 9] = [
    "jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "heic", "webp",
];

pub fn is_supported_extension(ext: &str) -> bool {
    SUPPORTED_EXTENSIONS
        .iter()
        .any(|s| s.eq_ignore_ascii_case(ext))
}

/// Decode validity of an entry. Transitions from `Unknown` exactly once,
/// asynchronously, when a thumbnail or full decode completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Unknown,
    Valid,
    Broken,
}

#[derive(Debug, Clone)]
pub struct ImageEntry {
    pub path: PathBuf,
    /// Lowercased extension, always in the supported set.
    pub extension: String,
    pub validity: Validity,
}

impl ImageEntry {
    /// Create an entry for `path`, or `None` when the extension is not a
    /// supported image type.
    pub fn new(path: PathBuf) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        if !is_supported_extension(&extension) {
            return None;
        }
        Some(Self {
            path,
            extension,
            validity: Validity::Unknown,
        })
    }

    pub fn file_name(&self) -> &OsStr {
        self.path.file_name().unwrap_or(self.path.as_os_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_supported_extensions_case_insensitively() {
        for name in ["a.jpg", "b.JPEG", "c.Png", "d.HEIC", "e.webp", "f.TIF"] {
            let entry = ImageEntry::new(PathBuf::from(name)).unwrap();
            assert_eq!(entry.validity, Validity::Unknown);
            assert!(entry.extension.chars().all(|c| c.is_ascii_lowercase()));
        }
    }

    #[test]
    fn rejects_unsupported_or_missing_extensions() {
        assert!(ImageEntry::new(PathBuf::from("notes.txt")).is_none());
        assert!(ImageEntry::new(PathBuf::from("archive.tar.gz")).is_none());
        assert!(ImageEntry::new(PathBuf::from("no_extension")).is_none());
    }
}
