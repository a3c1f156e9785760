//! Engine configuration and per-display decode inputs.

/// Default edge length for square thumbnails, in points.
pub const DEFAULT_THUMB_EDGE: u32 = 64;

/// Properties of the active display, queried by the embedder at decode time
/// and passed in as parameters rather than read from globals.
#[derive(Debug, Clone, Copy)]
pub struct DisplayMetrics {
    /// Backing scale factor (2.0 on a typical hidpi display).
    pub scale_factor: f64,
    /// Longest dimension of the display in physical pixels.
    pub max_dimension_px: u32,
}

impl Default for DisplayMetrics {
    fn default() -> Self {
        Self {
            scale_factor: 1.0,
            max_dimension_px: 1920,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Square thumbnail edge in points; multiplied by the display scale
    /// factor for the decoded pixel size. Any positive value is accepted.
    pub thumb_edge: u32,
    /// Worker threads for thumbnail generation.
    pub thumb_workers: usize,
    /// Worker threads for full-view decodes.
    pub decode_workers: usize,
    /// Decode at native resolution (capped) instead of the display-fit
    /// target. Takes precedence over the points-based policy.
    pub full_resolution: bool,
    /// Entry capacity of the in-memory thumbnail cache.
    pub thumb_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            thumb_edge: DEFAULT_THUMB_EDGE,
            thumb_workers: 2,
            decode_workers: 2,
            full_resolution: false,
            thumb_cache_capacity: 4096,
        }
    }
}
