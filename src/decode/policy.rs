//! Decode resolution policy.
//!
//! The default target balances sharpness against memory: a tuned base size
//! in points, scaled to the display, but never below the display's own pixel
//! dimension. The full-resolution override decodes at the source's native
//! size, capped to bound memory on pathological inputs.

use crate::config::DisplayMetrics;

/// Tuned base size in points for the display-fit decode target.
pub const BASE_POINTS: u32 = 1600;

/// Upper bound on any decode dimension, full-resolution included.
pub const FULL_RES_CAP_PX: u32 = 16_000;

/// Compute the maximum pixel dimension to decode at.
///
/// `native_max` is the source image's longest side, when known; it is only
/// consulted for full-resolution requests. The full-resolution flag takes
/// precedence over the points-based default.
pub fn target_max_dimension(
    display: DisplayMetrics,
    full_resolution: bool,
    native_max: Option<u32>,
) -> u32 {
    if full_resolution {
        return native_max.unwrap_or(FULL_RES_CAP_PX).min(FULL_RES_CAP_PX);
    }

    let scaled = (BASE_POINTS as f64 * display.scale_factor).round() as u32;
    scaled.max(display.max_dimension_px)
}
