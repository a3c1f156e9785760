//! Viewport transform state: zoom, pan, rotation.
//!
//! Pure math, no rendering. The anchored-zoom solve keeps whichever screen
//! point the user is zooming at pinned to the same image coordinate across
//! the scale change, so the pixel under the pointer never jumps. State is
//! transient: it is rebuilt from nothing every time a new image is selected.

use std::ops::{Add, Div, Mul, Sub};

/// Zoom step applied by a single wheel/keyboard zoom.
pub const ZOOM_STEP: f64 = 0.2;
/// Minimum zoom scale allowed.
pub const MIN_ZOOM: f64 = 0.1;
/// Maximum zoom scale allowed.
pub const MAX_ZOOM: f64 = 10.0;

/// A 2D point or offset in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Vec2 {
    type Output = Vec2;
    fn div(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x / rhs, self.y / rhs)
    }
}

/// Zoom/pan/rotation state for the displayed image.
#[derive(Debug, Clone, Copy)]
pub struct ViewportTransform {
    scale: f64,
    offset: Vec2,
    /// Multiple of 90, unbounded accumulation; normalized only at save.
    rotation_degrees: i32,
    /// Offset captured at drag start; pan deltas are relative to it so
    /// per-event rounding never compounds.
    drag_origin: Option<Vec2>,
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: Vec2::ZERO,
            rotation_degrees: 0,
            drag_origin: None,
        }
    }
}

impl ViewportTransform {
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn rotation_degrees(&self) -> i32 {
        self.rotation_degrees
    }

    /// Accumulated rotation reduced to [0, 360).
    pub fn normalized_rotation(&self) -> u32 {
        self.rotation_degrees.rem_euclid(360) as u32
    }

    /// Step zoom in. With an anchor the anchored solve applies; without,
    /// the offset scales so the visual center stays put.
    pub fn zoom_in(&mut self, anchor: Option<Vec2>, view: Option<Vec2>) {
        self.apply_scale(self.scale + ZOOM_STEP, anchor, view);
    }

    /// Step zoom out. Crossing at or below 1.0 snaps scale and offset to
    /// the reset pose: below 100% the image already fits the viewport and
    /// a sub-1.0 scale with a pan is meaningless.
    pub fn zoom_out(&mut self, anchor: Option<Vec2>, view: Option<Vec2>) {
        let target = self.scale - ZOOM_STEP;
        if target <= 1.0 {
            self.snap_to_fit();
        } else {
            self.apply_scale(target, anchor, view);
        }
    }

    /// Set the zoom directly (continuous pinch). Same clamp and anchor
    /// logic as the stepped variants.
    pub fn set_zoom(&mut self, scale: f64, anchor: Option<Vec2>, view: Option<Vec2>) {
        self.apply_scale(scale, anchor, view);
    }

    /// Double-click zoom: double the current scale, anchored at the
    /// pointer.
    pub fn double_click_zoom(&mut self, pointer: Vec2, view: Vec2) {
        self.apply_scale(self.scale * 2.0, Some(pointer), Some(view));
    }

    /// Capture the gesture-start offset for a pan drag.
    pub fn begin_pan(&mut self) {
        self.drag_origin = Some(self.offset);
    }

    /// Apply a drag delta relative to the gesture-start offset. Only
    /// effective above 100% - at or below, the image fits and there is
    /// nothing to pan.
    pub fn pan_to(&mut self, delta: Vec2) {
        if self.scale <= 1.0 {
            return;
        }
        if let Some(origin) = self.drag_origin {
            self.offset = origin + delta;
        }
    }

    pub fn end_pan(&mut self) {
        self.drag_origin = None;
    }

    pub fn rotate_left(&mut self) {
        self.rotation_degrees -= 90;
    }

    pub fn rotate_right(&mut self) {
        self.rotation_degrees += 90;
    }

    /// Forget accumulated rotation (after a successful rotate-and-save).
    pub fn clear_rotation(&mut self) {
        self.rotation_degrees = 0;
    }

    /// Return to the identity pose. Invoked on every image change.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Scale 1.0 and zero offset; rotation survives so a zoom gesture
    /// never discards a pending rotate-and-save.
    fn snap_to_fit(&mut self) {
        self.scale = 1.0;
        self.offset = Vec2::ZERO;
        self.drag_origin = None;
    }

    fn apply_scale(&mut self, scale: f64, anchor: Option<Vec2>, view: Option<Vec2>) {
        let old_scale = self.scale;
        let new_scale = scale.clamp(MIN_ZOOM, MAX_ZOOM);
        if (new_scale - old_scale).abs() < f64::EPSILON {
            return;
        }

        match (anchor, view) {
            (Some(anchor), Some(view)) => {
                // Image-space point under the anchor at the old scale...
                let center = view / 2.0;
                let image_coord = (anchor - center - self.offset) / old_scale;
                // ...stays under the anchor at the new scale.
                self.offset = anchor - center - image_coord * new_scale;
            }
            _ => {
                // Keep the current visual center fixed.
                self.offset = self.offset * (new_scale / old_scale);
            }
        }

        self.scale = new_scale;
    }
}
