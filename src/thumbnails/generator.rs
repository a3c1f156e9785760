//! Square thumbnail generation.
//!
//! Thumbnails are fixed-size squares: the source is downscaled so its short
//! side matches the target edge, the longer dimension is cropped
//! symmetrically about the center, and the result is fitted to the square
//! canvas. Orientation is already applied by the loader, so thumbnails come
//! out upright.

use std::path::Path;

use anyhow::{bail, Result};
use image::imageops::FilterType;
use image::{GenericImageView, RgbaImage};

use crate::image_loader;

/// Generate a square `edge_px` x `edge_px` thumbnail for `path`.
///
/// Any decode failure - including an undecodable primary frame - is an
/// error; callers treat that as a broken file.
pub fn generate(path: &Path, edge_px: u32) -> Result<RgbaImage> {
    let edge = edge_px.max(1);
    let img = image_loader::open_image(path)?;
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        bail!("Image has zero dimension: {:?}", path);
    }

    // Downscale first so the crop works on a small bitmap.
    let short = w.min(h);
    let img = if short > edge {
        let scale = edge as f64 / short as f64;
        let new_w = ((w as f64 * scale).round() as u32).max(edge);
        let new_h = ((h as f64 * scale).round() as u32).max(edge);
        img.resize_exact(new_w, new_h, FilterType::Triangle)
    } else {
        img
    };

    // Center-crop the longer dimension to a square.
    let (w, h) = img.dimensions();
    let side = w.min(h);
    let x = (w - side) / 2;
    let y = (h - side) / 2;
    let square = img.crop_imm(x, y, side, side);

    // Fit to the square canvas; CatmullRom for the final quality pass.
    let thumb = if side == edge {
        square
    } else {
        square.resize_exact(edge, edge, FilterType::CatmullRom)
    };

    Ok(thumb.to_rgba8())
}
