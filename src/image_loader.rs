//! Image loading with format detection and EXIF orientation handling.
//!
//! All decode paths in the engine funnel through here so that every bitmap
//! the rest of the code sees is already upright: the embedded orientation
//! tag (values 1-8) is applied at load time.

use std::io::Cursor;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::codecs::gif::GifDecoder;
use image::imageops::FilterType;
use image::AnimationDecoder;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};

/// Decode an image, applying any embedded orientation so the result is
/// upright. Animated GIFs decode to their first frame; a first frame that
/// fails to decode is an error.
pub fn open_image(path: &Path) -> Result<DynamicImage> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read image: {:?}", path))?;
    let format = image::guess_format(&bytes).ok();
    let orientation = exif_orientation(&bytes);

    if format == Some(ImageFormat::Gif) {
        let decoder = GifDecoder::new(Cursor::new(&bytes[..]))
            .with_context(|| format!("Failed to decode GIF: {:?}", path))?;
        let mut frames = decoder.into_frames();
        if let Some(frame) = frames.next() {
            let frame = frame.context("Failed to decode GIF frame")?;
            return Ok(DynamicImage::ImageRgba8(frame.into_buffer()));
        }
        return Err(anyhow!("GIF has no frames: {:?}", path));
    }

    let img = match format {
        Some(fmt) => image::load_from_memory_with_format(&bytes, fmt)
            .with_context(|| format!("Failed to decode image: {:?}", path))?,
        None => image::load_from_memory(&bytes)
            .with_context(|| format!("Failed to decode image: {:?}", path))?,
    };

    Ok(apply_orientation(img, orientation))
}

/// Decode an image and, if its longest side exceeds `max_dim`, downscale so
/// that side matches `max_dim` (aspect preserved). Orientation is applied.
pub fn open_image_at_most(path: &Path, max_dim: u32) -> Result<DynamicImage> {
    let img = open_image(path)?;
    let (w, h) = img.dimensions();
    let longest = w.max(h);
    if max_dim == 0 || longest <= max_dim {
        return Ok(img);
    }

    let scale = max_dim as f64 / longest as f64;
    let new_w = ((w as f64 * scale).round() as u32).max(1);
    let new_h = ((h as f64 * scale).round() as u32).max(1);
    Ok(img.resize_exact(new_w, new_h, FilterType::Triangle))
}

/// Read image dimensions from the header without a full decode. GIFs fall
/// back to decoding the first frame. Dimensions are as stored, not swapped
/// for orientation.
pub fn read_dimensions(path: &Path) -> Result<(u32, u32)> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read image: {:?}", path))?;
    let format = image::guess_format(&bytes).ok();

    if format == Some(ImageFormat::Gif) {
        let decoder = GifDecoder::new(Cursor::new(&bytes[..]))
            .with_context(|| format!("Failed to decode GIF: {:?}", path))?;
        let mut frames = decoder.into_frames();
        if let Some(frame) = frames.next() {
            let frame = frame.context("Failed to decode GIF frame")?;
            let buf = frame.into_buffer();
            return Ok((buf.width(), buf.height()));
        }
        return Err(anyhow!("GIF has no frames: {:?}", path));
    }

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .context("Failed to guess image format")?;
    reader
        .into_dimensions()
        .with_context(|| format!("Failed to read dimensions: {:?}", path))
}

/// Read the EXIF orientation tag from raw file bytes, defaulting to 1
/// (normal) when there is no EXIF segment or no orientation field.
fn exif_orientation(bytes: &[u8]) -> u8 {
    let mut cursor = Cursor::new(bytes);
    match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(data) => data
            .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .filter(|v| (1..=8).contains(v))
            .map(|v| v as u8)
            .unwrap_or(1),
        Err(_) => 1,
    }
}

/// Apply an EXIF orientation (1-8) so the image displays upright.
fn apply_orientation(img: DynamicImage, orientation: u8) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_png(path: &Path, w: u32, h: u32) {
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba([40, 80, 120, 255]));
        img.save(path).unwrap();
    }

    #[test]
    fn open_image_decodes_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.png");
        write_png(&path, 12, 7);

        let img = open_image(&path).unwrap();
        assert_eq!(img.dimensions(), (12, 7));
    }

    #[test]
    fn open_image_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("b.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        assert!(open_image(&path).is_err());
    }

    #[test]
    fn open_image_at_most_downscales_longest_side() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wide.png");
        write_png(&path, 400, 100);

        let img = open_image_at_most(&path, 200).unwrap();
        assert_eq!(img.dimensions(), (200, 50));

        // Never upscales.
        let img = open_image_at_most(&path, 1000).unwrap();
        assert_eq!(img.dimensions(), (400, 100));
    }

    #[test]
    fn read_dimensions_without_full_decode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c.png");
        write_png(&path, 33, 44);

        assert_eq!(read_dimensions(&path).unwrap(), (33, 44));
    }

    #[test]
    fn orientation_transforms_swap_dimensions() {
        let img = DynamicImage::ImageRgba8(image::RgbaImage::new(10, 20));
        assert_eq!(apply_orientation(img.clone(), 6).dimensions(), (20, 10));
        assert_eq!(apply_orientation(img.clone(), 8).dimensions(), (20, 10));
        assert_eq!(apply_orientation(img.clone(), 3).dimensions(), (10, 20));
        assert_eq!(apply_orientation(img, 1).dimensions(), (10, 20));
    }
}
