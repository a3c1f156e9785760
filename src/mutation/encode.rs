//! Re-encoding rotated images in their original container format.
//!
//! The target format is derived from the file extension, not from content
//! sniffing: the point is to keep the file what its name says it is.
//! Unknown extensions fall back to PNG.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use tracing::debug;

use crate::error::BrowseError;

/// JPEG quality used when re-encoding (0-100).
const JPEG_SAVE_QUALITY: u8 = 90;

/// Container format for a file, derived from its extension.
pub fn format_for_extension(path: &Path) -> ImageFormat {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => ImageFormat::Jpeg,
        Some("png") => ImageFormat::Png,
        Some("tiff") | Some("tif") => ImageFormat::Tiff,
        Some("bmp") => ImageFormat::Bmp,
        Some("gif") => ImageFormat::Gif,
        _ => ImageFormat::Png,
    }
}

/// Overwrite `path` with `img`, encoded in the extension-derived format.
/// No metadata is carried over, so the stored orientation is normal.
pub fn write_in_place(img: &DynamicImage, path: &Path) -> Result<(), BrowseError> {
    let format = format_for_extension(path);
    debug!(?path, ?format, "Re-encoding image");

    let io_failure = |source: std::io::Error| BrowseError::IoFailure {
        path: path.to_path_buf(),
        source,
    };

    match format {
        ImageFormat::Jpeg => {
            let file = File::create(path).map_err(io_failure)?;
            let mut writer = BufWriter::new(file);
            let encoder = JpegEncoder::new_with_quality(&mut writer, JPEG_SAVE_QUALITY);
            // JPEG carries no alpha channel.
            img.to_rgb8()
                .write_with_encoder(encoder)
                .map_err(|e| io_failure(std::io::Error::other(e)))
        }
        other => img
            .save_with_format(path, other)
            .map_err(|e| io_failure(std::io::Error::other(e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use tempfile::tempdir;

    fn sample(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, image::Rgba([9, 8, 7, 255])))
    }

    #[test]
    fn format_follows_extension_with_png_fallback() {
        assert_eq!(
            format_for_extension(Path::new("a.jpg")),
            ImageFormat::Jpeg
        );
        assert_eq!(
            format_for_extension(Path::new("a.JPEG")),
            ImageFormat::Jpeg
        );
        assert_eq!(format_for_extension(Path::new("a.png")), ImageFormat::Png);
        assert_eq!(format_for_extension(Path::new("a.tif")), ImageFormat::Tiff);
        assert_eq!(format_for_extension(Path::new("a.bmp")), ImageFormat::Bmp);
        assert_eq!(format_for_extension(Path::new("a.gif")), ImageFormat::Gif);
        // Formats without an encoder mapping fall back to PNG.
        assert_eq!(format_for_extension(Path::new("a.webp")), ImageFormat::Png);
        assert_eq!(format_for_extension(Path::new("a")), ImageFormat::Png);
    }

    #[test]
    fn jpeg_round_trip_keeps_dimensions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.jpg");

        write_in_place(&sample(40, 25), &path).unwrap();
        assert_eq!(image::image_dimensions(&path).unwrap(), (40, 25));
        assert_eq!(
            image::guess_format(&std::fs::read(&path).unwrap()).unwrap(),
            ImageFormat::Jpeg
        );
    }

    #[test]
    fn png_round_trip_preserves_pixels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.png");

        write_in_place(&sample(8, 8), &path).unwrap();
        let back = image::open(&path).unwrap().to_rgba8();
        assert_eq!(back.get_pixel(0, 0), &image::Rgba([9, 8, 7, 255]));
    }

    #[test]
    fn bmp_and_gif_encode_in_their_container() {
        let dir = tempdir().unwrap();

        let bmp = dir.path().join("out.bmp");
        write_in_place(&sample(12, 6), &bmp).unwrap();
        assert_eq!(
            image::guess_format(&std::fs::read(&bmp).unwrap()).unwrap(),
            ImageFormat::Bmp
        );

        let gif = dir.path().join("out.gif");
        write_in_place(&sample(12, 6), &gif).unwrap();
        assert_eq!(
            image::guess_format(&std::fs::read(&gif).unwrap()).unwrap(),
            ImageFormat::Gif
        );
    }

    #[test]
    fn write_failure_is_io_failure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("out.png");

        let err = write_in_place(&sample(4, 4), &path).unwrap_err();
        assert!(matches!(err, BrowseError::IoFailure { .. }));
    }
}
