//! Lossless image encoding of rendered frames.
//!
//! This module is feature-gated behind `png` (default on) so that the
//! preprocessing and comparison logic can be used without the `image`
//! crate. Only lossless formats are accepted: a reference image that
//! drifts through compression is useless for pixel comparison.

use crate::error::FixtureError;
use crate::pixel::{PixelBlob, RowOrder};
use image::ImageFormat;
use std::path::Path;

/// Infers a lossless output format from the file extension.
///
/// # Errors
///
/// Returns `FixtureError::Encode` for a missing or unsupported extension.
pub fn format_for_path(path: &Path) -> Result<ImageFormat, FixtureError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| {
            FixtureError::Encode(format!("{}: output path has no extension", path.display()))
        })?;

    match ext.as_str() {
        "png" => Ok(ImageFormat::Png),
        "bmp" => Ok(ImageFormat::Bmp),
        "tif" | "tiff" => Ok(ImageFormat::Tiff),
        other => Err(FixtureError::Encode(format!(
            "unsupported output format '.{other}' (expected png, bmp or tiff)"
        ))),
    }
}

/// Writes `blob` to `path`, flipping it to top-down row order first.
///
/// The image is encoded into a uniquely named hidden file in the same
/// directory and renamed over `path` only once the write succeeded, so a
/// failure never leaves a truncated image behind.
pub fn write_image(blob: PixelBlob, path: &Path) -> Result<(), FixtureError> {
    let format = format_for_path(path)?;
    let blob = blob.into_top_down();
    let (w, h) = (blob.width(), blob.height());
    let img = image::RgbaImage::from_raw(w, h, blob.into_data())
        .ok_or_else(|| FixtureError::Encode("RGBA buffer size mismatch".into()))?;

    let encode_error = |e: String| FixtureError::Encode(format!("{}: {e}", path.display()));

    // Dropping `tmp` on an early return deletes the partial file.
    let tmp = tempfile::Builder::new()
        .prefix(".")
        .suffix(".tmp")
        .tempfile_in(parent_dir(path))
        .map_err(|e| encode_error(e.to_string()))?;
    img.save_with_format(tmp.path(), format)
        .map_err(|e| encode_error(e.to_string()))?;
    tmp.persist(path)
        .map_err(|e| encode_error(e.error.to_string()))?;

    log::debug!("encoded {w}x{h} {format:?} to {}", path.display());
    Ok(())
}

/// Reads an image file back as a top-down RGBA blob.
pub fn read_image(path: &Path) -> Result<PixelBlob, FixtureError> {
    let img = image::open(path)
        .map_err(|e| FixtureError::Io(format!("{}: {e}", path.display())))?
        .to_rgba8();
    let (w, h) = img.dimensions();
    PixelBlob::new(img.into_raw(), w, h, RowOrder::TopDown)
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}
