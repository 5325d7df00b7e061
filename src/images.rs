//! Image uploads: sniff, downsize, re-encode, store by content hash.
//!
//! Every accepted upload is decoded and written back out as JPEG, which
//! strips metadata and normalises the format served from `/uploads`. The
//! file name is the SHA-256 of the encoded bytes, so identical uploads land
//! on the same file.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::error::LimitErrorKind;
use image::{DynamicImage, ImageFormat, ImageReader, Limits};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// JPEG quality used for stored images.
const JPEG_QUALITY: u8 = 85;

/// Largest width or height accepted from an upload, before downsizing.
pub const MAX_SOURCE_DIMENSION: u32 = 8192;

/// URL prefix the uploads directory is served under.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image is empty")]
    Empty,

    #[error("image is larger than {max} bytes")]
    TooLarge { max: usize },

    #[error("image is larger than {max}x{max} pixels")]
    TooManyPixels { max: u32 },

    #[error("unsupported image type: {0}")]
    Unsupported(String),

    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("could not store image: {0}")]
    Io(#[from] std::io::Error),
}

/// An image written to the uploads directory.
#[derive(Debug, Clone)]
pub struct StoredImage {
    /// Public path, e.g. `/uploads/ab/ab12….jpg`.
    pub url: String,
    pub path: PathBuf,
    pub hash: String,
    pub width: u32,
    pub height: u32,
}

fn accepted_format(bytes: &[u8]) -> Result<ImageFormat, ImageError> {
    let mime = infer::get(bytes)
        .map(|t| t.mime_type())
        .unwrap_or("application/octet-stream");
    match mime {
        "image/jpeg" => Ok(ImageFormat::Jpeg),
        "image/png" => Ok(ImageFormat::Png),
        "image/webp" => Ok(ImageFormat::WebP),
        "image/gif" => Ok(ImageFormat::Gif),
        other => Err(ImageError::Unsupported(other.to_string())),
    }
}

/// Decode with the dimension limits applied, so a small file declaring a
/// huge canvas is refused before any pixel buffer is allocated.
fn decode(bytes: &[u8], format: ImageFormat) -> Result<DynamicImage, ImageError> {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_SOURCE_DIMENSION);
    limits.max_image_height = Some(MAX_SOURCE_DIMENSION);

    let mut reader = ImageReader::with_format(Cursor::new(bytes), format);
    reader.limits(limits);
    reader.decode().map_err(|e| match e {
        image::ImageError::Limits(ref limit)
            if matches!(limit.kind(), LimitErrorKind::DimensionError) =>
        {
            ImageError::TooManyPixels {
                max: MAX_SOURCE_DIMENSION,
            }
        }
        other => ImageError::Decode(other),
    })
}

/// Shrink so the longest side is at most `max_dimension`. Never upscales.
fn fit_within(img: DynamicImage, max_dimension: u32) -> DynamicImage {
    if img.width().max(img.height()) <= max_dimension {
        img
    } else {
        img.resize(max_dimension, max_dimension, FilterType::Lanczos3)
    }
}

/// Validate, normalise and store an uploaded image.
///
/// Blocking: decoding and encoding are CPU-bound, so async callers should
/// run this on `spawn_blocking`.
pub fn store_image(
    bytes: &[u8],
    uploads_dir: &Path,
    max_dimension: u32,
    max_bytes: usize,
) -> Result<StoredImage, ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::Empty);
    }
    if bytes.len() > max_bytes {
        return Err(ImageError::TooLarge { max: max_bytes });
    }

    let format = accepted_format(bytes)?;
    let img = fit_within(decode(bytes, format)?, max_dimension);
    let rgb = img.to_rgb8();

    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut encoded, JPEG_QUALITY).encode_image(&rgb)?;

    let hash = hex::encode(Sha256::digest(&encoded));
    let prefix = &hash[..2];
    let dir = uploads_dir.join(prefix);
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(format!("{}.jpg", hash));
    if !path.exists() {
        std::fs::write(&path, &encoded)?;
    }

    tracing::debug!(
        "Stored image {} ({}x{}, {} bytes)",
        path.display(),
        rgb.width(),
        rgb.height(),
        encoded.len()
    );

    Ok(StoredImage {
        url: format!("{}/{}/{}.jpg", UPLOADS_URL_PREFIX, prefix, hash),
        path,
        hash,
        width: rgb.width(),
        height: rgb.height(),
    })
}

/// [`store_image`] on the blocking pool.
pub async fn store_image_async(
    bytes: Vec<u8>,
    uploads_dir: PathBuf,
    max_dimension: u32,
    max_bytes: usize,
) -> Result<StoredImage, ImageError> {
    tokio::task::spawn_blocking(move || {
        store_image(&bytes, &uploads_dir, max_dimension, max_bytes)
    })
    .await
    .map_err(|e| ImageError::Io(std::io::Error::other(e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 255) as u8, (y % 255) as u8, 90])
        });
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_large_image_is_downsized_keeping_aspect() {
        let dir = tempfile::tempdir().unwrap();
        let stored = store_image(&png(400, 200), dir.path(), 100, 1 << 20).unwrap();

        assert_eq!((stored.width, stored.height), (100, 50));
        assert!(stored.path.exists());
        assert!(stored.url.starts_with("/uploads/"));
        assert!(stored.url.ends_with(&format!("{}.jpg", stored.hash)));
        assert_eq!(&stored.url[9..11], &stored.hash[..2]);

        let written = std::fs::read(&stored.path).unwrap();
        assert_eq!(infer::get(&written).unwrap().mime_type(), "image/jpeg");
    }

    #[test]
    fn test_small_image_is_not_upscaled() {
        let dir = tempfile::tempdir().unwrap();
        let stored = store_image(&png(30, 40), dir.path(), 1200, 1 << 20).unwrap();
        assert_eq!((stored.width, stored.height), (30, 40));
    }

    #[test]
    fn test_same_content_same_file() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = png(20, 20);
        let a = store_image(&bytes, dir.path(), 1200, 1 << 20).unwrap();
        let b = store_image(&bytes, dir.path(), 1200, 1 << 20).unwrap();
        assert_eq!(a.path, b.path);
    }

    #[test]
    fn test_rejections() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            store_image(b"", dir.path(), 100, 10),
            Err(ImageError::Empty)
        ));
        assert!(matches!(
            store_image(&png(10, 10), dir.path(), 100, 10),
            Err(ImageError::TooLarge { max: 10 })
        ));
        assert!(matches!(
            store_image(b"%PDF-1.4 not an image", dir.path(), 100, 1 << 20),
            Err(ImageError::Unsupported(_))
        ));

        // Valid magic bytes but truncated body.
        let mut broken = png(10, 10);
        broken.truncate(40);
        assert!(matches!(
            store_image(&broken, dir.path(), 100, 1 << 20),
            Err(ImageError::Decode(_))
        ));
    }

    #[test]
    fn test_oversized_canvas_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let wide = png(MAX_SOURCE_DIMENSION + 1, 1);
        assert!(wide.len() < 1 << 20);

        assert!(matches!(
            store_image(&wide, dir.path(), 1200, 1 << 20),
            Err(ImageError::TooManyPixels { max: MAX_SOURCE_DIMENSION })
        ));
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());

        let edge = store_image(&png(MAX_SOURCE_DIMENSION, 1), dir.path(), 1200, 1 << 20).unwrap();
        assert_eq!(edge.width, 1200);
    }
}
