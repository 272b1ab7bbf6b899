//! Image recompression: downsizing and re-encoding in place.
//!
//! Each image under the content folder is decoded, downscaled when its long
//! edge exceeds the configured maximum (never upscaled), re-encoded to the
//! configured codec and written under the new extension. A failure on one
//! image never aborts the rest of the folder.

use crate::config::CompressImgConfig;
use crate::error::{CoreError, CoreResult};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use log::{debug, error, info};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Input extensions considered for recompression.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif"];

/// Output codec for recompressed images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageCodec {
    Jpeg,
    Png,
    WebP,
}

impl ImageCodec {
    pub fn parse(s: &str) -> CoreResult<Self> {
        match s.to_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::WebP),
            other => Err(CoreError::Config(format!(
                "unsupported image output format '{other}'"
            ))),
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
        }
    }
}

/// Recompresses every image directly under `folder` in place.
///
/// Returns the number of images successfully recompressed. The codec string
/// is validated up front; individual decode/encode failures are logged and
/// skipped.
pub fn recompress_images(folder: &Path, config: &CompressImgConfig) -> CoreResult<usize> {
    let codec = ImageCodec::parse(&config.format)?;
    let mut processed = 0;

    for entry in std::fs::read_dir(folder)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_image = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                IMAGE_EXTENSIONS
                    .iter()
                    .any(|img| ext.eq_ignore_ascii_case(img))
            });
        if !is_image {
            continue;
        }

        match recompress_one(&path, codec, config) {
            Ok(()) => processed += 1,
            Err(e) => error!("image recompression failed for '{}': {e}", path.display()),
        }
    }

    info!("recompressed {processed} images in '{}'", folder.display());
    Ok(processed)
}

fn recompress_one(path: &Path, codec: ImageCodec, config: &CompressImgConfig) -> CoreResult<()> {
    let img = image::open(path).map_err(|e| CoreError::Image(format!("decode: {e}")))?;
    let img = downscale(img, config.long_width);

    let output_path = path.with_extension(codec.extension());
    match codec {
        ImageCodec::Jpeg => {
            let writer = BufWriter::new(File::create(&output_path)?);
            let encoder = JpegEncoder::new_with_quality(writer, config.quality);
            DynamicImage::ImageRgb8(img.to_rgb8())
                .write_with_encoder(encoder)
                .map_err(|e| CoreError::Image(format!("jpeg encode: {e}")))?;
        }
        ImageCodec::Png => {
            img.save_with_format(&output_path, ImageFormat::Png)
                .map_err(|e| CoreError::Image(format!("png encode: {e}")))?;
        }
        ImageCodec::WebP => {
            let rgba = img.to_rgba8();
            let encoder = webp::Encoder::from_rgba(&rgba, rgba.width(), rgba.height());
            let encoded = encoder.encode(f32::from(config.quality));
            std::fs::write(&output_path, &*encoded)?;
        }
    }

    // A source that already carries the output extension was overwritten
    // in place; deleting it would destroy the fresh encode.
    if output_path != path {
        std::fs::remove_file(path)?;
    }
    debug!("recompressed '{}'", output_path.display());
    Ok(())
}

/// Downscales so the longer edge fits `long_edge`, preserving aspect ratio.
/// A non-positive limit or an already-fitting image passes through.
fn downscale(img: DynamicImage, long_edge: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if long_edge == 0 || width.max(height) <= long_edge {
        return img;
    }

    let (new_width, new_height) = if width >= height {
        let scaled = (u64::from(height) * u64::from(long_edge) / u64::from(width)) as u32;
        (long_edge, scaled.max(1))
    } else {
        let scaled = (u64::from(width) * u64::from(long_edge) / u64::from(height)) as u32;
        (scaled.max(1), long_edge)
    };

    img.resize_exact(new_width, new_height, FilterType::Lanczos3)
}
