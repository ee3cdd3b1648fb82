// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sheet image — decoding, colour conversion and minimum-resolution upscaling.
// Operates on in-memory images using the `image` crate.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use omrscan_core::ImageDimensions;
use omrscan_core::error::OmrError;
use tracing::{debug, instrument};

/// A decoded photo or an intermediate colour stage of the pipeline.
///
/// All operations are non-destructive: each transform consumes `self` and
/// returns a new `SheetImage` wrapping a fresh buffer.
pub struct SheetImage {
    /// The current working image.
    image: DynamicImage,
}

impl SheetImage {
    // -- Construction ---------------------------------------------------------

    /// Decode raw encoded bytes (JPEG, PNG, BMP, ...).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, OmrError> {
        let img = image::load_from_memory(data).map_err(|err| OmrError::Decode(err.to_string()))?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> ImageDimensions {
        ImageDimensions {
            width: self.image.width(),
            height: self.image.height(),
        }
    }

    /// Three-channel copy of the image.
    pub fn to_rgb8(&self) -> RgbImage {
        self.image.to_rgb8()
    }

    /// Single-channel luma copy of the image.
    pub fn to_luma8(&self) -> GrayImage {
        self.image.to_luma8()
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Upscale isotropically so both sides are at least `min_dimension`.
    ///
    /// Images that already satisfy the minimum are returned untouched; this
    /// never shrinks an image.
    #[instrument(skip(self))]
    pub fn upscale_to_min(self, min_dimension: u32) -> Self {
        let (w, h) = (self.image.width(), self.image.height());
        let scale = upscale_factor(w, h, min_dimension);
        if scale <= 1.0 {
            return self;
        }

        let new_w = ((w as f64 * scale).round() as u32).max(min_dimension);
        let new_h = ((h as f64 * scale).round() as u32).max(min_dimension);
        debug!(from_w = w, from_h = h, new_w, new_h, scale, "Upscaling sheet");

        let resized = self.image.resize_exact(new_w, new_h, FilterType::Triangle);
        Self { image: resized }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, OmrError> {
        encode_to_format(&self.image, ImageFormat::Png)
    }
}

/// Isotropic factor that lifts both sides to at least `min_dimension`.
///
/// Returns 1.0 for empty images and for images already large enough.
pub fn upscale_factor(width: u32, height: u32, min_dimension: u32) -> f64 {
    if width == 0 || height == 0 {
        return 1.0;
    }
    let sx = min_dimension as f64 / width as f64;
    let sy = min_dimension as f64 / height as f64;
    sx.max(sy).max(1.0)
}

/// Encode a `DynamicImage` into the specified format, returning the raw bytes.
fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, OmrError> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, format)
        .map_err(|err| OmrError::Decode(format!("image encoding failed: {}", err)))?;
    Ok(buffer)
}
