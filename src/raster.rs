//! Decoded raster types.
//!
//! A [`Raster`] is the decoded, immutable pixel source of an image layer.
//! Decoding happens before any layer is touched, so a bad upload can never
//! leave a half-built layer behind.

use image::RgbaImage;

use crate::error::{ComposerError, ComposerResult};

/// A 2D size in pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizePx {
    pub width: u32,
    pub height: u32,
}

impl SizePx {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns true if either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns the smaller of the two dimensions.
    pub fn min_dimension(&self) -> u32 {
        self.width.min(self.height)
    }
}

/// A decoded RGBA raster with non-zero dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    /// The image data in RGBA format.
    data: RgbaImage,
}

impl Raster {
    /// Wraps already-decoded pixels.
    ///
    /// Fails with [`ComposerError::InvalidAsset`] if the image has a zero
    /// dimension.
    pub fn new(data: RgbaImage) -> ComposerResult<Self> {
        if data.width() == 0 || data.height() == 0 {
            return Err(ComposerError::invalid_asset(format!(
                "raster has degenerate size {}x{}",
                data.width(),
                data.height()
            )));
        }
        Ok(Self { data })
    }

    /// Decodes encoded image bytes (PNG, JPEG, GIF, BMP, WebP, ...).
    pub fn decode(bytes: &[u8]) -> ComposerResult<Self> {
        let img = image::load_from_memory(bytes)?.to_rgba8();
        Self::new(img)
    }

    /// Returns the pixel dimensions of the raster.
    pub fn dimensions(&self) -> SizePx {
        SizePx::new(self.data.width(), self.data.height())
    }

    /// Borrows the pixel buffer.
    pub fn pixels(&self) -> &RgbaImage {
        &self.data
    }

    /// Consumes the raster, returning its pixel buffer.
    pub fn into_pixels(self) -> RgbaImage {
        self.data
    }
}
