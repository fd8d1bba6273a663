//! Encoding the render surface to image bytes.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};

use crate::error::{ComposerError, ComposerResult};
use crate::surface::RenderSurface;

/// Output format for an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Lossless, keeps transparency.
    #[default]
    Png,
    Bmp,
    Tiff,
    /// Lossy; transparency is dropped. `quality` is 1-100.
    Jpeg { quality: u8 },
}

impl ExportFormat {
    /// Conventional file extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::Jpeg { .. } => "jpg",
        }
    }
}

/// Encodes a snapshot of the surface.
///
/// The returned bytes are independent of the surface: later mutations do
/// not affect them.
#[tracing::instrument(level = "debug", skip(surface), fields(size = ?surface.size()))]
pub fn to_raster(surface: &RenderSurface, format: ExportFormat) -> ComposerResult<Vec<u8>> {
    if surface.size().is_empty() {
        return Err(ComposerError::empty_canvas("nothing to export"));
    }
    let image = DynamicImage::ImageRgba8(surface.snapshot());
    let mut bytes = Vec::new();

    let encoded = match format {
        ExportFormat::Png => image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png),
        ExportFormat::Bmp => image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Bmp),
        ExportFormat::Tiff => image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Tiff),
        ExportFormat::Jpeg { quality } => {
            let rgb = image.to_rgb8();
            JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100)).encode_image(&rgb)
        }
    };
    encoded.map_err(|e| ComposerError::export(e.to_string()))?;

    tracing::debug!(bytes = bytes.len(), format = format.extension(), "exported surface");
    Ok(bytes)
}
