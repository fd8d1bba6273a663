//! Caption text layers.
//!
//! A text layer keeps only its glyph-rendering parameters; pixels are
//! produced on demand by laying the caption out as an SVG `<text>` element
//! and rasterising it through resvg. The caption occupies a band that spans
//! the surface width, so its anchor math does not depend on which fonts
//! happen to be installed.

use std::str::FromStr;

use image::RgbaImage;
use palette::Srgb;
use serde::{Deserialize, Serialize};

use super::svg::{escape_xml, fonts_available, render_svg_native};
use crate::error::{ComposerError, ComposerResult};

/// Horizontal alignment of text inside its band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Glyph rendering parameters shared by caption layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextStyle {
    pub font_family: String,
    /// Font size in surface pixels.
    pub font_size: f32,
    /// Fill colour as a hex code (`#fff` or `#ffffff`).
    pub fill: String,
    /// Outline colour as a hex code.
    pub stroke: String,
    /// Outline width in surface pixels; zero disables the outline.
    pub stroke_width: f32,
    pub align: TextAlign,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: "Impact".to_string(),
            font_size: 40.0,
            fill: "#fff".to_string(),
            stroke: "#000".to_string(),
            stroke_width: 2.0,
            align: TextAlign::Center,
        }
    }
}

impl TextStyle {
    /// Checks sizes and colours, returning the first problem found.
    pub fn validate(&self) -> ComposerResult<()> {
        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            return Err(ComposerError::invalid_parameter(format!(
                "font size {} must be positive and finite",
                self.font_size
            )));
        }
        if !(self.stroke_width.is_finite() && self.stroke_width >= 0.0) {
            return Err(ComposerError::invalid_parameter(format!(
                "stroke width {} must be non-negative and finite",
                self.stroke_width
            )));
        }
        parse_color(&self.fill)?;
        parse_color(&self.stroke)?;
        Ok(())
    }

    /// Height of the band a single caption line occupies.
    pub fn band_height(&self) -> u32 {
        (self.font_size * 1.25 + 2.0 * self.stroke_width).ceil() as u32
    }
}

/// Parses a hex colour into an sRGB triple.
pub fn parse_color(hex: &str) -> ComposerResult<Srgb<u8>> {
    Srgb::<u8>::from_str(hex)
        .map_err(|e| ComposerError::invalid_parameter(format!("colour {hex:?}: {e}")))
}

fn hex(color: Srgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color.red, color.green, color.blue)
}

/// A caption and the style it is drawn with.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpec {
    pub text: String,
    pub style: TextStyle,
}

impl TextSpec {
    pub fn new(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    /// Builds the SVG document for this caption in a band `band_width` wide.
    pub fn to_svg(&self, band_width: u32) -> ComposerResult<String> {
        let style = &self.style;
        let fill = hex(parse_color(&style.fill)?);
        let stroke = hex(parse_color(&style.stroke)?);
        let width = band_width.max(1);
        let height = style.band_height();

        let (x, anchor) = match style.align {
            TextAlign::Left => (style.stroke_width, "start"),
            TextAlign::Center => (width as f32 / 2.0, "middle"),
            TextAlign::Right => (width as f32 - style.stroke_width, "end"),
        };
        let baseline = style.stroke_width + style.font_size;

        Ok(format!(
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}">"#,
                r#"<text x="{x}" y="{y}" font-family="{family}, sans-serif" font-size="{size}" "#,
                r#"fill="{fill}" stroke="{stroke}" stroke-width="{sw}" paint-order="stroke" "#,
                r#"stroke-linejoin="round" text-anchor="{anchor}">{text}</text></svg>"#
            ),
            w = width,
            h = height,
            x = x,
            y = baseline,
            family = escape_xml(&style.font_family),
            size = style.font_size,
            fill = fill,
            stroke = stroke,
            sw = style.stroke_width,
            anchor = anchor,
            text = escape_xml(&self.text),
        ))
    }

    /// Rasterises the caption band.
    ///
    /// Fails with [`ComposerError::InvalidAsset`] when no font face is
    /// installed, since the band would come out blank.
    pub fn render(&self, band_width: u32) -> ComposerResult<RgbaImage> {
        ensure_fonts()?;
        render_svg_native(&self.to_svg(band_width)?)
    }
}

/// Fails unless captions can be drawn with at least one font face.
pub fn ensure_fonts() -> ComposerResult<()> {
    if fonts_available() {
        Ok(())
    } else {
        Err(ComposerError::invalid_asset(
            "no font faces are installed to draw captions with",
        ))
    }
}
