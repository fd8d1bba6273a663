//! SVG rasterisation using resvg/usvg.
//!
//! Used for vector stickers (raw SVG markup or Twemoji) and for text layers,
//! whose glyphs are laid out as an SVG `<text>` element.

use std::sync::{Arc, OnceLock};

use image::{Rgba, RgbaImage};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{self, fontdb, FontResolver, Options, Tree};

use crate::error::{ComposerError, ComposerResult};

/// Native edge length, in pixels, that vector stickers are rasterised at.
pub const SVG_STICKER_SIZE: u32 = 512;

// ============================================================================
// SvgSource
// ============================================================================

/// Where a vector sticker's document comes from.
///
/// # Example
///
/// ```
/// use sticker_composer::SvgSource;
///
/// let markup: SvgSource = r#"<svg xmlns="http://www.w3.org/2000/svg"/>"#.into();
/// assert!(markup.document().is_ok());
///
/// #[cfg(feature = "twemoji")]
/// let duck = SvgSource::emoji("🦆").unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SvgSource {
    /// An SVG document.
    Markup(String),

    /// A single emoji, looked up in the bundled Twemoji set when rendered.
    Emoji(String),
}

impl SvgSource {
    /// Looks up an emoji, failing with [`ComposerError::Decode`] when
    /// Twemoji has no artwork for it.
    #[cfg(feature = "twemoji")]
    pub fn emoji(emoji: &str) -> ComposerResult<Self> {
        twemoji_document(emoji)?;
        Ok(Self::Emoji(emoji.to_owned()))
    }

    /// Returns the SVG document text.
    pub fn document(&self) -> ComposerResult<&str> {
        match self {
            Self::Markup(svg) => Ok(svg),
            #[cfg(feature = "twemoji")]
            Self::Emoji(emoji) => twemoji_document(emoji),
            #[cfg(not(feature = "twemoji"))]
            Self::Emoji(emoji) => Err(ComposerError::decode(format!(
                "emoji {emoji:?} needs the twemoji feature"
            ))),
        }
    }
}

#[cfg(feature = "twemoji")]
fn twemoji_document(emoji: &str) -> ComposerResult<&'static str> {
    use twemoji_assets::svg::SvgTwemojiAsset;

    SvgTwemojiAsset::from_emoji(emoji)
        .map(|asset| -> &'static str { asset.as_ref() })
        .ok_or_else(|| ComposerError::decode(format!("no twemoji artwork for {emoji:?}")))
}

impl From<String> for SvgSource {
    fn from(svg: String) -> Self {
        Self::Markup(svg)
    }
}

impl From<&str> for SvgSource {
    fn from(svg: &str) -> Self {
        Self::Markup(svg.to_owned())
    }
}

// ============================================================================
// Fonts
// ============================================================================

/// System fonts, loaded once per process.
///
/// The generic `sans-serif` family is pointed at an installed face when the
/// platform default (Arial) is missing.
fn shared_fontdb() -> Arc<fontdb::Database> {
    static FONTS: OnceLock<Arc<fontdb::Database>> = OnceLock::new();
    FONTS
        .get_or_init(|| {
            let mut db = fontdb::Database::new();
            db.load_system_fonts();
            if let Some(family) = installed_sans_family(&db) {
                tracing::debug!(%family, "using installed sans-serif family");
                db.set_sans_serif_family(family);
            }
            tracing::debug!(faces = db.len(), "loaded system fonts");
            Arc::new(db)
        })
        .clone()
}

fn installed_sans_family(db: &fontdb::Database) -> Option<String> {
    let sans = fontdb::Query {
        families: &[fontdb::Family::SansSerif],
        weight: fontdb::Weight::NORMAL,
        stretch: fontdb::Stretch::Normal,
        style: fontdb::Style::Normal,
    };
    if db.query(&sans).is_some() {
        return None;
    }
    let families = || db.faces().flat_map(|face| face.families.iter().map(|(name, _)| name));
    families()
        .find(|name| name.contains("Sans") && !name.contains("Mono"))
        .or_else(|| families().next())
        .cloned()
}

/// Returns true if at least one font face is available for captions.
pub(crate) fn fonts_available() -> bool {
    !shared_fontdb().is_empty()
}

/// Picks the requested family, then generic fallbacks, then any face at all.
fn font_resolver() -> FontResolver<'static> {
    FontResolver {
        select_font: Box::new(|font, db| {
            let mut families: Vec<fontdb::Family<'_>> = font
                .families()
                .iter()
                .map(|family| match family {
                    usvg::FontFamily::Serif => fontdb::Family::Serif,
                    usvg::FontFamily::SansSerif => fontdb::Family::SansSerif,
                    usvg::FontFamily::Cursive => fontdb::Family::Cursive,
                    usvg::FontFamily::Fantasy => fontdb::Family::Fantasy,
                    usvg::FontFamily::Monospace => fontdb::Family::Monospace,
                    usvg::FontFamily::Named(name) => fontdb::Family::Name(name),
                })
                .collect();
            families.extend([
                fontdb::Family::SansSerif,
                fontdb::Family::Serif,
                fontdb::Family::Monospace,
            ]);

            let style = match font.style() {
                usvg::FontStyle::Normal => fontdb::Style::Normal,
                usvg::FontStyle::Italic => fontdb::Style::Italic,
                usvg::FontStyle::Oblique => fontdb::Style::Oblique,
            };
            let query = fontdb::Query {
                families: &families,
                weight: fontdb::Weight(font.weight()),
                stretch: fontdb::Stretch::Normal,
                style,
            };

            db.query(&query).or_else(|| db.faces().next().map(|face| face.id))
        }),
        select_fallback: FontResolver::default_fallback_selector(),
    }
}

// ============================================================================
// SVG Rendering
// ============================================================================

fn parse_tree(svg_data: &str) -> ComposerResult<Tree> {
    let opts = Options {
        fontdb: shared_fontdb(),
        font_resolver: font_resolver(),
        ..Default::default()
    };
    Tree::from_str(svg_data, &opts).map_err(|e| ComposerError::decode(format!("svg: {e}")))
}

/// Renders an SVG string so that it fits within `size x size` pixels.
///
/// Aspect ratio is preserved; the larger dimension becomes `size`.
pub fn render_svg(svg_data: &str, size: u32) -> ComposerResult<RgbaImage> {
    let tree = parse_tree(svg_data)?;
    let svg_size = tree.size();
    let scale = (size as f32) / svg_size.width().max(svg_size.height());
    render_tree(&tree, scale)
}

/// Renders an SVG string at its own declared size.
pub fn render_svg_native(svg_data: &str) -> ComposerResult<RgbaImage> {
    let tree = parse_tree(svg_data)?;
    render_tree(&tree, 1.0)
}

/// Renders an [`SvgSource`] so that it fits within `size x size` pixels.
pub fn render_source(source: &SvgSource, size: u32) -> ComposerResult<RgbaImage> {
    render_svg(source.document()?, size)
}

fn render_tree(tree: &Tree, scale: f32) -> ComposerResult<RgbaImage> {
    let svg_size = tree.size();
    let width = (svg_size.width() * scale).ceil() as u32;
    let height = (svg_size.height() * scale).ceil() as u32;

    let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
        ComposerError::invalid_asset(format!("svg renders to degenerate size {width}x{height}"))
    })?;
    resvg::render(tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());

    Ok(straight_alpha(&pixmap))
}

/// Copies a premultiplied pixmap into a straight-alpha RGBA buffer.
fn straight_alpha(pixmap: &Pixmap) -> RgbaImage {
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in img.pixels_mut().zip(pixmap.pixels()) {
        let color = src.demultiply();
        *dst = Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
    }
    img
}

/// Escapes text for use inside SVG character data or attribute values.
pub(crate) fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
