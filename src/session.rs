//! The editing session.
//!
//! A [`Composer`] owns the layer stack, the filter chain and the render
//! surface, and is the only way to mutate them. Every successful mutation
//! ends with a synchronous surface recompute, so reads and exports never see
//! a stale composition.

use image::RgbaImage;

use crate::config::{ComposerConfig, FilterSettings};
use crate::decode::{AssetSlot, DecodeCompletion, DecodeOutcome, DecodeTask, DecodeTicket, StickerDrop};
use crate::error::{ComposerError, ComposerResult};
use crate::export::{self, ExportFormat};
use crate::filter::{FilterChain, FilterKind};
use crate::layer::svg::{render_source, SvgSource, SVG_STICKER_SIZE};
use crate::layer::{text, LayerId, LayerStack, TextSpec};
use crate::raster::Raster;
use crate::surface::RenderSurface;
use crate::transform::{self, Origin, Point, SnapPosition, Transform};

// ============================================================================
// Configurable Trait
// ============================================================================

/// Trait for types whose filters can be driven by [`FilterSettings`].
pub trait Configurable {
    /// Applies filter settings. Invalid settings leave the filters unchanged.
    fn apply_settings(&mut self, settings: &FilterSettings) -> ComposerResult<()>;

    /// Exports the current filter settings.
    fn export_settings(&self) -> FilterSettings;
}

// ============================================================================
// Composer
// ============================================================================

/// An image-composition session.
///
/// # Example
///
/// ```
/// use sticker_composer::{Composer, ExportFormat, FilterKind, StickerDrop};
/// # use std::io::Cursor;
/// # let png = |w, h| {
/// #     let mut bytes = Vec::new();
/// #     image::RgbaImage::new(w, h)
/// #         .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
/// #         .unwrap();
/// #     bytes
/// # };
///
/// let mut composer = Composer::default();
/// composer.set_base_image(&png(800, 600))?;
/// let sticker = composer.add_sticker(&png(200, 200), StickerDrop::at(100.0, 100.0))?;
/// assert_eq!(composer.layers().get(sticker).unwrap().transform().scale_x(), 0.75);
///
/// composer.set_parameter("brightness", 1.5)?;
/// composer.set_filter(FilterKind::Noise, 40.0)?;
///
/// let png_bytes = composer.export(ExportFormat::Png)?;
/// assert!(!png_bytes.is_empty());
/// # Ok::<(), sticker_composer::ComposerError>(())
/// ```
#[derive(Debug)]
pub struct Composer {
    layers: LayerStack,
    filters: FilterChain,
    surface: RenderSurface,
    config: ComposerConfig,
    /// Generation of the most recent base image request.
    requested_base: u64,
    /// Generation of the base image currently on the surface.
    committed_base: u64,
}

impl Default for Composer {
    fn default() -> Self {
        Self::from_parts(ComposerConfig::default(), FilterChain::new(0))
    }
}

impl Composer {
    /// Creates a session from a validated configuration.
    pub fn new(config: ComposerConfig) -> ComposerResult<Self> {
        config.validate()?;
        let mut filters = FilterChain::new(config.noise_seed);
        filters.set_params(config.filters.to_params()?);
        Ok(Self::from_parts(config, filters))
    }

    /// Creates a session with a custom filter chain.
    pub fn with_filters(config: ComposerConfig, filters: FilterChain) -> ComposerResult<Self> {
        config.validate()?;
        Ok(Self::from_parts(config, filters))
    }

    fn from_parts(config: ComposerConfig, filters: FilterChain) -> Self {
        Self {
            layers: LayerStack::new(),
            filters,
            surface: RenderSurface::new(),
            config,
            requested_base: 0,
            committed_base: 0,
        }
    }

    /// The layer stack, base image first.
    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    /// The global filter chain.
    pub fn filters(&self) -> &FilterChain {
        &self.filters
    }

    /// The flattened composition, current as of the last mutation.
    pub fn surface(&self) -> &RenderSurface {
        &self.surface
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    fn refresh(&mut self) {
        self.surface.recompute(&self.layers, &self.filters);
    }

    fn require_base(&self, action: &str) -> ComposerResult<()> {
        if self.layers.has_base() {
            Ok(())
        } else {
            Err(ComposerError::empty_canvas(format!(
                "load a base image before {action}"
            )))
        }
    }

    // ---- Decode protocol ----

    /// Starts loading a new base image.
    ///
    /// Any base decode requested earlier becomes stale, even if it has not
    /// finished yet.
    pub fn request_base_image(&mut self, bytes: Vec<u8>) -> DecodeTask {
        self.requested_base += 1;
        let ticket = DecodeTicket {
            slot: AssetSlot::Base,
            generation: self.requested_base,
        };
        tracing::debug!(generation = ticket.generation, "base image requested");
        DecodeTask::new(ticket, bytes)
    }

    /// Starts loading a sticker dropped onto the current base image.
    pub fn request_sticker(&mut self, bytes: Vec<u8>, drop: StickerDrop) -> ComposerResult<DecodeTask> {
        self.require_base("adding stickers")?;
        Ok(DecodeTask::new(self.sticker_ticket(drop), bytes))
    }

    fn sticker_ticket(&self, drop: StickerDrop) -> DecodeTicket {
        DecodeTicket {
            slot: AssetSlot::Sticker(drop),
            generation: self.committed_base,
        }
    }

    /// Applies a finished decode. This is the single mutation entry point
    /// for uploaded assets.
    ///
    /// Completions for a superseded slot fail with
    /// [`ComposerError::StaleOperation`], as does a base completion that has
    /// already been applied. Failed decodes surface their error. Either way
    /// the session is left untouched.
    pub fn complete(&mut self, completion: DecodeCompletion) -> ComposerResult<LayerId> {
        let DecodeCompletion { ticket, outcome } = completion;
        let (current, stale) = match ticket.slot {
            AssetSlot::Base => (
                self.requested_base,
                ticket.generation != self.requested_base
                    || ticket.generation == self.committed_base,
            ),
            AssetSlot::Sticker(_) => (
                self.committed_base,
                ticket.generation != self.committed_base,
            ),
        };
        if stale {
            tracing::warn!(
                slot = ticket.slot.name(),
                generation = ticket.generation,
                current,
                "dropping stale decode"
            );
            return Err(ComposerError::StaleOperation {
                slot: ticket.slot.name(),
                generation: ticket.generation,
                current,
            });
        }

        let raster = match outcome {
            DecodeOutcome::Decoded(raster) => raster,
            DecodeOutcome::Failed(err) => return Err(err),
        };

        let id = match ticket.slot {
            AssetSlot::Base => {
                let id = self.layers.set_base(raster);
                self.committed_base = ticket.generation;
                tracing::debug!(layer = %id, size = ?self.layers.surface_size(), "base image set");
                id
            }
            AssetSlot::Sticker(drop) => self.place_sticker(raster, drop)?,
        };
        self.refresh();
        Ok(id)
    }

    fn place_sticker(&mut self, raster: Raster, drop: StickerDrop) -> ComposerResult<LayerId> {
        self.require_base("adding stickers")?;
        let surface = self.layers.surface_size();
        let target = drop.target_size.unwrap_or_else(|| {
            transform::sticker_size(surface.width, surface.height, self.config.sticker_fraction)
        });
        let placement = transform::placement_transform(drop.pointer, raster.dimensions(), target)?;
        let id = self.layers.push_sticker(raster, placement);
        tracing::debug!(layer = %id, scale = placement.scale_x(), "sticker added");
        Ok(id)
    }

    // ---- Layer operations ----

    /// Decodes and installs a new base image, discarding every other layer.
    pub fn set_base_image(&mut self, bytes: &[u8]) -> ComposerResult<LayerId> {
        let task = self.request_base_image(bytes.to_vec());
        self.complete(task.run())
    }

    /// Decodes a sticker and centers it on the drop point.
    pub fn add_sticker(&mut self, bytes: &[u8], drop: StickerDrop) -> ComposerResult<LayerId> {
        let task = self.request_sticker(bytes.to_vec(), drop)?;
        self.complete(task.run())
    }

    /// Rasterises SVG markup (or an emoji source) and adds it as a sticker.
    pub fn add_svg_sticker(
        &mut self,
        source: impl Into<SvgSource>,
        drop: StickerDrop,
    ) -> ComposerResult<LayerId> {
        self.require_base("adding stickers")?;
        let raster = Raster::new(render_source(&source.into(), SVG_STICKER_SIZE)?)?;
        self.complete(DecodeCompletion::decoded(self.sticker_ticket(drop), raster))
    }

    /// Adds a Twemoji sticker.
    #[cfg(feature = "twemoji")]
    pub fn add_emoji_sticker(&mut self, emoji: &str, drop: StickerDrop) -> ComposerResult<LayerId> {
        self.add_svg_sticker(SvgSource::emoji(emoji)?, drop)
    }

    /// Decodes a sticker and pins it to a preset position, scaled uniformly
    /// by `scale` relative to its native size.
    pub fn snap_sticker(
        &mut self,
        bytes: &[u8],
        position: SnapPosition,
        scale: f32,
    ) -> ComposerResult<LayerId> {
        self.require_base("adding stickers")?;
        let raster = Raster::decode(bytes)?;
        let placement =
            transform::snap_placement(position, self.layers.surface_size(), raster.dimensions(), scale)?;
        let id = self.layers.push_sticker(raster, placement);
        tracing::debug!(layer = %id, ?position, "sticker snapped");
        self.refresh();
        Ok(id)
    }

    /// Adds top and/or bottom captions. Empty or missing strings are skipped.
    ///
    /// Returns the ids of the created layers, top first.
    pub fn add_text(&mut self, top: Option<&str>, bottom: Option<&str>) -> ComposerResult<Vec<LayerId>> {
        self.require_base("adding text")?;
        if top.is_some_and(|t| !t.is_empty()) || bottom.is_some_and(|t| !t.is_empty()) {
            text::ensure_fonts()?;
        }
        let surface = self.layers.surface_size();
        let captions = &self.config.captions;
        let center_x = surface.width as f32 / 2.0;

        let mut pending = Vec::new();
        if let Some(text) = top.filter(|t| !t.is_empty()) {
            let at = Point::new(center_x, captions.top_inset);
            pending.push((text, Transform::anchored(at, Origin::TOP_CENTER)?));
        }
        if let Some(text) = bottom.filter(|t| !t.is_empty()) {
            let at = Point::new(center_x, surface.height as f32 - captions.bottom_inset);
            pending.push((text, Transform::anchored(at, Origin::BOTTOM_CENTER)?));
        }

        let style = captions.style.clone();
        let ids: Vec<LayerId> = pending
            .into_iter()
            .map(|(text, placement)| {
                self.layers
                    .push_text(TextSpec::new(text, style.clone()), placement)
            })
            .collect();
        if !ids.is_empty() {
            tracing::debug!(count = ids.len(), "captions added");
            self.refresh();
        }
        Ok(ids)
    }

    /// Removes an overlay (or the base image). Other layers are untouched.
    pub fn remove_layer(&mut self, id: LayerId) -> ComposerResult<()> {
        self.layers.remove(id)?;
        tracing::debug!(layer = %id, "layer removed");
        self.refresh();
        Ok(())
    }

    /// Moves a layer to `new_index`; see [`LayerStack::reorder`].
    pub fn reorder(&mut self, id: LayerId, new_index: usize) -> ComposerResult<()> {
        self.layers.reorder(id, new_index)?;
        self.refresh();
        Ok(())
    }

    /// Moves an overlay, e.g. at the end of a drag.
    pub fn move_layer(&mut self, id: LayerId, transform: Transform) -> ComposerResult<()> {
        self.layers.set_transform(id, transform)?;
        self.refresh();
        Ok(())
    }

    pub fn select(&mut self, id: LayerId) -> ComposerResult<()> {
        self.layers.select(id)
    }

    // ---- Filters ----

    /// Sets a filter parameter by name (`"brightness"`, `"contrast"`,
    /// `"saturation"` or `"noise"`). Returns true if the value changed.
    pub fn set_parameter(&mut self, name: &str, value: f32) -> ComposerResult<bool> {
        self.set_filter(name.parse()?, value)
    }

    /// Sets a filter parameter. Returns true if the value changed.
    pub fn set_filter(&mut self, kind: FilterKind, value: f32) -> ComposerResult<bool> {
        let changed = self.filters.set_parameter(kind, value)?;
        if changed {
            tracing::debug!(filter = %kind, value, "filter updated");
            self.refresh();
        }
        Ok(changed)
    }

    /// Returns a layer's pixels after the filter chain.
    pub fn apply_filters(&self, id: LayerId) -> ComposerResult<RgbaImage> {
        self.filters.apply(&self.layers, id)
    }

    // ---- Export ----

    /// Encodes the current composition.
    pub fn export(&self, format: ExportFormat) -> ComposerResult<Vec<u8>> {
        export::to_raster(&self.surface, format)
    }
}

impl Configurable for Composer {
    fn apply_settings(&mut self, settings: &FilterSettings) -> ComposerResult<()> {
        let params = settings.to_params()?;
        if self.filters.set_params(params) {
            self.refresh();
        }
        Ok(())
    }

    fn export_settings(&self) -> FilterSettings {
        FilterSettings::from(self.filters.params())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerKind;
    use crate::raster::SizePx;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    fn png_of(img: &RgbaImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn png(w: u32, h: u32, rgba: [u8; 4]) -> Vec<u8> {
        png_of(&RgbaImage::from_pixel(w, h, Rgba(rgba)))
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    }

    fn composer_with_base(w: u32, h: u32) -> Composer {
        init_tracing();
        let mut composer = Composer::default();
        composer.set_base_image(&png(w, h, [90, 90, 90, 255])).unwrap();
        composer
    }

    const RED_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><rect width="10" height="10" fill="#ff0000"/></svg>"##;

    #[test]
    fn sticker_on_800x600_scenario() {
        let mut composer = composer_with_base(800, 600);
        let id = composer
            .add_sticker(&png(200, 200, [0, 0, 255, 255]), StickerDrop::at(100.0, 100.0))
            .unwrap();

        let layer = composer.layers().get(id).unwrap();
        assert_eq!(layer.transform().scale_x(), 0.75);
        assert_eq!(layer.transform().scale_y(), 0.75);
        assert_eq!(layer.transform().origin, Origin::CENTER);
        assert_eq!(layer.transform().position, Point::new(100.0, 100.0));
        assert_eq!(composer.layers().active(), Some(id));

        // the 150x150 sticker spans 25..175 on the surface
        let pixels = composer.surface().pixels();
        assert_eq!(pixels.get_pixel(100, 100).0, [0, 0, 255, 255]);
        assert_eq!(pixels.get_pixel(26, 26).0, [0, 0, 255, 255]);
        assert_eq!(pixels.get_pixel(200, 200).0, [90, 90, 90, 255]);
    }

    #[test]
    fn explicit_target_size_overrides_default() {
        let mut composer = composer_with_base(800, 600);
        let id = composer
            .add_sticker(
                &png(100, 50, [0, 0, 0, 255]),
                StickerDrop::at(10.0, 10.0).with_size(50.0),
            )
            .unwrap();
        assert_eq!(composer.layers().get(id).unwrap().transform().scale_x(), 0.5);
    }

    #[test]
    fn surface_matches_base_dimensions() {
        let composer = composer_with_base(31, 17);
        assert_eq!(composer.surface().size(), SizePx::new(31, 17));
        assert_eq!(composer.layers().surface_size(), SizePx::new(31, 17));
    }

    #[test]
    fn second_base_resets_model() {
        let mut composer = composer_with_base(100, 100);
        composer
            .add_sticker(&png(10, 10, [1, 1, 1, 255]), StickerDrop::at(5.0, 5.0))
            .unwrap();
        composer.add_text(Some("TOP"), Some("BOTTOM")).unwrap();
        assert_eq!(composer.layers().len(), 4);

        let b = composer.set_base_image(&png(50, 40, [7, 7, 7, 255])).unwrap();
        assert_eq!(composer.layers().len(), 1);
        assert_eq!(composer.layers().base().unwrap().id(), b);
        assert_eq!(composer.surface().size(), SizePx::new(50, 40));
    }

    #[test]
    fn add_text_skips_empty_strings() {
        let mut composer = composer_with_base(300, 200);
        let ids = composer.add_text(Some("TOP"), Some("")).unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(composer.layers().len(), 2);

        let layer = composer.layers().get(ids[0]).unwrap();
        assert_eq!(layer.kind(), LayerKind::Text);
        assert_eq!(layer.text().unwrap().text, "TOP");
        assert_eq!(layer.transform().origin, Origin::TOP_CENTER);
        assert_eq!(layer.transform().position, Point::new(150.0, 20.0));

        assert!(composer.add_text(None, None).unwrap().is_empty());
        assert_eq!(composer.layers().len(), 2);
    }

    /// Rows holding pixels that differ between two equally sized images.
    fn changed_rows(before: &RgbaImage, after: &RgbaImage) -> Vec<u32> {
        let mut rows: Vec<u32> = before
            .enumerate_pixels()
            .filter(|(x, y, p)| after.get_pixel(*x, *y) != *p)
            .map(|(_, y, _)| y)
            .collect();
        rows.dedup();
        rows
    }

    #[test]
    fn captions_are_drawn_inside_their_bands() {
        let mut composer = composer_with_base(300, 200);
        let band = composer.config().captions.style.band_height();
        let blank = composer.surface().snapshot();

        composer.add_text(Some("TOP"), None).unwrap();
        let rows = changed_rows(&blank, composer.surface().pixels());
        assert!(!rows.is_empty(), "top caption left the surface untouched");
        assert!(rows.iter().all(|y| (20..20 + band).contains(y)), "{rows:?}");

        let with_top = composer.surface().snapshot();
        composer.add_text(None, Some("BOTTOM")).unwrap();
        let rows = changed_rows(&with_top, composer.surface().pixels());
        assert!(!rows.is_empty(), "bottom caption left the surface untouched");
        assert!(rows.iter().all(|y| (160 - band..160).contains(y)), "{rows:?}");
    }

    #[test]
    fn bottom_text_is_anchored_to_bottom_edge() {
        let mut composer = composer_with_base(300, 200);
        let ids = composer.add_text(None, Some("BOTTOM")).unwrap();
        let layer = composer.layers().get(ids[0]).unwrap();
        assert_eq!(layer.transform().origin, Origin::BOTTOM_CENTER);
        assert_eq!(layer.transform().position, Point::new(150.0, 160.0));
    }

    #[test]
    fn overlays_need_a_base_image() {
        let mut composer = Composer::default();
        assert!(matches!(
            composer.add_text(Some("hi"), None),
            Err(ComposerError::EmptyCanvas(_))
        ));
        assert!(matches!(
            composer.add_sticker(&png(2, 2, [0; 4]), StickerDrop::at(0.0, 0.0)),
            Err(ComposerError::EmptyCanvas(_))
        ));
        assert!(composer.layers().is_empty());
    }

    #[test]
    fn filters_on_empty_model_are_empty_canvas() {
        let composer = Composer::default();
        assert!(matches!(
            composer.apply_filters(LayerId(1)),
            Err(ComposerError::EmptyCanvas(_))
        ));
        assert!(composer.layers().is_empty());
        assert!(composer.surface().size().is_empty());
    }

    #[test]
    fn decode_failure_leaves_model_unchanged() {
        let mut composer = composer_with_base(20, 20);
        let sticker = composer
            .add_sticker(&png(4, 4, [255, 0, 0, 255]), StickerDrop::at(2.0, 2.0))
            .unwrap();
        let before = composer.surface().snapshot();

        assert!(matches!(
            composer.set_base_image(b"garbage"),
            Err(ComposerError::Decode(_))
        ));
        assert!(matches!(
            composer.add_sticker(b"garbage", StickerDrop::at(1.0, 1.0)),
            Err(ComposerError::Decode(_))
        ));
        assert_eq!(composer.layers().len(), 2);
        assert!(composer.layers().get(sticker).is_some());
        assert_eq!(composer.surface().pixels(), &before);
    }

    #[test]
    fn slow_base_decode_is_stale() {
        let mut composer = Composer::default();
        let slow = composer.request_base_image(png(10, 10, [1, 0, 0, 255]));
        let fast = composer.request_base_image(png(20, 20, [0, 1, 0, 255]));

        let fast_id = composer.complete(fast.run()).unwrap();
        let err = composer.complete(slow.run()).unwrap_err();
        assert!(err.is_stale());

        assert_eq!(composer.layers().len(), 1);
        assert_eq!(composer.layers().base().unwrap().id(), fast_id);
        assert_eq!(composer.surface().size(), SizePx::new(20, 20));
    }

    #[test]
    fn decodes_may_complete_on_other_threads() {
        let mut composer = composer_with_base(40, 40);
        let task = composer
            .request_sticker(png(8, 8, [0, 0, 0, 255]), StickerDrop::at(20.0, 20.0))
            .unwrap();
        let completion = std::thread::spawn(move || task.run()).join().unwrap();
        let id = composer.complete(completion).unwrap();
        assert_eq!(composer.layers().index_of(id).unwrap(), 1);
    }

    #[test]
    fn sticker_for_replaced_base_is_stale() {
        let mut composer = composer_with_base(40, 40);
        let sticker = composer
            .request_sticker(png(8, 8, [0, 0, 0, 255]), StickerDrop::at(20.0, 20.0))
            .unwrap();
        composer.set_base_image(&png(60, 60, [5, 5, 5, 255])).unwrap();

        let err = composer.complete(sticker.run()).unwrap_err();
        assert!(matches!(err, ComposerError::StaleOperation { slot: "sticker", .. }));
        assert_eq!(composer.layers().len(), 1);
    }

    #[test]
    fn base_completion_applies_only_once() {
        let mut composer = Composer::default();
        let completion = composer.request_base_image(png(30, 30, [3, 3, 3, 255])).run();
        composer.complete(completion.clone()).unwrap();
        let sticker = composer
            .add_sticker(&png(4, 4, [0, 0, 0, 255]), StickerDrop::at(10.0, 10.0))
            .unwrap();

        let err = composer.complete(completion).unwrap_err();
        assert!(matches!(err, ComposerError::StaleOperation { slot: "base", .. }));
        assert_eq!(composer.layers().len(), 2);
        assert!(composer.layers().get(sticker).is_some());
    }

    #[test]
    fn pending_base_does_not_block_stickers_on_current_base() {
        let mut composer = composer_with_base(40, 40);
        let pending = composer.request_base_image(png(60, 60, [5, 5, 5, 255]));
        composer
            .add_sticker(&png(8, 8, [0, 0, 0, 255]), StickerDrop::at(20.0, 20.0))
            .unwrap();
        assert_eq!(composer.layers().len(), 2);

        composer.complete(pending.run()).unwrap();
        assert_eq!(composer.layers().len(), 1);
        assert_eq!(composer.surface().size(), SizePx::new(60, 60));
    }

    #[test]
    fn failed_base_decode_reports_decode_error() {
        let mut composer = composer_with_base(10, 10);
        let task = composer.request_base_image(b"nope".to_vec());
        assert!(matches!(
            composer.complete(task.run()),
            Err(ComposerError::Decode(_))
        ));
        assert_eq!(composer.surface().size(), SizePx::new(10, 10));
    }

    #[test]
    fn filter_updates_recompute_surface_without_drift() {
        let mut composer = composer_with_base(4, 4);
        let base = composer.layers().base().unwrap().id();
        let original = composer.layers().get(base).unwrap().raster().unwrap().clone();

        assert!(composer.set_parameter("brightness", 2.0).unwrap());
        assert_eq!(composer.surface().pixels().get_pixel(0, 0).0, [180, 180, 180, 255]);

        assert!(composer.set_parameter("brightness", 1.5).unwrap());
        assert!(!composer.set_parameter("brightness", 1.5).unwrap());
        assert_eq!(composer.surface().pixels().get_pixel(0, 0).0, [135, 135, 135, 255]);

        composer.set_parameter("brightness", 1.0).unwrap();
        assert_eq!(composer.surface().pixels().get_pixel(0, 0).0, [90, 90, 90, 255]);
        assert_eq!(composer.layers().get(base).unwrap().raster().unwrap(), &original);
    }

    #[test]
    fn repeated_parameter_matches_single_parameter() {
        let mut twice = composer_with_base(6, 6);
        twice.set_parameter("brightness", 1.5).unwrap();
        twice.set_parameter("brightness", 1.5).unwrap();

        let mut once = composer_with_base(6, 6);
        once.set_parameter("brightness", 1.5).unwrap();

        let base = twice.layers().base().unwrap().id();
        let once_base = once.layers().base().unwrap().id();
        assert_eq!(
            twice.apply_filters(base).unwrap(),
            once.apply_filters(once_base).unwrap()
        );
        assert_eq!(twice.surface().pixels(), once.surface().pixels());
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let mut composer = composer_with_base(4, 4);
        assert!(matches!(
            composer.set_parameter("sharpness", 1.0),
            Err(ComposerError::InvalidParameter(_))
        ));
        assert!(matches!(
            composer.set_parameter("noise", f32::NAN),
            Err(ComposerError::InvalidParameter(_))
        ));
        assert!(composer.filters().params().is_neutral());
    }

    #[test]
    fn filters_apply_to_stickers_but_not_text() {
        let mut composer = composer_with_base(20, 20);
        let sticker = composer
            .add_sticker(&png(4, 4, [50, 50, 50, 255]), StickerDrop::at(5.0, 5.0))
            .unwrap();
        let text = composer.add_text(Some("hi"), None).unwrap()[0];
        composer.set_filter(FilterKind::Brightness, 2.0).unwrap();

        assert_eq!(
            composer.apply_filters(sticker).unwrap().get_pixel(0, 0).0,
            [100, 100, 100, 255]
        );
        assert_eq!(
            composer.apply_filters(text),
            Err(ComposerError::NotFilterable(text))
        );
    }

    #[test]
    fn structural_ops_keep_base_first() {
        let mut composer = composer_with_base(30, 30);
        let a = composer
            .add_sticker(&png(2, 2, [0; 4]), StickerDrop::at(1.0, 1.0))
            .unwrap();
        let b = composer.add_svg_sticker(RED_SVG, StickerDrop::at(15.0, 15.0)).unwrap();
        composer.add_text(Some("x"), Some("y")).unwrap();

        composer.reorder(b, 1).unwrap();
        assert!(composer.reorder(a, 0).is_err());
        composer.remove_layer(a).unwrap();
        assert!(composer.layers().iter().next().unwrap().is_base());
        assert_eq!(composer.layers().index_of(b).unwrap(), 1);
    }

    #[test]
    fn svg_sticker_uses_default_size() {
        let mut composer = composer_with_base(400, 200);
        let id = composer.add_svg_sticker(RED_SVG, StickerDrop::at(100.0, 100.0)).unwrap();
        let layer = composer.layers().get(id).unwrap();
        assert_eq!(layer.raster().unwrap().dimensions(), SizePx::new(512, 512));
        // 0.25 * 200 = 50 pixels wide
        assert_eq!(layer.transform().scale_x(), 50.0 / 512.0);
        assert_eq!(composer.surface().pixels().get_pixel(100, 100).0, [255, 0, 0, 255]);
    }

    #[test]
    fn invalid_svg_is_decode_error() {
        let mut composer = composer_with_base(10, 10);
        assert!(matches!(
            composer.add_svg_sticker("<nope", StickerDrop::at(0.0, 0.0)),
            Err(ComposerError::Decode(_))
        ));
        assert_eq!(composer.layers().len(), 1);
    }

    #[test]
    fn snapped_sticker_lands_in_corner() {
        let mut composer = composer_with_base(100, 80);
        let id = composer
            .snap_sticker(&png(20, 20, [0, 255, 0, 255]), SnapPosition::BottomRight, 0.5)
            .unwrap();
        let layer = composer.layers().get(id).unwrap();
        assert_eq!(layer.transform().origin, Origin::BOTTOM_RIGHT);
        assert_eq!(composer.surface().pixels().get_pixel(95, 75).0, [0, 255, 0, 255]);
        assert_eq!(composer.surface().pixels().get_pixel(85, 65).0, [90, 90, 90, 255]);
    }

    #[test]
    fn oversized_sticker_fills_surface() {
        let mut composer = composer_with_base(100, 100);
        composer
            .add_sticker(
                &png(10, 10, [250, 10, 10, 255]),
                StickerDrop::at(50.0, 50.0).with_size(1e6),
            )
            .unwrap();
        assert!(composer.surface().pixels().pixels().all(|p| p.0 == [250, 10, 10, 255]));
        assert!(composer.export(ExportFormat::Png).is_ok());
    }

    #[test]
    fn moving_with_huge_scale_stays_cheap() {
        let mut composer = composer_with_base(64, 48);
        let id = composer
            .add_sticker(&png(8, 8, [0, 0, 250, 255]), StickerDrop::at(10.0, 10.0))
            .unwrap();
        let huge = Transform::new(Point::new(0.0, 0.0), Origin::TOP_LEFT, 1e6, 1e6).unwrap();
        composer.move_layer(id, huge).unwrap();
        assert_eq!(composer.surface().pixels().get_pixel(63, 47).0, [0, 0, 250, 255]);
    }

    #[test]
    fn move_layer_redraws() {
        let mut composer = composer_with_base(40, 40);
        let id = composer
            .add_sticker(&png(4, 4, [255, 255, 255, 255]), StickerDrop::at(5.0, 5.0).with_size(4.0))
            .unwrap();
        assert_eq!(composer.surface().pixels().get_pixel(5, 5).0, [255, 255, 255, 255]);

        let moved = Transform::anchored(Point::new(30.0, 30.0), Origin::CENTER).unwrap();
        composer.move_layer(id, moved).unwrap();
        assert_eq!(composer.surface().pixels().get_pixel(5, 5).0, [90, 90, 90, 255]);
        assert_eq!(composer.surface().pixels().get_pixel(30, 30).0, [255, 255, 255, 255]);
    }

    #[test]
    fn export_is_a_snapshot() {
        let mut composer = composer_with_base(8, 8);
        let before = composer.export(ExportFormat::Png).unwrap();
        composer.set_filter(FilterKind::Brightness, 2.0).unwrap();
        let after = composer.export(ExportFormat::Png).unwrap();

        let before = image::load_from_memory(&before).unwrap().to_rgba8();
        let after = image::load_from_memory(&after).unwrap().to_rgba8();
        assert_eq!(before.get_pixel(0, 0).0, [90, 90, 90, 255]);
        assert_eq!(after.get_pixel(0, 0).0, [180, 180, 180, 255]);
    }

    #[test]
    fn config_drives_session() {
        let mut config = ComposerConfig::default();
        config.sticker_fraction = 0.5;
        config.captions.top_inset = 5.0;
        config.filters.brightness = 2.0;
        let mut composer = Composer::new(config).unwrap();
        composer.set_base_image(&png(100, 60, [50, 50, 50, 255])).unwrap();

        assert_eq!(composer.surface().pixels().get_pixel(0, 0).0, [100, 100, 100, 255]);
        let sticker = composer
            .add_sticker(&png(10, 10, [0, 0, 0, 255]), StickerDrop::at(50.0, 30.0))
            .unwrap();
        assert_eq!(composer.layers().get(sticker).unwrap().transform().scale_x(), 3.0);
        let caption = composer.add_text(Some("t"), None).unwrap()[0];
        assert_eq!(
            composer.layers().get(caption).unwrap().transform().position,
            Point::new(50.0, 5.0)
        );
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = ComposerConfig::default();
        config.sticker_fraction = -1.0;
        assert!(matches!(Composer::new(config), Err(ComposerError::Config(_))));
    }

    #[test]
    fn settings_apply_and_export() {
        let mut composer = composer_with_base(4, 4);
        let settings = FilterSettings {
            brightness: 1.2,
            contrast: 0.9,
            saturation: 1.5,
            noise: 10.0,
        };
        composer.apply_settings(&settings).unwrap();
        assert_eq!(composer.export_settings(), settings);

        let bad = FilterSettings {
            noise: -3.0,
            ..settings
        };
        assert!(composer.apply_settings(&bad).is_err());
        assert_eq!(composer.export_settings(), settings);
    }
}
