//! The render surface: the flattened composition of every layer.
//!
//! [`RenderSurface::recompute`] walks the layer stack in order and draws each
//! layer over the previous ones with source-over blending. Three per-layer
//! caches sit in front of the compositor:
//!
//! - filtered image buffers, stamped with the filter chain version;
//! - rasterised caption bands, stamped with the surface width;
//! - resampled buffers for scaled layers, keyed by the source stamp and the
//!   drawn size.
//!
//! A parameter change therefore invalidates exactly the filtered buffers
//! (and their scaled copies) and nothing else.
//!
//! Resampling work is bounded by the surface and the source, never by the
//! drawn size alone: a layer blown up far past both is sampled only where it
//! lands on the surface.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::error::ComposerResult;
use crate::filter::FilterChain;
use crate::layer::{Layer, LayerId, LayerSource, LayerStack};
use crate::raster::SizePx;

/// A cached layer buffer and the key it was produced for.
#[derive(Debug, Clone)]
struct CachedBuffer<K> {
    image: RgbaImage,
    key: K,
}

type Cache<K> = HashMap<LayerId, CachedBuffer<K>>;

/// Returns the cached buffer for `id`, producing it again if `key` changed.
fn cached<K, E>(
    cache: &mut Cache<K>,
    id: LayerId,
    key: K,
    produce: impl FnOnce() -> Result<RgbaImage, E>,
) -> Result<&RgbaImage, E>
where
    K: PartialEq,
{
    match cache.entry(id) {
        Entry::Occupied(mut entry) => {
            if entry.get().key != key {
                entry.insert(CachedBuffer {
                    image: produce()?,
                    key,
                });
            }
            Ok(&entry.into_mut().image)
        }
        Entry::Vacant(entry) => Ok(&entry
            .insert(CachedBuffer {
                image: produce()?,
                key,
            })
            .image),
    }
}

/// Flattened pixels of the current composition.
#[derive(Debug, Clone, Default)]
pub struct RenderSurface {
    pixels: RgbaImage,
    filtered: Cache<u64>,
    glyphs: Cache<u64>,
    scaled: Cache<(u64, SizePx)>,
}

impl RenderSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Surface dimensions in pixels.
    pub fn size(&self) -> SizePx {
        SizePx::new(self.pixels.width(), self.pixels.height())
    }

    /// Borrows the flattened buffer.
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Returns an owned copy of the flattened buffer.
    pub fn snapshot(&self) -> RgbaImage {
        self.pixels.clone()
    }

    /// Redraws the surface from the layer stack and filter chain.
    #[tracing::instrument(level = "debug", skip_all, fields(layers = stack.len()))]
    pub fn recompute(&mut self, stack: &LayerStack, chain: &FilterChain) {
        let size = stack.surface_size();
        let live = |id: &LayerId| stack.get(*id).is_some();
        self.filtered.retain(|id, _| live(id));
        self.glyphs.retain(|id, _| live(id));
        self.scaled.retain(|id, _| live(id));

        let mut canvas = RgbaImage::new(size.width, size.height);
        for layer in stack {
            let source = match layer.source() {
                LayerSource::Image(raster) => {
                    let stamp = chain.version();
                    let image = cached(&mut self.filtered, layer.id(), stamp, || {
                        ComposerResult::Ok(chain.apply_to(raster.pixels()))
                    });
                    image.map(|image| (image, stamp))
                }
                LayerSource::Text(spec) => {
                    // caption bands span the surface, so they depend on its width
                    let stamp = u64::from(size.width);
                    cached(&mut self.glyphs, layer.id(), stamp, || spec.render(size.width))
                        .map(|image| (image, stamp))
                }
            };
            match source {
                Ok((pixels, stamp)) => draw_layer(&mut canvas, &mut self.scaled, layer, pixels, stamp),
                Err(err) => {
                    tracing::warn!(layer = %layer.id(), %err, "layer could not be rasterised");
                }
            }
        }
        self.pixels = canvas;
    }
}

fn area(size: SizePx) -> u64 {
    u64::from(size.width) * u64::from(size.height)
}

/// Draws a layer's pixels at its transform.
fn draw_layer(
    canvas: &mut RgbaImage,
    scaled: &mut Cache<(u64, SizePx)>,
    layer: &Layer,
    pixels: &RgbaImage,
    stamp: u64,
) {
    let native = SizePx::new(pixels.width(), pixels.height());
    if native.is_empty() {
        return;
    }
    let transform = layer.transform();
    let drawn = transform.scaled_size(native);
    let (x, y) = transform.top_left(native);

    if drawn == native {
        scaled.remove(&layer.id());
        composite_over(canvas, pixels, x, y);
        return;
    }

    let budget = area(native).max(area(SizePx::new(canvas.width(), canvas.height())));
    if area(drawn) <= budget {
        let resized = cached(scaled, layer.id(), (stamp, drawn), || {
            ComposerResult::Ok(imageops::resize(
                pixels,
                drawn.width,
                drawn.height,
                FilterType::Triangle,
            ))
        });
        if let Ok(resized) = resized {
            composite_over(canvas, resized, x, y);
        }
    } else {
        scaled.remove(&layer.id());
        composite_sampled(canvas, pixels, drawn, x, y);
    }
}

/// Composites a source image onto a destination image at the specified position.
///
/// Uses standard alpha blending (source over destination). Pixels falling
/// outside the destination are clipped.
pub fn composite_over(dest: &mut RgbaImage, src: &RgbaImage, x: i32, y: i32) {
    let dest_width = dest.width() as i64;
    let dest_height = dest.height() as i64;

    for (sx, sy, src_pixel) in src.enumerate_pixels() {
        let dx = x as i64 + sx as i64;
        let dy = y as i64 + sy as i64;

        if dx < 0 || dy < 0 || dx >= dest_width || dy >= dest_height {
            continue;
        }

        let dst_pixel = dest.get_pixel_mut(dx as u32, dy as u32);
        *dst_pixel = alpha_blend(*src_pixel, *dst_pixel);
    }
}

/// Range of destination coordinates covered by `len` pixels starting at
/// `offset`, clipped to `0..bound`.
fn visible_span(offset: i32, len: u32, bound: u32) -> std::ops::Range<u32> {
    let start = i64::from(offset).clamp(0, i64::from(bound));
    let end = (i64::from(offset) + i64::from(len)).clamp(0, i64::from(bound));
    start as u32..end as u32
}

/// Composites `src` stretched to `drawn` at (`x`, `y`), sampling only the
/// destination pixels the stretched box covers.
fn composite_sampled(dest: &mut RgbaImage, src: &RgbaImage, drawn: SizePx, x: i32, y: i32) {
    let step_x = src.width() as f32 / drawn.width as f32;
    let step_y = src.height() as f32 / drawn.height as f32;

    for dy in visible_span(y, drawn.height, dest.height()) {
        let v = ((i64::from(dy) - i64::from(y)) as f32 + 0.5) * step_y - 0.5;
        for dx in visible_span(x, drawn.width, dest.width()) {
            let u = ((i64::from(dx) - i64::from(x)) as f32 + 0.5) * step_x - 0.5;
            let dst_pixel = dest.get_pixel_mut(dx, dy);
            *dst_pixel = alpha_blend(sample_bilinear(src, u, v), *dst_pixel);
        }
    }
}

/// Bilinear sample at source coordinates `(u, v)`, clamped to the edges.
/// `src` must not be empty.
fn sample_bilinear(src: &RgbaImage, u: f32, v: f32) -> Rgba<u8> {
    let max_x = src.width() - 1;
    let max_y = src.height() - 1;
    let u = u.clamp(0.0, max_x as f32);
    let v = v.clamp(0.0, max_y as f32);

    let (x0, y0) = (u.floor() as u32, v.floor() as u32);
    let (x1, y1) = ((x0 + 1).min(max_x), (y0 + 1).min(max_y));
    let (fx, fy) = (u - x0 as f32, v - y0 as f32);

    let tl = src.get_pixel(x0, y0).0;
    let tr = src.get_pixel(x1, y0).0;
    let bl = src.get_pixel(x0, y1).0;
    let br = src.get_pixel(x1, y1).0;
    Rgba(std::array::from_fn(|i| {
        let top = f32::from(tl[i]) * (1.0 - fx) + f32::from(tr[i]) * fx;
        let bottom = f32::from(bl[i]) * (1.0 - fx) + f32::from(br[i]) * fx;
        (top * (1.0 - fy) + bottom * fy).round() as u8
    }))
}

/// Alpha blends two RGBA pixels (source over destination).
fn alpha_blend(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    if src[3] == 255 {
        return src;
    }
    if src[3] == 0 {
        return dst;
    }

    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);

    let blend = |s: u8, d: u8| -> u8 {
        let sf = s as f32 / 255.0;
        let df = d as f32 / 255.0;
        let out = (sf * sa + df * da * (1.0 - sa)) / out_a;
        (out * 255.0).round() as u8
    };

    Rgba([
        blend(src[0], dst[0]),
        blend(src[1], dst[1]),
        blend(src[2], dst[2]),
        (out_a * 255.0).round() as u8,
    ])
}
