//! Standard pixel adjustments.
//!
//! Channels are normalised to `[0, 1]`. Brightness, contrast and saturation
//! are multiplicative around a neutral 1.0; noise is an additive intensity in
//! 8-bit channel units with a neutral 0.0.

use palette::{Hsl, IntoColor, Srgb};

use super::{Adjustment, FilterKind, PixelContext};

/// `v * amount`
#[derive(Debug, Clone, Copy, Default)]
pub struct Brightness;

impl Adjustment for Brightness {
    fn kind(&self) -> FilterKind {
        FilterKind::Brightness
    }

    fn adjust(&self, rgb: [f32; 3], amount: f32, _ctx: PixelContext) -> [f32; 3] {
        rgb.map(|v| v * amount)
    }
}

/// `(v - 0.5) * amount + 0.5`
#[derive(Debug, Clone, Copy, Default)]
pub struct Contrast;

impl Adjustment for Contrast {
    fn kind(&self) -> FilterKind {
        FilterKind::Contrast
    }

    fn adjust(&self, rgb: [f32; 3], amount: f32, _ctx: PixelContext) -> [f32; 3] {
        rgb.map(|v| (v - 0.5) * amount + 0.5)
    }
}

/// Scales HSL saturation by `amount`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Saturation;

impl Adjustment for Saturation {
    fn kind(&self) -> FilterKind {
        FilterKind::Saturation
    }

    fn adjust(&self, rgb: [f32; 3], amount: f32, _ctx: PixelContext) -> [f32; 3] {
        let [r, g, b] = rgb;
        let mut hsl: Hsl = Srgb::new(r, g, b).into_color();
        hsl.saturation = (hsl.saturation * amount).clamp(0.0, 1.0);
        let out: Srgb = hsl.into_color();
        [out.red, out.green, out.blue]
    }
}

/// Monochrome uniform noise: every channel of a pixel gets the same offset
/// in `[-amount / 2, amount / 2)` (8-bit units).
///
/// The offset is a hash of the pixel position and the chain's seed, so the
/// same parameters always produce the same grain.
#[derive(Debug, Clone, Copy, Default)]
pub struct Noise;

impl Adjustment for Noise {
    fn kind(&self) -> FilterKind {
        FilterKind::Noise
    }

    fn adjust(&self, rgb: [f32; 3], amount: f32, ctx: PixelContext) -> [f32; 3] {
        let offset = (0.5 - hash_f32(ctx.x, ctx.y, ctx.seed)) * amount / 255.0;
        rgb.map(|v| v + offset)
    }
}

#[inline]
fn hash_u32(mut x: u32) -> u32 {
    x = x.wrapping_mul(0x9E3779B9);
    x ^= x >> 16;
    x = x.wrapping_mul(0x85EBCA6B);
    x ^= x >> 13;
    x = x.wrapping_mul(0xC2B2AE35);
    x ^= x >> 16;
    x
}

/// Hash to f32 in [0, 1).
fn hash_f32(x: u32, y: u32, seed: u32) -> f32 {
    let h = hash_u32(
        x.wrapping_mul(374761393)
            .wrapping_add(y.wrapping_mul(668265263))
            .wrapping_add(seed),
    );
    (h & 0x00FF_FFFF) as f32 / 16_777_216.0
}
