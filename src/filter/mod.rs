//! The filter chain.
//!
//! A [`FilterChain`] holds four scalar parameters and produces a filtered
//! copy of an image layer's source pixels. Operations always run in the
//! fixed order brightness → contrast → saturation → noise, and the output is
//! a pure function of the source buffer, the parameters and the noise seed:
//! re-running an unchanged chain yields bit-identical pixels, and the source
//! is never written to.
//!
//! Each operation is an [`Adjustment`] trait object, so callers can swap a
//! standard formula for their own with [`FilterChain::with_adjustment`].

pub mod adjust;

use std::fmt;
use std::str::FromStr;

use image::RgbaImage;

use crate::error::{ComposerError, ComposerResult};
use crate::layer::{LayerId, LayerStack};

// ============================================================================
// FilterKind
// ============================================================================

/// The named filter operations, in application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Brightness,
    Contrast,
    Saturation,
    Noise,
}

impl FilterKind {
    /// Application order of the chain.
    pub const ORDER: [FilterKind; 4] = [
        FilterKind::Brightness,
        FilterKind::Contrast,
        FilterKind::Saturation,
        FilterKind::Noise,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Brightness => "brightness",
            Self::Contrast => "contrast",
            Self::Saturation => "saturation",
            Self::Noise => "noise",
        }
    }

    /// The parameter value that leaves pixels unchanged.
    pub fn neutral(&self) -> f32 {
        match self {
            Self::Noise => 0.0,
            _ => 1.0,
        }
    }

    fn index(&self) -> usize {
        match self {
            Self::Brightness => 0,
            Self::Contrast => 1,
            Self::Saturation => 2,
            Self::Noise => 3,
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterKind {
    type Err = ComposerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterKind::ORDER
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ComposerError::invalid_parameter(format!("unknown filter {s:?}")))
    }
}

// ============================================================================
// FilterParams
// ============================================================================

/// The four filter parameters. Always valid: finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    brightness: f32,
    contrast: f32,
    saturation: f32,
    noise: f32,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            contrast: 1.0,
            saturation: 1.0,
            noise: 0.0,
        }
    }
}

impl FilterParams {
    /// Builds a validated parameter set.
    pub fn new(brightness: f32, contrast: f32, saturation: f32, noise: f32) -> ComposerResult<Self> {
        let mut params = Self::default();
        params.set(FilterKind::Brightness, brightness)?;
        params.set(FilterKind::Contrast, contrast)?;
        params.set(FilterKind::Saturation, saturation)?;
        params.set(FilterKind::Noise, noise)?;
        Ok(params)
    }

    pub fn get(&self, kind: FilterKind) -> f32 {
        match kind {
            FilterKind::Brightness => self.brightness,
            FilterKind::Contrast => self.contrast,
            FilterKind::Saturation => self.saturation,
            FilterKind::Noise => self.noise,
        }
    }

    /// Sets one parameter. Returns true if the value changed.
    pub fn set(&mut self, kind: FilterKind, value: f32) -> ComposerResult<bool> {
        if !(value.is_finite() && value >= 0.0) {
            return Err(ComposerError::invalid_parameter(format!(
                "{kind} must be finite and non-negative, got {value}"
            )));
        }
        let slot = match kind {
            FilterKind::Brightness => &mut self.brightness,
            FilterKind::Contrast => &mut self.contrast,
            FilterKind::Saturation => &mut self.saturation,
            FilterKind::Noise => &mut self.noise,
        };
        if *slot == value {
            return Ok(false);
        }
        *slot = value;
        Ok(true)
    }

    /// Returns true if every parameter is at its neutral value.
    pub fn is_neutral(&self) -> bool {
        FilterKind::ORDER.iter().all(|k| self.get(*k) == k.neutral())
    }
}

// ============================================================================
// Adjustment
// ============================================================================

/// Position information handed to every adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelContext {
    pub x: u32,
    pub y: u32,
    pub seed: u32,
}

/// A single per-pixel operation of the chain.
///
/// `adjust` receives normalised RGB channels and must be a pure function of
/// its arguments; the chain clamps the result to `[0, 1]`.
pub trait Adjustment: Send + Sync {
    fn kind(&self) -> FilterKind;

    fn adjust(&self, rgb: [f32; 3], amount: f32, ctx: PixelContext) -> [f32; 3];
}

// ============================================================================
// FilterChain
// ============================================================================

/// Ordered, parameterised adjustment chain applied to image layers.
pub struct FilterChain {
    params: FilterParams,
    stages: [Box<dyn Adjustment>; 4],
    seed: u32,
    version: u64,
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::new(0)
    }
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("params", &self.params)
            .field("seed", &self.seed)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl FilterChain {
    /// Creates a neutral chain with the standard formulas.
    pub fn new(seed: u32) -> Self {
        Self {
            params: FilterParams::default(),
            stages: [
                Box::new(adjust::Brightness),
                Box::new(adjust::Contrast),
                Box::new(adjust::Saturation),
                Box::new(adjust::Noise),
            ],
            seed,
            version: 0,
        }
    }

    /// Replaces the formula used for one operation.
    pub fn with_adjustment(mut self, adjustment: Box<dyn Adjustment>) -> Self {
        let index = adjustment.kind().index();
        self.stages[index] = adjustment;
        self.version = self.version.wrapping_add(1);
        self
    }

    pub fn params(&self) -> &FilterParams {
        &self.params
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Increments whenever the chain's output could change.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Sets one parameter. Returns true if it changed.
    ///
    /// Setting the current value again is a no-op and leaves the version alone.
    pub fn set_parameter(&mut self, kind: FilterKind, value: f32) -> ComposerResult<bool> {
        let changed = self.params.set(kind, value)?;
        if changed {
            self.version = self.version.wrapping_add(1);
        }
        Ok(changed)
    }

    /// Replaces every parameter at once. Returns true if anything changed.
    pub fn set_params(&mut self, params: FilterParams) -> bool {
        if self.params == params {
            return false;
        }
        self.params = params;
        self.version = self.version.wrapping_add(1);
        true
    }

    /// Resets every parameter to neutral.
    pub fn reset(&mut self) -> bool {
        self.set_params(FilterParams::default())
    }

    /// Filters a layer of `stack`.
    ///
    /// Fails with [`ComposerError::EmptyCanvas`] when the stack has no layers
    /// and [`ComposerError::NotFilterable`] for text layers.
    pub fn apply(&self, stack: &LayerStack, id: LayerId) -> ComposerResult<RgbaImage> {
        if stack.is_empty() {
            return Err(ComposerError::empty_canvas(
                "load a base image before applying filters",
            ));
        }
        let layer = stack.get(id).ok_or(ComposerError::UnknownLayer(id))?;
        let raster = layer.raster().ok_or(ComposerError::NotFilterable(id))?;
        Ok(self.apply_to(raster.pixels()))
    }

    /// Produces a filtered copy of `source`.
    pub fn apply_to(&self, source: &RgbaImage) -> RgbaImage {
        let mut out = source.clone();
        let active: Vec<(&dyn Adjustment, f32)> = FilterKind::ORDER
            .iter()
            .map(|k| (k, self.params.get(*k)))
            .filter(|(k, amount)| *amount != k.neutral())
            .map(|(k, amount)| (self.stages[k.index()].as_ref(), amount))
            .collect();
        if active.is_empty() {
            return out;
        }

        for (x, y, pixel) in out.enumerate_pixels_mut() {
            let [r, g, b, a] = pixel.0;
            if a == 0 {
                continue;
            }
            let ctx = PixelContext {
                x,
                y,
                seed: self.seed,
            };
            let mut rgb = [r, g, b].map(|c| c as f32 / 255.0);
            for (stage, amount) in &active {
                rgb = stage.adjust(rgb, *amount, ctx).map(|c| c.clamp(0.0, 1.0));
            }
            let [r, g, b] = rgb.map(|c| (c * 255.0).round() as u8);
            pixel.0 = [r, g, b, a];
        }
        out
    }
}
