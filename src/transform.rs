//! Placement and scaling math for layers.
//!
//! Everything here is pure: pointer positions and asset sizes go in, a
//! [`Transform`] comes out. All coordinates are in surface space, i.e. the
//! pixel grid of the base image.

use crate::error::{ComposerError, ComposerResult};
use crate::raster::SizePx;

/// Fraction of the surface's smaller side used as the default sticker size.
pub const DEFAULT_STICKER_FRACTION: f32 = 0.25;

/// A point in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

// ============================================================================
// Origin
// ============================================================================

/// Horizontal anchor of a layer's bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HAnchor {
    Left,
    Center,
    Right,
}

/// Vertical anchor of a layer's bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAnchor {
    Top,
    Center,
    Bottom,
}

/// Which point of a layer's bounding box its position refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    pub x: HAnchor,
    pub y: VAnchor,
}

impl Origin {
    pub const TOP_LEFT: Self = Self::new(HAnchor::Left, VAnchor::Top);
    pub const TOP_CENTER: Self = Self::new(HAnchor::Center, VAnchor::Top);
    pub const TOP_RIGHT: Self = Self::new(HAnchor::Right, VAnchor::Top);
    pub const CENTER: Self = Self::new(HAnchor::Center, VAnchor::Center);
    pub const BOTTOM_LEFT: Self = Self::new(HAnchor::Left, VAnchor::Bottom);
    pub const BOTTOM_CENTER: Self = Self::new(HAnchor::Center, VAnchor::Bottom);
    pub const BOTTOM_RIGHT: Self = Self::new(HAnchor::Right, VAnchor::Bottom);

    pub const fn new(x: HAnchor, y: VAnchor) -> Self {
        Self { x, y }
    }

    /// Offset of the anchor from the top-left corner, as fractions of the box.
    fn fractions(&self) -> (f32, f32) {
        let fx = match self.x {
            HAnchor::Left => 0.0,
            HAnchor::Center => 0.5,
            HAnchor::Right => 1.0,
        };
        let fy = match self.y {
            VAnchor::Top => 0.0,
            VAnchor::Center => 0.5,
            VAnchor::Bottom => 1.0,
        };
        (fx, fy)
    }
}

// ============================================================================
// Transform
// ============================================================================

/// Geometric state of a layer: position, anchor and scale.
///
/// Scale factors are always positive and finite; the constructors reject
/// anything else.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Point,
    pub origin: Origin,
    scale_x: f32,
    scale_y: f32,
}

impl Transform {
    /// The identity placement used by the base image.
    pub const IDENTITY: Self = Self {
        position: Point { x: 0.0, y: 0.0 },
        origin: Origin::TOP_LEFT,
        scale_x: 1.0,
        scale_y: 1.0,
    };

    pub fn new(
        position: Point,
        origin: Origin,
        scale_x: f32,
        scale_y: f32,
    ) -> ComposerResult<Self> {
        if !position.x.is_finite() || !position.y.is_finite() {
            return Err(ComposerError::invalid_parameter(format!(
                "position ({}, {}) is not finite",
                position.x, position.y
            )));
        }
        for scale in [scale_x, scale_y] {
            if !(scale.is_finite() && scale > 0.0) {
                return Err(ComposerError::invalid_parameter(format!(
                    "scale {scale} must be positive and finite"
                )));
            }
        }
        Ok(Self {
            position,
            origin,
            scale_x,
            scale_y,
        })
    }

    /// An unscaled transform anchored at `origin`.
    pub fn anchored(position: Point, origin: Origin) -> ComposerResult<Self> {
        Self::new(position, origin, 1.0, 1.0)
    }

    pub fn scale_x(&self) -> f32 {
        self.scale_x
    }

    pub fn scale_y(&self) -> f32 {
        self.scale_y
    }

    /// Size of the drawn box for a source of the given native size.
    ///
    /// Never collapses a non-empty source to zero pixels.
    pub fn scaled_size(&self, native: SizePx) -> SizePx {
        let scale = |len: u32, factor: f32| ((len as f32 * factor).round() as u32).max(1);
        SizePx::new(
            scale(native.width, self.scale_x),
            scale(native.height, self.scale_y),
        )
    }

    /// Top-left corner of the drawn box in surface coordinates.
    pub fn top_left(&self, native: SizePx) -> (i32, i32) {
        let drawn = self.scaled_size(native);
        let (fx, fy) = self.origin.fractions();
        let left = self.position.x - drawn.width as f32 * fx;
        let top = self.position.y - drawn.height as f32 * fy;
        (left.round() as i32, top.round() as i32)
    }
}

// ============================================================================
// Placement
// ============================================================================

/// Computes the transform for a sticker dropped at `pointer`.
///
/// The sticker is scaled uniformly so that its native width becomes
/// `target_max_dimension`, and is centered on the drop point.
pub fn placement_transform(
    pointer: Point,
    native: SizePx,
    target_max_dimension: f32,
) -> ComposerResult<Transform> {
    if native.is_empty() {
        return Err(ComposerError::invalid_asset(format!(
            "sticker has degenerate size {}x{}",
            native.width, native.height
        )));
    }
    if !(target_max_dimension.is_finite() && target_max_dimension > 0.0) {
        return Err(ComposerError::invalid_parameter(format!(
            "target size {target_max_dimension} must be positive and finite"
        )));
    }
    let scale = target_max_dimension / native.width as f32;
    Transform::new(pointer, Origin::CENTER, scale, scale)
}

/// Default sticker size for a surface: a quarter of its smaller side.
pub fn default_sticker_size(surface_width: u32, surface_height: u32) -> f32 {
    sticker_size(surface_width, surface_height, DEFAULT_STICKER_FRACTION)
}

/// Sticker size as a fraction of the surface's smaller side.
pub fn sticker_size(surface_width: u32, surface_height: u32, fraction: f32) -> f32 {
    fraction * surface_width.min(surface_height) as f32
}

/// Preset sticker positions on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

/// Places a sticker at a preset position with a uniform scale factor.
///
/// The matching corner (or center) of the sticker is pinned to the same
/// corner (or center) of the surface, so the sticker always stays inside it
/// when it is smaller than the surface.
pub fn snap_placement(
    position: SnapPosition,
    surface: SizePx,
    native: SizePx,
    scale: f32,
) -> ComposerResult<Transform> {
    if native.is_empty() {
        return Err(ComposerError::invalid_asset(format!(
            "sticker has degenerate size {}x{}",
            native.width, native.height
        )));
    }
    let w = surface.width as f32;
    let h = surface.height as f32;
    let (point, origin) = match position {
        SnapPosition::TopLeft => (Point::new(0.0, 0.0), Origin::TOP_LEFT),
        SnapPosition::TopRight => (Point::new(w, 0.0), Origin::TOP_RIGHT),
        SnapPosition::BottomLeft => (Point::new(0.0, h), Origin::BOTTOM_LEFT),
        SnapPosition::BottomRight => (Point::new(w, h), Origin::BOTTOM_RIGHT),
        SnapPosition::Center => (Point::new(w / 2.0, h / 2.0), Origin::CENTER),
    };
    Transform::new(point, origin, scale, scale)
}
