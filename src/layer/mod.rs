//! The layer model.
//!
//! A [`LayerStack`] is the ordered sequence of everything drawn on the
//! surface: an optional base image at index 0 followed by stickers and
//! captions in insertion order. The stack owns every layer and its source
//! pixels; filters and the render surface only ever borrow them.
//!
//! # Invariants
//!
//! - At most one layer has [`LayerRole::Base`], and when present it sits at
//!   index 0, is not interactive, and uses [`Transform::IDENTITY`].
//! - The surface size always equals the base raster's size.
//! - Every structural operation is all-or-nothing.

pub mod svg;
pub mod text;

pub use svg::SvgSource;
pub use text::{TextAlign, TextSpec, TextStyle};

use std::fmt;

use crate::error::{ComposerError, ComposerResult};
use crate::raster::{Raster, SizePx};
use crate::transform::Transform;

// ============================================================================
// Identity
// ============================================================================

/// Stable identity of a layer within a session. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u64);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether a layer is the base image or something placed over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerRole {
    Base,
    Overlay,
}

/// Coarse layer kind, derived from the pixel source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Image,
    Text,
}

/// Where a layer's pixels come from.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerSource {
    /// A decoded raster. Never modified after the layer is created.
    Image(Raster),
    /// Caption text, rasterised on demand from its style.
    Text(TextSpec),
}

// ============================================================================
// Layer
// ============================================================================

/// One composable visual element.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    id: LayerId,
    role: LayerRole,
    source: LayerSource,
    transform: Transform,
    selectable: bool,
    evented: bool,
}

impl Layer {
    /// Identity of the layer within its session.
    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn role(&self) -> LayerRole {
        self.role
    }

    pub fn is_base(&self) -> bool {
        self.role == LayerRole::Base
    }

    /// Whether the layer draws a raster or a caption.
    pub fn kind(&self) -> LayerKind {
        match self.source {
            LayerSource::Image(_) => LayerKind::Image,
            LayerSource::Text(_) => LayerKind::Text,
        }
    }

    /// Placement on the surface. Always [`Transform::IDENTITY`] for the base.
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn source(&self) -> &LayerSource {
        &self.source
    }

    /// Returns the source raster for image layers.
    pub fn raster(&self) -> Option<&Raster> {
        match &self.source {
            LayerSource::Image(raster) => Some(raster),
            LayerSource::Text(_) => None,
        }
    }

    /// Returns the caption for text layers.
    pub fn text(&self) -> Option<&TextSpec> {
        match &self.source {
            LayerSource::Text(spec) => Some(spec),
            LayerSource::Image(_) => None,
        }
    }

    /// Only image layers go through the filter chain.
    pub fn is_filterable(&self) -> bool {
        self.kind() == LayerKind::Image
    }

    /// Whether the layer can become the active layer.
    pub fn is_selectable(&self) -> bool {
        self.selectable
    }

    /// Whether the layer receives pointer interaction.
    pub fn is_evented(&self) -> bool {
        self.evented
    }
}

// ============================================================================
// LayerStack
// ============================================================================

/// The ordered layer sequence plus the surface size it is drawn into.
#[derive(Debug, Clone, Default)]
pub struct LayerStack {
    layers: Vec<Layer>,
    surface: SizePx,
    active: Option<LayerId>,
    next_id: u64,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> LayerId {
        self.next_id += 1;
        LayerId(self.next_id)
    }

    /// Replaces the base image, discarding every other layer.
    ///
    /// Overlay geometry is expressed in the old surface's coordinates, so
    /// nothing survives a base change. The surface is resized to the raster.
    pub fn set_base(&mut self, raster: Raster) -> LayerId {
        let id = self.allocate_id();
        self.surface = raster.dimensions();
        self.active = None;
        self.layers.clear();
        self.layers.push(Layer {
            id,
            role: LayerRole::Base,
            source: LayerSource::Image(raster),
            transform: Transform::IDENTITY,
            selectable: false,
            evented: false,
        });
        id
    }

    fn push_overlay(&mut self, source: LayerSource, transform: Transform) -> LayerId {
        let id = self.allocate_id();
        self.layers.push(Layer {
            id,
            role: LayerRole::Overlay,
            source,
            transform,
            selectable: true,
            evented: true,
        });
        id
    }

    /// Appends a sticker and makes it the active layer.
    pub fn push_sticker(&mut self, raster: Raster, transform: Transform) -> LayerId {
        let id = self.push_overlay(LayerSource::Image(raster), transform);
        self.active = Some(id);
        id
    }

    /// Appends a caption layer.
    pub fn push_text(&mut self, spec: TextSpec, transform: Transform) -> LayerId {
        self.push_overlay(LayerSource::Text(spec), transform)
    }

    /// Removes a layer, returning it.
    pub fn remove(&mut self, id: LayerId) -> ComposerResult<Layer> {
        let index = self.index_of(id)?;
        if self.active == Some(id) {
            self.active = None;
        }
        Ok(self.layers.remove(index))
    }

    /// Moves a layer to `new_index` in the sequence.
    ///
    /// The base image cannot be moved, and nothing can be moved in front of it.
    pub fn reorder(&mut self, id: LayerId, new_index: usize) -> ComposerResult<()> {
        let index = self.index_of(id)?;
        if self.layers[index].is_base() {
            return Err(ComposerError::invalid_reorder(format!(
                "base layer {id} is always first"
            )));
        }
        if self.has_base() && new_index == 0 {
            return Err(ComposerError::invalid_reorder(format!(
                "layer {id} cannot be placed before the base image"
            )));
        }
        if new_index >= self.layers.len() {
            return Err(ComposerError::invalid_reorder(format!(
                "index {new_index} is out of range for {} layers",
                self.layers.len()
            )));
        }
        let layer = self.layers.remove(index);
        self.layers.insert(new_index, layer);
        Ok(())
    }

    /// Marks a layer as active. Non-selectable layers are rejected.
    pub fn select(&mut self, id: LayerId) -> ComposerResult<()> {
        let layer = self.get(id).ok_or(ComposerError::UnknownLayer(id))?;
        if !layer.is_selectable() {
            return Err(ComposerError::invalid_parameter(format!(
                "layer {id} is not selectable"
            )));
        }
        self.active = Some(id);
        Ok(())
    }

    /// Updates an overlay's transform. The base transform is fixed.
    pub fn set_transform(&mut self, id: LayerId, transform: Transform) -> ComposerResult<()> {
        let index = self.index_of(id)?;
        let layer = &mut self.layers[index];
        if layer.is_base() {
            return Err(ComposerError::invalid_parameter(format!(
                "base layer {id} cannot be transformed"
            )));
        }
        layer.transform = transform;
        Ok(())
    }

    /// Position of a layer in drawing order.
    pub fn index_of(&self, id: LayerId) -> ComposerResult<usize> {
        self.layers
            .iter()
            .position(|l| l.id == id)
            .ok_or(ComposerError::UnknownLayer(id))
    }

    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    /// The base image layer, if one is loaded.
    pub fn base(&self) -> Option<&Layer> {
        self.layers.first().filter(|l| l.is_base())
    }

    pub fn has_base(&self) -> bool {
        self.base().is_some()
    }

    /// The selected layer, if any.
    pub fn active(&self) -> Option<LayerId> {
        self.active
    }

    /// Surface size, set by the last base image; zero before any is loaded.
    pub fn surface_size(&self) -> SizePx {
        self.surface
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Layers in drawing order, bottom first.
    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }
}

impl<'a> IntoIterator for &'a LayerStack {
    type Item = &'a Layer;
    type IntoIter = std::slice::Iter<'a, Layer>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers.iter()
    }
}
