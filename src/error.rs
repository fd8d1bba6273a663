//! Error type shared by every composer operation.

use crate::layer::LayerId;

pub type ComposerResult<T> = Result<T, ComposerError>;

/// Errors reported by the composer.
///
/// Every variant is recoverable: the operation that produced it leaves the
/// session exactly as it was before the call.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ComposerError {
    /// The asset has zero or otherwise degenerate dimensions.
    #[error("invalid asset: {0}")]
    InvalidAsset(String),

    /// The supplied bytes could not be decoded into a raster.
    #[error("decode error: {0}")]
    Decode(String),

    /// The operation needs at least one layer (or a base image).
    #[error("empty canvas: {0}")]
    EmptyCanvas(String),

    /// A decode completion arrived for an asset slot that has been superseded.
    #[error("stale {slot} decode (generation {generation}, current {current})")]
    StaleOperation {
        slot: &'static str,
        generation: u64,
        current: u64,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("unknown layer {0}")]
    UnknownLayer(LayerId),

    #[error("invalid reorder: {0}")]
    InvalidReorder(String),

    #[error("layer {0} is not filterable")]
    NotFilterable(LayerId),

    #[error("export error: {0}")]
    Export(String),

    #[error("config error: {0}")]
    Config(String),
}

impl ComposerError {
    pub fn invalid_asset(msg: impl Into<String>) -> Self {
        Self::InvalidAsset(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn empty_canvas(msg: impl Into<String>) -> Self {
        Self::EmptyCanvas(msg.into())
    }

    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub fn invalid_reorder(msg: impl Into<String>) -> Self {
        Self::InvalidReorder(msg.into())
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns true for errors caused by a superseded asynchronous decode.
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleOperation { .. })
    }
}

impl From<image::ImageError> for ComposerError {
    fn from(err: image::ImageError) -> Self {
        Self::Decode(err.to_string())
    }
}
