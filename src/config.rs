//! Serializable composer configuration.
//!
//! A [`ComposerConfig`] captures the tunables of a session (default sticker
//! size, caption placement and look, initial filter values) in a JSON-friendly
//! form. It is configuration only; the composition itself is never persisted.
//!
//! # Example
//!
//! ```
//! use sticker_composer::{ComposerConfig, FilterSettings};
//!
//! let config = ComposerConfig {
//!     filters: FilterSettings { brightness: 1.2, ..FilterSettings::default() },
//!     ..ComposerConfig::default()
//! };
//!
//! let json = config.to_json().unwrap();
//! let restored = ComposerConfig::from_json(&json).unwrap();
//! assert_eq!(restored.filters.brightness, 1.2);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ComposerError, ComposerResult};
use crate::filter::FilterParams;
use crate::layer::TextStyle;
use crate::transform::DEFAULT_STICKER_FRACTION;

// ============================================================================
// Filter Settings
// ============================================================================

/// Serializable filter parameter values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSettings {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub noise: f32,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            contrast: 1.0,
            saturation: 1.0,
            noise: 0.0,
        }
    }
}

impl FilterSettings {
    /// Validates the values into a [`FilterParams`].
    pub fn to_params(&self) -> ComposerResult<FilterParams> {
        FilterParams::new(self.brightness, self.contrast, self.saturation, self.noise)
    }
}

impl From<&FilterParams> for FilterSettings {
    fn from(params: &FilterParams) -> Self {
        use crate::filter::FilterKind;

        Self {
            brightness: params.get(FilterKind::Brightness),
            contrast: params.get(FilterKind::Contrast),
            saturation: params.get(FilterKind::Saturation),
            noise: params.get(FilterKind::Noise),
        }
    }
}

// ============================================================================
// Caption Settings
// ============================================================================

/// Placement and style of top/bottom captions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptionSettings {
    /// Distance from the top edge to the top caption's band.
    pub top_inset: f32,
    /// Distance from the bottom edge to the bottom caption's band.
    pub bottom_inset: f32,
    pub style: TextStyle,
}

impl Default for CaptionSettings {
    fn default() -> Self {
        Self {
            top_inset: 20.0,
            bottom_inset: 40.0,
            style: TextStyle::default(),
        }
    }
}

// ============================================================================
// ComposerConfig
// ============================================================================

/// All composer tunables.
///
/// # JSON Format
///
/// ```json
/// {
///   "stickerFraction": 0.25,
///   "captions": {
///     "topInset": 20.0,
///     "bottomInset": 40.0,
///     "style": { "fontFamily": "Impact", "fontSize": 40.0, "fill": "#fff",
///                "stroke": "#000", "strokeWidth": 2.0, "align": "center" }
///   },
///   "filters": { "brightness": 1.0, "contrast": 1.0, "saturation": 1.0, "noise": 0.0 },
///   "noiseSeed": 0
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComposerConfig {
    /// Default sticker width as a fraction of the surface's smaller side.
    pub sticker_fraction: f32,
    pub captions: CaptionSettings,
    /// Filter values a fresh session starts with.
    pub filters: FilterSettings,
    /// Seed for the noise filter's grain pattern.
    pub noise_seed: u32,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            sticker_fraction: DEFAULT_STICKER_FRACTION,
            captions: CaptionSettings::default(),
            filters: FilterSettings::default(),
            noise_seed: 0,
        }
    }
}

impl ComposerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks every value, returning the first problem found.
    pub fn validate(&self) -> ComposerResult<()> {
        if !(self.sticker_fraction.is_finite() && self.sticker_fraction > 0.0) {
            return Err(ComposerError::config(format!(
                "sticker fraction {} must be positive and finite",
                self.sticker_fraction
            )));
        }
        for (name, inset) in [
            ("top inset", self.captions.top_inset),
            ("bottom inset", self.captions.bottom_inset),
        ] {
            if !inset.is_finite() {
                return Err(ComposerError::config(format!("{name} {inset} is not finite")));
            }
        }
        self.captions
            .style
            .validate()
            .map_err(|e| ComposerError::config(e.to_string()))?;
        self.filters
            .to_params()
            .map_err(|e| ComposerError::config(e.to_string()))?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parses and validates a configuration.
    pub fn from_json(json: &str) -> ComposerResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ComposerError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
