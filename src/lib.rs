//! sticker-composer: a layered image-composition core
//!
//! This crate provides the editing model behind a sticker/meme editor: a
//! base image, stickers and captions stacked over it, a global
//! brightness/contrast/saturation/noise filter chain, and export of the
//! flattened result.
//!
//! # Example
//!
//! ```
//! use sticker_composer::{Composer, ExportFormat, StickerDrop};
//! # use std::io::Cursor;
//! # let png = |w, h| {
//! #     let mut bytes = Vec::new();
//! #     image::RgbaImage::from_pixel(w, h, image::Rgba([40, 80, 120, 255]))
//! #         .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
//! #         .unwrap();
//! #     bytes
//! # };
//!
//! let mut composer = Composer::default();
//! composer.set_base_image(&png(640, 480))?;
//!
//! // Stickers are centered on the drop point, a quarter of the smaller side wide
//! composer.add_sticker(&png(64, 64), StickerDrop::at(320.0, 240.0))?;
//! composer.add_text(Some("TOP TEXT"), Some("BOTTOM TEXT"))?;
//! composer.set_parameter("contrast", 1.2)?;
//!
//! let bytes = composer.export(ExportFormat::Png)?;
//! # assert!(!bytes.is_empty());
//! # Ok::<(), sticker_composer::ComposerError>(())
//! ```
//!
//! # Background Decoding
//!
//! Uploads can be decoded off the editing thread. The session stamps each
//! request, and completions for superseded requests are rejected:
//!
//! ```
//! use sticker_composer::Composer;
//! # use std::io::Cursor;
//! # let png = |w, h| {
//! #     let mut bytes = Vec::new();
//! #     image::RgbaImage::new(w, h)
//! #         .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
//! #         .unwrap();
//! #     bytes
//! # };
//!
//! let mut composer = Composer::default();
//! let first = composer.request_base_image(png(10, 10));
//! let second = composer.request_base_image(png(20, 20));
//!
//! let second = std::thread::spawn(move || second.run()).join().unwrap();
//! composer.complete(second)?;
//!
//! // The older request lost the race
//! assert!(composer.complete(first.run()).unwrap_err().is_stale());
//! assert_eq!(composer.surface().size().width, 20);
//! # Ok::<(), sticker_composer::ComposerError>(())
//! ```

pub mod config;
pub mod decode;
pub mod error;
pub mod export;
pub mod filter;
pub mod layer;
pub mod raster;
pub mod session;
pub mod surface;
pub mod transform;

pub use config::{CaptionSettings, ComposerConfig, FilterSettings};
pub use decode::{AssetSlot, DecodeCompletion, DecodeOutcome, DecodeTask, DecodeTicket, StickerDrop};
pub use error::{ComposerError, ComposerResult};
pub use export::ExportFormat;
pub use filter::{Adjustment, FilterChain, FilterKind, FilterParams, PixelContext};
pub use layer::{
    Layer, LayerId, LayerKind, LayerRole, LayerSource, LayerStack, SvgSource, TextAlign, TextSpec,
    TextStyle,
};
pub use raster::{Raster, SizePx};
pub use session::{Composer, Configurable};
pub use surface::RenderSurface;
pub use transform::{Origin, Point, SnapPosition, Transform};
