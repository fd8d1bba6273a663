//! Decode-then-mutate protocol for uploaded assets.
//!
//! Decoding an upload is decoupled from the session that will consume it:
//! the session hands out a [`DecodeTask`] stamped with a generation, the
//! task can run on any thread, and its [`DecodeCompletion`] is fed back
//! through [`Composer::complete`](crate::Composer::complete). The session
//! compares the stamp against its own counters there and rejects
//! completions for superseded slots, so a slow decode can never clobber
//! the result of a faster, newer one.

use crate::error::ComposerError;
use crate::raster::Raster;
use crate::transform::Point;

/// Where and how large a dropped sticker should appear.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StickerDrop {
    /// Drop point in surface coordinates; becomes the sticker's center.
    pub pointer: Point,
    /// Target width in surface pixels. `None` uses the configured fraction
    /// of the surface's smaller side.
    pub target_size: Option<f32>,
}

impl StickerDrop {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            pointer: Point::new(x, y),
            target_size: None,
        }
    }

    pub fn with_size(mut self, target_size: f32) -> Self {
        self.target_size = Some(target_size);
        self
    }
}

/// The asset slot a decode is destined for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AssetSlot {
    Base,
    Sticker(StickerDrop),
}

impl AssetSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Sticker(_) => "sticker",
        }
    }
}

/// Identifies one requested decode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodeTicket {
    pub slot: AssetSlot,
    /// For base decodes, the request generation; for stickers, the
    /// generation of the base image the sticker was dropped onto.
    pub generation: u64,
}

/// Result of decoding an asset.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutcome {
    Decoded(Raster),
    Failed(ComposerError),
}

/// A decode waiting to run.
#[derive(Debug, Clone)]
pub struct DecodeTask {
    ticket: DecodeTicket,
    bytes: Vec<u8>,
}

impl DecodeTask {
    pub(crate) fn new(ticket: DecodeTicket, bytes: Vec<u8>) -> Self {
        Self { ticket, bytes }
    }

    pub fn ticket(&self) -> DecodeTicket {
        self.ticket
    }

    /// Decodes the bytes. Pure; safe to call off the session's thread.
    pub fn run(self) -> DecodeCompletion {
        let outcome = match Raster::decode(&self.bytes) {
            Ok(raster) => DecodeOutcome::Decoded(raster),
            Err(err) => DecodeOutcome::Failed(err),
        };
        DecodeCompletion {
            ticket: self.ticket,
            outcome,
        }
    }
}

/// A finished decode, ready to be applied to the session.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeCompletion {
    pub ticket: DecodeTicket,
    pub outcome: DecodeOutcome,
}

impl DecodeCompletion {
    /// Wraps a raster decoded by other means (for example an SVG sticker).
    pub fn decoded(ticket: DecodeTicket, raster: Raster) -> Self {
        Self {
            ticket,
            outcome: DecodeOutcome::Decoded(raster),
        }
    }
}
