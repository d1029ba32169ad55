//! Asynchronous asset loading seam.
//!
//! Image and QR assets are produced outside the model by an [`AssetLoader`].
//! Every request carries a [`LoadToken`] tying it to the materialization pass
//! that issued it and to the reconciler's ready lifetime, so completions that
//! arrive after a rebuild or after disposal can be recognised and dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::{Background, CardResult, ElementId, Frame};

/// Decoded RGBA8 raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major RGBA pixel data, 4 bytes per pixel.
    pub pixels: Arc<[u8]>,
}

impl RasterImage {
    /// Wrap RGBA data. Returns `None` if the buffer length does not match.
    #[must_use]
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        let expected = usize::try_from(u64::from(width) * u64::from(height) * 4).ok()?;
        (pixels.len() == expected).then(|| Self {
            width,
            height,
            pixels: pixels.into(),
        })
    }

    /// A uniformly filled raster.
    #[must_use]
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = (width as usize) * (height as usize);
        let pixels: Vec<u8> = std::iter::repeat(rgba).take(count).flatten().collect();
        Self {
            width,
            height,
            pixels: pixels.into(),
        }
    }
}

/// Cancellation flag shared by all loads of one ready lifetime.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create an uncancelled flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel every token derived from this flag.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether the flag has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Identifies the pass that issued a request.
#[derive(Debug, Clone)]
pub struct LoadToken {
    /// Materialization pass number within its lane.
    pub generation: u64,
    cancel: CancelFlag,
}

impl LoadToken {
    /// Create a token for `generation` under `cancel`.
    #[must_use]
    pub fn new(generation: u64, cancel: CancelFlag) -> Self {
        Self { generation, cancel }
    }

    /// Whether the owning reconciler has been disposed.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// What to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    /// An image by URL, path or data URI.
    Image {
        /// Source reference.
        src: String,
    },
    /// A QR symbol encoding `value`, rasterized at `size` pixels.
    Qr {
        /// Payload.
        value: String,
        /// Edge length in pixels.
        size: u32,
    },
}

/// How a loaded element image is placed once it arrives.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingElement {
    /// Originating element.
    pub id: ElementId,
    /// Index of the element in document order.
    pub z_order: usize,
    /// Element geometry at request time.
    pub frame: Frame,
    /// Target edge length for QR symbols.
    pub qr_size: Option<f64>,
    /// Circular clip radius for photos.
    pub clip_radius: Option<f64>,
}

/// Where a loaded asset goes.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetTarget {
    /// A non-background element object.
    Element(PendingElement),
    /// The background slot.
    Background(Background),
}

/// An outstanding load issued by the reconciler.
#[derive(Debug, Clone)]
pub struct AssetRequest {
    /// What to load.
    pub source: AssetSource,
    /// Where the result goes.
    pub target: AssetTarget,
    /// Staleness token.
    pub token: LoadToken,
}

/// Loads images and rasterizes QR symbols.
#[async_trait]
pub trait AssetLoader: Send + Sync {
    /// Fetch and decode an image.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CardError::AssetLoad`] if the source cannot be read or decoded.
    async fn load_image(&self, src: &str) -> CardResult<RasterImage>;

    /// Rasterize a QR symbol.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CardError::AssetLoad`] if the payload cannot be encoded.
    async fn rasterize_qr(&self, value: &str, size: u32) -> CardResult<RasterImage>;

    /// Load whatever `source` names.
    ///
    /// # Errors
    ///
    /// Propagates the underlying loader failure.
    async fn load(&self, source: &AssetSource) -> CardResult<RasterImage> {
        match source {
            AssetSource::Image { src } => self.load_image(src).await,
            AssetSource::Qr { value, size } => self.rasterize_qr(value, *size).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgba_checks_length() {
        assert!(RasterImage::from_rgba(2, 2, vec![0; 16]).is_some());
        assert!(RasterImage::from_rgba(2, 2, vec![0; 15]).is_none());
    }

    #[test]
    fn test_solid_fill() {
        let image = RasterImage::solid(3, 2, [1, 2, 3, 4]);
        assert_eq!(image.pixels.len(), 24);
        assert_eq!(&image.pixels[4..8], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_cancel_flag_reaches_tokens() {
        let flag = CancelFlag::new();
        let token = LoadToken::new(3, flag.clone());
        assert!(!token.is_cancelled());
        flag.cancel();
        assert!(token.is_cancelled());
    }
}
