//! Renderer error types.

use card_core::CardError;
use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur while decoding, rasterizing or encoding.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Image bytes could not be decoded.
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// A `data:` URI was malformed.
    #[error("Invalid data URI: {0}")]
    DataUri(String),

    /// The image source is not a data URI or local path.
    #[error("Unsupported image source: {0}")]
    UnsupportedSource(String),

    /// Reading a local file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The QR payload could not be encoded.
    #[error("QR encoding failed: {0}")]
    Qr(String),

    /// Encoding an output image failed.
    #[error("Export failed: {0}")]
    Export(String),
}

impl From<RenderError> for CardError {
    fn from(err: RenderError) -> Self {
        Self::AssetLoad(err.to_string())
    }
}
