//! Error types for card operations.

use thiserror::Error;

/// Result type for card operations.
pub type CardResult<T> = Result<T, CardError>;

/// Errors that can occur in card operations.
#[derive(Debug, Error)]
pub enum CardError {
    /// Template text could not be parsed or violates a document invariant.
    #[error("Malformed template: {0}")]
    MalformedTemplate(String),

    /// An image or QR asset failed to load or decode.
    #[error("Failed to load asset: {0}")]
    AssetLoad(String),

    /// Element not found in the document.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Invalid element operation.
    #[error("Invalid operation on element: {0}")]
    InvalidOperation(String),

    /// The rendering surface was accessed outside its ready lifetime.
    #[error("Rendering surface is not available")]
    SurfaceUnavailable,

    /// Document serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
