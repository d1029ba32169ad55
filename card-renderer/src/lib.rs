//! # Card Renderer
//!
//! Raster collaborators behind the `card-core` seams.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               card-core seams               │
//! ├──────────────────────┬──────────────────────┤
//! │ AssetLoader          │ RenderSurface        │
//! │ - data URIs / files  │ - RasterSurface      │
//! │ - QR rasterizer      │ - card snapshots     │
//! ├──────────────────────┴──────────────────────┤
//! │   tiny-skia card and sheet rasterization    │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod image;
pub mod loader;
pub mod qr;
pub mod raster;
pub mod sheet;

pub use error::{RenderError, RenderResult};
pub use loader::ImageAssetLoader;
pub use qr::rasterize_qr;
pub use raster::{from_pixmap, parse_hex_color, rasterize_card, to_pixmap, RasterSurface};
pub use sheet::render_sheet_preview;

/// Card renderer version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
