//! # Card Core
//!
//! Layout engine for printable ID cards: a typed element model bound to
//! data records, background fitting, two-way reconciliation with an
//! interactive rendering surface, and print sheet tiling.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                      card-core                       │
//! ├──────────────────────────────────────────────────────┤
//! │  Document          │  Binding            │  Units    │
//! │  - Elements        │  - Data records     │  - mm/px  │
//! │  - Background      │  - Fallback         │  - Bleed  │
//! │  - Serializer      │  - Batch rows       │           │
//! ├──────────────────────────────────────────────────────┤
//! │  Reconciler        │  Editor state       │  Sheet    │
//! │  - Materialize     │  - Change tracking  │  - Tiles  │
//! │  - Snap / write    │  - Selection        │  - Pages  │
//! │  - Asset tokens    │  - Session          │           │
//! └──────────────────────────────────────────────────────┘
//!            │ RenderSurface            │ AssetLoader
//!            ▼                          ▼
//!      interactive canvas        image / QR backends
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod asset;
pub mod background;
pub mod binding;
pub mod catalog;
pub mod config;
pub mod document;
pub mod element;
pub mod error;
pub mod reconciler;
pub mod schema;
pub mod session;
pub mod sheet;
pub mod state;
pub mod surface;
pub mod units;

pub use asset::{
    AssetLoader, AssetRequest, AssetSource, AssetTarget, CancelFlag, LoadToken, PendingElement,
    RasterImage,
};
pub use background::{fit_scale, Background, BackgroundPlacement, FitMode};
pub use binding::{normalize_rows, resolve, resolve_text, DataRecord, RECORD_FIELDS};
pub use catalog::builtin_templates;
pub use config::EditorConfig;
pub use document::{GeometryUpdate, TemplateDocument};
pub use element::{
    Clip, Element, ElementId, ElementKind, ElementType, Frame, IdGenerator, ImageProps,
    PhotoProps, QrProps, RectProps, TextProps,
};
pub use error::{CardError, CardResult};
pub use reconciler::{Completion, Reconciled, Reconciler, ReconcilerState};
pub use schema::{deserialize, serialize, TemplateFile};
pub use session::EditorSession;
pub use sheet::{
    parse_numeric, tile_positions, PageSize, SheetConfig, SheetField, SheetPreview, TilePosition,
    MAX_GRID,
};
pub use state::{ChangeSet, EditorState};
pub use surface::{
    ObjectHandle, RenderSurface, Renderable, SceneSurface, SurfaceBackground, SurfaceEvent,
    SurfaceObject,
};
pub use units::{mm_to_px, CardSize, Orientation, PixelSize, MM_PER_INCH};

/// Card core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
