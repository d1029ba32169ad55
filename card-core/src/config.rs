//! Editor configuration.

use serde::{Deserialize, Serialize};

use crate::reconciler::DEFAULT_GRID_PX;
use crate::{DataRecord, SheetConfig};

/// Display factor applied to the sheet preview canvas.
pub const DEFAULT_PREVIEW_SCALE: f64 = 0.5;

/// Configuration of an editing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Snap grid unit for dragged objects, in pixels.
    pub grid_px: f64,
    /// Initial print sheet settings.
    pub sheet: SheetConfig,
    /// Sheet preview display scale.
    pub preview_scale: f64,
    /// Active data record before the user edits anything.
    pub default_record: DataRecord,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            grid_px: DEFAULT_GRID_PX,
            sheet: SheetConfig::default(),
            preview_scale: DEFAULT_PREVIEW_SCALE,
            default_record: default_record(),
        }
    }
}

fn default_record() -> DataRecord {
    [
        ("name", "Alex Johnson"),
        ("role", "Student"),
        ("id", "S-1023"),
        ("qrPayload", "S-1023"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
