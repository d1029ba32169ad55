//! Card background configuration and image fit computation.

use serde::{Deserialize, Serialize};

use crate::PixelSize;

/// How a background image is scaled onto the card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Whole image visible, may letterbox.
    Fit,
    /// Card fully covered, may crop.
    #[default]
    Fill,
    /// Independent axis scales, aspect ratio not preserved.
    Stretch,
    /// User-supplied uniform scale.
    Manual,
}

/// Background of a card template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Background {
    /// Fit mode.
    #[serde(default)]
    pub mode: FitMode,
    /// Image reference (URL, path or data URI). Empty means no image.
    #[serde(default)]
    pub image: String,
    /// Opacity in `[0, 1]`.
    #[serde(default = "Background::default_opacity")]
    pub opacity: f64,
    /// Uniform scale used in [`FitMode::Manual`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    /// Whether the background object ignores selection and editing.
    #[serde(default = "Background::default_locked")]
    pub locked: bool,
}

impl Default for Background {
    fn default() -> Self {
        Self {
            mode: FitMode::Fill,
            image: String::new(),
            opacity: 1.0,
            scale: None,
            locked: true,
        }
    }
}

impl Background {
    const fn default_opacity() -> f64 {
        1.0
    }

    const fn default_locked() -> bool {
        true
    }

    /// Whether an image is configured.
    #[must_use]
    pub fn has_image(&self) -> bool {
        !self.image.is_empty()
    }

    /// Scale applied in manual mode; unset or zero means 1.
    #[must_use]
    pub fn manual_scale(&self) -> f64 {
        match self.scale {
            Some(scale) if scale != 0.0 && scale.is_finite() => scale,
            _ => 1.0,
        }
    }

    /// Opacity clamped to `[0, 1]`.
    #[must_use]
    pub fn clamped_opacity(&self) -> f64 {
        self.opacity.clamp(0.0, 1.0)
    }

    /// Compute where an image of `image` intrinsic size sits on a `canvas`.
    ///
    /// Returns `None` for a degenerate (zero-sized) image.
    #[must_use]
    pub fn placement(&self, canvas: PixelSize, image: PixelSize) -> Option<BackgroundPlacement> {
        let (scale_x, scale_y) = fit_scale(self.mode, self.manual_scale(), canvas, image)?;
        let cw = f64::from(canvas.width);
        let ch = f64::from(canvas.height);
        let sw = f64::from(image.width) * scale_x;
        let sh = f64::from(image.height) * scale_y;
        Some(BackgroundPlacement {
            scale_x,
            scale_y,
            left: (cw - sw) / 2.0,
            top: (ch - sh) / 2.0,
            opacity: self.clamped_opacity(),
            selectable: !self.locked,
        })
    }
}

/// Computed geometry and attributes of a placed background image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundPlacement {
    /// Horizontal scale.
    pub scale_x: f64,
    /// Vertical scale.
    pub scale_y: f64,
    /// Left offset centring the scaled image.
    pub left: f64,
    /// Top offset centring the scaled image.
    pub top: f64,
    /// Rendering opacity.
    pub opacity: f64,
    /// Whether the background participates in selection/editing.
    pub selectable: bool,
}

/// Scale factors `(x, y)` for an image on a canvas under `mode`.
///
/// Returns `None` if the image has a zero dimension.
#[must_use]
pub fn fit_scale(
    mode: FitMode,
    manual_scale: f64,
    canvas: PixelSize,
    image: PixelSize,
) -> Option<(f64, f64)> {
    if image.width == 0 || image.height == 0 {
        return None;
    }
    let sx = f64::from(canvas.width) / f64::from(image.width);
    let sy = f64::from(canvas.height) / f64::from(image.height);
    Some(match mode {
        FitMode::Fit => {
            let s = sx.min(sy);
            (s, s)
        }
        FitMode::Fill => {
            let s = sx.max(sy);
            (s, s)
        }
        FitMode::Stretch => (sx, sy),
        FitMode::Manual => (manual_scale, manual_scale),
    })
}
