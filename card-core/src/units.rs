//! Physical card dimensions and millimetre/pixel conversion.

use serde::{Deserialize, Serialize};

use crate::{CardError, CardResult};

/// Millimetres per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Convert a length in millimetres to pixels at the given resolution.
#[must_use]
pub fn mm_to_px(mm: f64, dpi: f64) -> f64 {
    (mm / MM_PER_INCH) * dpi
}

/// Card orientation.
///
/// Carried for the document only; no width/height swap is derived from it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Wider than tall.
    #[default]
    Landscape,
    /// Taller than wide.
    Portrait,
}

/// An integer pixel extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelSize {
    /// Create a new pixel size.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Physical size of a card.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CardSize {
    /// Nominal width in millimetres.
    #[serde(rename = "widthMM")]
    pub width_mm: f64,
    /// Nominal height in millimetres.
    #[serde(rename = "heightMM")]
    pub height_mm: f64,
    /// Output resolution in dots per inch.
    pub dpi: f64,
    /// Bleed added on every side, in millimetres.
    #[serde(default, rename = "bleedMM")]
    pub bleed_mm: f64,
    /// Informational orientation.
    #[serde(default)]
    pub orientation: Orientation,
}

impl Default for CardSize {
    /// ID-1 (credit card) size at 300 dpi with 3 mm bleed.
    fn default() -> Self {
        Self {
            width_mm: 85.6,
            height_mm: 54.0,
            dpi: 300.0,
            bleed_mm: 3.0,
            orientation: Orientation::Landscape,
        }
    }
}

impl CardSize {
    /// Check the size invariants: positive dimensions and dpi, non-negative bleed.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::MalformedTemplate`] naming the offending field.
    pub fn validate(&self) -> CardResult<()> {
        let positive = [
            ("widthMM", self.width_mm),
            ("heightMM", self.height_mm),
            ("dpi", self.dpi),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(CardError::MalformedTemplate(format!(
                    "{field} must be positive, got {value}"
                )));
            }
        }
        if !(self.bleed_mm.is_finite() && self.bleed_mm >= 0.0) {
            return Err(CardError::MalformedTemplate(format!(
                "bleedMM must not be negative, got {}",
                self.bleed_mm
            )));
        }
        Ok(())
    }

    /// Pixel footprint including bleed on both sides of each axis.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn pixel_size(&self) -> PixelSize {
        let bleed = 2.0 * self.bleed_mm;
        PixelSize {
            width: mm_to_px(self.width_mm + bleed, self.dpi).round() as u32,
            height: mm_to_px(self.height_mm + bleed, self.dpi).round() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_mm_to_px_one_inch() {
        assert!((mm_to_px(25.4, 300.0) - 300.0).abs() < 1e-9);
        assert!(mm_to_px(0.0, 300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_default_card_pixel_size() {
        let size = CardSize::default();
        assert_eq!(size.pixel_size(), PixelSize::new(1082, 709));
    }

    #[test]
    fn test_pixel_size_without_bleed() {
        let size = CardSize {
            bleed_mm: 0.0,
            ..CardSize::default()
        };
        assert_eq!(size.pixel_size().width, 1011);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(CardSize::default().validate().is_ok());
        let zero_dpi = CardSize {
            dpi: 0.0,
            ..CardSize::default()
        };
        assert!(matches!(
            zero_dpi.validate(),
            Err(CardError::MalformedTemplate(_))
        ));
        let negative_bleed = CardSize {
            bleed_mm: -1.0,
            ..CardSize::default()
        };
        assert!(negative_bleed.validate().is_err());
    }

    #[test]
    fn test_document_field_names() {
        let size: CardSize = serde_json::from_str(
            r#"{"widthMM": 85.6, "heightMM": 54, "dpi": 300, "bleedMM": 3, "orientation": "portrait"}"#,
        )
        .expect("parse");
        assert!((size.bleed_mm - 3.0).abs() < f64::EPSILON);
        assert_eq!(size.orientation, Orientation::Portrait);
        let json = serde_json::to_value(size).expect("json");
        assert!(json.get("widthMM").is_some());
    }

    #[test]
    fn test_orientation_is_informational() {
        let portrait = CardSize {
            orientation: Orientation::Portrait,
            ..CardSize::default()
        };
        assert_eq!(portrait.pixel_size(), CardSize::default().pixel_size());
    }

    proptest! {
        #[test]
        fn prop_pixel_size_matches_formula(
            width_mm in 1.0f64..500.0,
            height_mm in 1.0f64..500.0,
            bleed_mm in 0.0f64..10.0,
            dpi in 1.0f64..1200.0,
        ) {
            let size = CardSize { width_mm, height_mm, dpi, bleed_mm, orientation: Orientation::Landscape };
            let px = size.pixel_size();
            let expected_w = ((width_mm + 2.0 * bleed_mm) * dpi / 25.4).round();
            let expected_h = ((height_mm + 2.0 * bleed_mm) * dpi / 25.4).round();
            prop_assert!((f64::from(px.width) - expected_w).abs() <= 1.0);
            prop_assert!((f64::from(px.height) - expected_h).abs() <= 1.0);
        }
    }
}
