//! Print sheet tiling.
//!
//! Cards are laid out row-major from `(margin, margin)`, stepping by the card
//! size plus spacing. The page only sets the preview canvas; positions are
//! never clipped or paginated against it.

use serde::{Deserialize, Serialize};

use crate::PixelSize;

/// Printable page, sized at 300 dpi.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSize {
    /// ISO A4.
    #[default]
    A4,
    /// ISO A3.
    A3,
    /// US Letter.
    Letter,
}

impl PageSize {
    /// Page canvas in pixels at 300 dpi.
    #[must_use]
    pub const fn pixel_size(self) -> PixelSize {
        match self {
            Self::A4 => PixelSize::new(2480, 3508),
            Self::A3 => PixelSize::new(3508, 4961),
            Self::Letter => PixelSize::new(2550, 3300),
        }
    }

    /// Look up a page by name, falling back to A4 for unknown names.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "A4" => Self::A4,
            "A3" => Self::A3,
            "Letter" => Self::Letter,
            other => {
                tracing::debug!("Unknown page size {other:?}, using A4");
                Self::A4
            }
        }
    }
}

/// Top-left position of one card on the sheet, in page pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilePosition {
    /// Left edge.
    pub x: i64,
    /// Top edge.
    pub y: i64,
}

/// Largest row or column count the sheet form accepts.
pub const MAX_GRID: u32 = 100;

fn grid_count(value: i32) -> u32 {
    let count = u32::try_from(value).unwrap_or(0);
    if count > MAX_GRID {
        tracing::debug!("Clamping sheet grid count {count} to {MAX_GRID}");
    }
    count.min(MAX_GRID)
}

/// Compute `rows * cols` tile positions in row-major order.
///
/// Callers bound the counts; [`SheetConfig::set_field`] clamps them to
/// [`MAX_GRID`].
#[must_use]
pub fn tile_positions(
    card: PixelSize,
    rows: u32,
    cols: u32,
    spacing: i32,
    margin: i32,
) -> Vec<TilePosition> {
    let step_x = i64::from(card.width) + i64::from(spacing);
    let step_y = i64::from(card.height) + i64::from(spacing);
    let margin = i64::from(margin);
    (0..i64::from(rows))
        .flat_map(|r| {
            (0..i64::from(cols)).map(move |c| TilePosition {
                x: margin + c * step_x,
                y: margin + r * step_y,
            })
        })
        .collect()
}

/// Parse a numeric form field the way the sheet form does.
///
/// Reads an optional sign and leading digits; anything else, including an
/// empty field, yields zero.
#[must_use]
pub fn parse_numeric(text: &str) -> i32 {
    let trimmed = text.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let Ok(value) = digits[..end].parse::<i32>() else {
        tracing::debug!("Non-numeric input {text:?}, using 0");
        return 0;
    };
    if negative {
        -value
    } else {
        value
    }
}

/// A sheet form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetField {
    /// Row count.
    Rows,
    /// Column count.
    Cols,
    /// Gap between cards.
    Spacing,
    /// Outer margin.
    Margin,
}

/// Print sheet configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetConfig {
    /// Rows of cards.
    pub rows: u32,
    /// Columns of cards.
    pub cols: u32,
    /// Gap between adjacent cards in pixels.
    #[serde(rename = "spacing")]
    pub spacing_px: i32,
    /// Offset of the first card from the page corner in pixels.
    #[serde(rename = "margin")]
    pub margin_px: i32,
    /// Page used for the preview canvas.
    pub page: PageSize,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            rows: 4,
            cols: 2,
            spacing_px: 30,
            margin_px: 30,
            page: PageSize::A4,
        }
    }
}

impl SheetConfig {
    /// Update a field from raw form text; non-numeric input becomes zero,
    /// negative counts become zero rows/columns, and counts above
    /// [`MAX_GRID`] are clamped to it.
    pub fn set_field(&mut self, field: SheetField, text: &str) {
        let value = parse_numeric(text);
        match field {
            SheetField::Rows => self.rows = grid_count(value),
            SheetField::Cols => self.cols = grid_count(value),
            SheetField::Spacing => self.spacing_px = value,
            SheetField::Margin => self.margin_px = value,
        }
    }

    /// Tile positions for a card of the given pixel size.
    #[must_use]
    pub fn tiles(&self, card: PixelSize) -> Vec<TilePosition> {
        tile_positions(card, self.rows, self.cols, self.spacing_px, self.margin_px)
    }

    /// Full preview model for a card of the given pixel size.
    #[must_use]
    pub fn preview(&self, card: PixelSize, display_scale: f64) -> SheetPreview {
        SheetPreview {
            page_px: self.page.pixel_size(),
            display_scale,
            card_px: card,
            tiles: self.tiles(card),
        }
    }
}

/// Everything needed to draw a sheet preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetPreview {
    /// Page canvas at full resolution.
    pub page_px: PixelSize,
    /// Factor applied to page, card and tile coordinates when displayed.
    pub display_scale: f64,
    /// Card footprint at full resolution.
    pub card_px: PixelSize,
    /// Tile positions at full resolution.
    pub tiles: Vec<TilePosition>,
}

impl SheetPreview {
    /// Indices of tiles whose card rectangle extends beyond the page.
    #[must_use]
    pub fn overflowing(&self) -> Vec<usize> {
        let page_w = i64::from(self.page_px.width);
        let page_h = i64::from(self.page_px.height);
        let card_w = i64::from(self.card_px.width);
        let card_h = i64::from(self.card_px.height);
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, t)| t.x < 0 || t.y < 0 || t.x + card_w > page_w || t.y + card_h > page_h)
            .map(|(i, _)| i)
            .collect()
    }

    /// Scale a full-resolution length to display units.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_display(&self, value: i64) -> f64 {
        value as f64 * self.display_scale
    }
}
