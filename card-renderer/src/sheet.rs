//! Raster print-sheet preview.
//!
//! The page is drawn at the preview's display scale with a light fill. Each
//! tile gets a white card frame, and the same card snapshot is stamped on
//! every tile. Tiles are not clipped or paginated; parts falling outside
//! the page are simply not visible.

use card_core::{PixelSize, RasterImage, SheetPreview};
use tiny_skia::{FillRule, FilterQuality, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Transform};

use crate::error::RenderResult;
use crate::raster::{from_pixmap, new_pixmap, to_pixmap};

const PAGE_FILL: [u8; 4] = [241, 245, 249, 255];
const CARD_FILL: [u8; 4] = [255, 255, 255, 255];
const CARD_BORDER: [u8; 4] = [203, 213, 225, 255];

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scaled(size: PixelSize, scale: f64) -> PixelSize {
    let w = (f64::from(size.width) * scale).round().max(1.0);
    let h = (f64::from(size.height) * scale).round().max(1.0);
    PixelSize::new(w as u32, h as u32)
}

fn fill_rect(pixmap: &mut Pixmap, rect: Option<Rect>, [r, g, b, a]: [u8; 4]) {
    let Some(rect) = rect else {
        return;
    };
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    pixmap.fill_path(
        &PathBuilder::from_rect(rect),
        &paint,
        FillRule::Winding,
        Transform::identity(),
        None,
    );
}

#[allow(clippy::cast_precision_loss)]
fn card_stamp(size: PixelSize, snapshot: Option<&RasterImage>) -> RenderResult<Pixmap> {
    let mut stamp = new_pixmap(size.width, size.height)?;
    let (w, h) = (size.width as f32, size.height as f32);
    fill_rect(&mut stamp, Rect::from_xywh(0.0, 0.0, w, h), CARD_BORDER);
    fill_rect(&mut stamp, Rect::from_xywh(1.0, 1.0, w - 2.0, h - 2.0), CARD_FILL);

    if let Some(snapshot) = snapshot {
        let source = to_pixmap(snapshot)?;
        let transform = Transform::from_scale(
            w / snapshot.width as f32,
            h / snapshot.height as f32,
        );
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        stamp.draw_pixmap(0, 0, source.as_ref(), &paint, transform, None);
    }
    Ok(stamp)
}

/// Compose the sheet preview image.
///
/// # Errors
///
/// Returns an error if the page, card or snapshot cannot be allocated as a pixmap.
#[allow(clippy::cast_possible_truncation)]
pub fn render_sheet_preview(
    preview: &SheetPreview,
    snapshot: Option<&RasterImage>,
) -> RenderResult<RasterImage> {
    let page = scaled(preview.page_px, preview.display_scale);
    let card = scaled(preview.card_px, preview.display_scale);
    let mut canvas = new_pixmap(page.width, page.height)?;
    let [r, g, b, a] = PAGE_FILL;
    canvas.fill(tiny_skia::Color::from_rgba8(r, g, b, a));

    let stamp = card_stamp(card, snapshot)?;
    let paint = PixmapPaint {
        quality: FilterQuality::Nearest,
        ..PixmapPaint::default()
    };
    for tile in &preview.tiles {
        let x = preview.to_display(tile.x).round() as f32;
        let y = preview.to_display(tile.y).round() as f32;
        canvas.draw_pixmap(0, 0, stamp.as_ref(), &paint, Transform::from_translate(x, y), None);
    }
    tracing::debug!(
        "Composed sheet preview {}x{} with {} tiles ({} overflowing)",
        page.width,
        page.height,
        preview.tiles.len(),
        preview.overflowing().len()
    );
    from_pixmap(&canvas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use card_core::{PageSize, SheetConfig};

    fn pixel(image: &RasterImage, x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * image.width + x) * 4) as usize;
        let px = &image.pixels[offset..offset + 4];
        [px[0], px[1], px[2], px[3]]
    }

    fn preview(rows: u32, cols: u32) -> SheetPreview {
        let sheet = SheetConfig {
            rows,
            cols,
            spacing_px: 20,
            margin_px: 20,
            page: PageSize::A4,
        };
        sheet.preview(PixelSize::new(200, 100), 0.5)
    }

    #[test]
    fn test_page_is_scaled() {
        let image = render_sheet_preview(&preview(0, 0), None).expect("preview");
        assert_eq!((image.width, image.height), (1240, 1754));
        assert_eq!(pixel(&image, 5, 5), PAGE_FILL);
    }

    #[test]
    fn test_frames_at_tile_positions() {
        let image = render_sheet_preview(&preview(1, 2), None).expect("preview");
        // Tile 0 at (20, 20) page px, displayed at (10, 10), 100x50.
        assert_eq!(pixel(&image, 10, 10), CARD_BORDER);
        assert_eq!(pixel(&image, 30, 30), CARD_FILL);
        // Tile 1 at (240, 20), displayed at (120, 10).
        assert_eq!(pixel(&image, 150, 30), CARD_FILL);
        assert_eq!(pixel(&image, 115, 30), PAGE_FILL);
    }

    #[test]
    fn test_every_tile_carries_the_same_snapshot() {
        let snapshot = RasterImage::solid(200, 100, [255, 0, 0, 255]);
        let image = render_sheet_preview(&preview(2, 2), Some(&snapshot)).expect("preview");
        for (x, y) in [(60, 35), (170, 35), (60, 95), (170, 95)] {
            let [r, g, b, _] = pixel(&image, x, y);
            assert!(r > 250 && g < 5 && b < 5, "tile at {x},{y}");
        }
    }

    #[test]
    fn test_overflowing_tiles_do_not_fail() {
        let sheet = SheetConfig {
            rows: 30,
            ..SheetConfig::default()
        };
        let preview = sheet.preview(PixelSize::new(1082, 709), 0.5);
        assert!(!preview.overflowing().is_empty());
        assert!(render_sheet_preview(&preview, None).is_ok());
    }
}
