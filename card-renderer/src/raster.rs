//! Card rasterizer on tiny-skia, and a surface that can snapshot itself.
//!
//! Objects are drawn in stacking order over a white card, after the
//! background image. Each object is placed by its position, rotated about
//! its top-left origin, then scaled. Text is greeked: each line renders as a
//! bar of ink in the text color, sized from the font size and character
//! count, so proofs show layout without fonts.

use card_core::{
    ObjectHandle, PixelSize, RasterImage, RenderSurface, Renderable, SceneSurface,
    SurfaceBackground, SurfaceObject,
};
use tiny_skia::{
    Color, ColorU8, FillRule, FilterQuality, Mask, Paint, Path, PathBuilder, Pixmap, PixmapPaint,
    Rect, Transform,
};

use crate::error::{RenderError, RenderResult};

const LINE_HEIGHT: f32 = 1.16;
const GLYPH_WIDTH: f32 = 0.55;
/// Cubic handle length approximating a quarter circle.
const KAPPA: f32 = 0.552_284_8;

/// Parse a CSS-style hex color (`#rgb`, `#rrggbb`, `#rrggbbaa`).
///
/// Returns `None` for anything else.
#[must_use]
pub fn parse_hex_color(color: &str) -> Option<[u8; 4]> {
    let hex = color.trim().strip_prefix('#')?;
    let digits: Vec<u8> = hex
        .chars()
        .map(|c| c.to_digit(16).and_then(|d| u8::try_from(d).ok()))
        .collect::<Option<_>>()?;
    let mut out = [255; 4];
    match digits.len() {
        3 => {
            for (slot, digit) in out.iter_mut().zip(&digits) {
                *slot = digit * 17;
            }
        }
        6 | 8 => {
            for (slot, pair) in out.iter_mut().zip(digits.chunks(2)) {
                *slot = pair[0] * 16 + pair[1];
            }
        }
        _ => return None,
    }
    Some(out)
}

/// Solid anti-aliased paint for a hex color at `opacity`. Unparseable colors draw black.
pub(crate) fn solid_paint(color: &str, opacity: f32) -> Paint<'static> {
    let [r, g, b, a] = parse_hex_color(color).unwrap_or_else(|| {
        tracing::trace!("Unsupported color {color:?}, drawing black");
        [0, 0, 0, 255]
    });
    let mut color = Color::from_rgba8(r, g, b, a);
    color.apply_opacity(opacity);
    let mut paint = Paint::default();
    paint.set_color(color);
    paint.anti_alias = true;
    paint
}

/// Allocate a pixmap, failing on a zero or oversized extent.
pub(crate) fn new_pixmap(width: u32, height: u32) -> RenderResult<Pixmap> {
    Pixmap::new(width, height)
        .ok_or_else(|| RenderError::Export(format!("cannot allocate a {width}x{height} pixmap")))
}

/// Convert a straight-alpha raster into a premultiplied pixmap.
///
/// # Errors
///
/// Returns [`RenderError::Export`] for an empty image.
pub fn to_pixmap(image: &RasterImage) -> RenderResult<Pixmap> {
    let mut pixmap = new_pixmap(image.width, image.height)?;
    for (dst, src) in pixmap
        .pixels_mut()
        .iter_mut()
        .zip(image.pixels.chunks_exact(4))
    {
        *dst = ColorU8::from_rgba(src[0], src[1], src[2], src[3]).premultiply();
    }
    Ok(pixmap)
}

/// Convert a pixmap back into a straight-alpha raster.
///
/// # Errors
///
/// Returns [`RenderError::Export`] if the pixel count does not match the extent.
pub fn from_pixmap(pixmap: &Pixmap) -> RenderResult<RasterImage> {
    let pixels = pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();
    RasterImage::from_rgba(pixmap.width(), pixmap.height(), pixels)
        .ok_or_else(|| RenderError::Export("pixmap size mismatch".to_string()))
}

fn rounded_rect(width: f32, height: f32, radius: f32) -> Option<Path> {
    let r = radius.max(0.0).min(width / 2.0).min(height / 2.0);
    if r <= 0.0 {
        return Rect::from_xywh(0.0, 0.0, width, height).map(PathBuilder::from_rect);
    }
    let k = r * KAPPA;
    let mut pb = PathBuilder::new();
    pb.move_to(r, 0.0);
    pb.line_to(width - r, 0.0);
    pb.cubic_to(width - r + k, 0.0, width, r - k, width, r);
    pb.line_to(width, height - r);
    pb.cubic_to(width, height - r + k, width - r + k, height, width - r, height);
    pb.line_to(r, height);
    pb.cubic_to(r - k, height, 0.0, height - r + k, 0.0, height - r);
    pb.line_to(0.0, r);
    pb.cubic_to(0.0, r - k, r - k, 0.0, r, 0.0);
    pb.close();
    pb.finish()
}

#[allow(clippy::cast_precision_loss)]
fn text_bars(text: &str, font_size: f32, width: f32, align: &str) -> Option<Path> {
    let line_height = font_size * LINE_HEIGHT;
    let mut pb = PathBuilder::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        let bar = (line.chars().count() as f32 * font_size * GLYPH_WIDTH).min(width);
        let start = match align {
            "center" => (width - bar) / 2.0,
            "right" => width - bar,
            _ => 0.0,
        };
        let top = line_height * index as f32 + font_size * 0.2;
        if let Some(rect) = Rect::from_xywh(start, top, bar, font_size * 0.7) {
            pb.push_rect(rect);
        }
    }
    pb.finish()
}

#[allow(clippy::cast_possible_truncation)]
fn object_transform(object: &SurfaceObject) -> Transform {
    let (left, top) = (object.left as f32, object.top as f32);
    Transform::from_rotate_at(object.angle as f32, left, top)
        .pre_translate(left, top)
        .pre_scale(object.scale_x as f32, object.scale_y as f32)
}

fn circle_mask(canvas: &Pixmap, cx: f32, cy: f32, radius: f32, transform: Transform) -> RenderResult<Mask> {
    let mut mask = Mask::new(canvas.width(), canvas.height())
        .ok_or_else(|| RenderError::Export("cannot allocate clip mask".to_string()))?;
    if let Some(circle) = PathBuilder::from_circle(cx, cy, radius) {
        mask.fill_path(&circle, FillRule::Winding, true, transform);
    }
    Ok(mask)
}

#[allow(clippy::cast_possible_truncation)]
fn draw_object(canvas: &mut Pixmap, object: &SurfaceObject) -> RenderResult<()> {
    let (w, h) = (object.width as f32, object.height as f32);
    if !(w > 0.0 && h > 0.0 && object.scale_x > 0.0 && object.scale_y > 0.0) {
        return Ok(());
    }
    let transform = object_transform(object);
    let opacity = object.opacity.clamp(0.0, 1.0) as f32;

    match &object.content {
        Renderable::Rect { fill, radius } => {
            if let Some(path) = rounded_rect(w, h, *radius as f32) {
                canvas.fill_path(&path, &solid_paint(fill, opacity), FillRule::Winding, transform, None);
            }
        }
        Renderable::Image { image, clip_radius } => {
            let source = to_pixmap(image)?;
            let mask = clip_radius
                .map(|r| circle_mask(canvas, w / 2.0, h / 2.0, r as f32, transform))
                .transpose()?;
            let paint = PixmapPaint {
                opacity,
                quality: FilterQuality::Bilinear,
                ..PixmapPaint::default()
            };
            canvas.draw_pixmap(0, 0, source.as_ref(), &paint, transform, mask.as_ref());
        }
        Renderable::Text {
            text,
            font_size,
            color,
            align,
            ..
        } => {
            if let Some(path) = text_bars(text, *font_size as f32, w, align) {
                canvas.fill_path(&path, &solid_paint(color, opacity), FillRule::Winding, transform, None);
            }
        }
    }
    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
fn draw_background(canvas: &mut Pixmap, background: &SurfaceBackground) -> RenderResult<()> {
    let placement = &background.placement;
    if placement.scale_x <= 0.0 || placement.scale_y <= 0.0 {
        return Ok(());
    }
    let source = to_pixmap(&background.image)?;
    let transform = Transform::from_translate(placement.left as f32, placement.top as f32)
        .pre_scale(placement.scale_x as f32, placement.scale_y as f32);
    let paint = PixmapPaint {
        opacity: placement.opacity.clamp(0.0, 1.0) as f32,
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    canvas.draw_pixmap(0, 0, source.as_ref(), &paint, transform, None);
    Ok(())
}

/// Rasterize the current contents of a scene at its full pixel size.
///
/// # Errors
///
/// Returns [`RenderError::Export`] if the card or one of its images cannot
/// be allocated as a pixmap.
pub fn rasterize_card(scene: &SceneSurface) -> RenderResult<RasterImage> {
    let size = scene.size();
    let mut canvas = new_pixmap(size.width, size.height)?;
    canvas.fill(Color::WHITE);
    if let Some(background) = scene.background() {
        draw_background(&mut canvas, background)?;
    }
    for handle in scene.objects() {
        if let Some(object) = scene.get(handle) {
            draw_object(&mut canvas, object)?;
        }
    }
    tracing::debug!(
        "Rasterized card {}x{} with {} objects",
        size.width,
        size.height,
        scene.objects().len()
    );
    from_pixmap(&canvas)
}

/// A headless surface whose snapshot is a software rasterization.
#[derive(Debug, Default)]
pub struct RasterSurface {
    scene: SceneSurface,
}

impl RasterSurface {
    /// Create a surface of the given size.
    #[must_use]
    pub fn new(size: PixelSize) -> Self {
        Self {
            scene: SceneSurface::new(size),
        }
    }

    /// The underlying scene.
    #[must_use]
    pub fn scene(&self) -> &SceneSurface {
        &self.scene
    }

    /// The underlying scene, for delivering user manipulation.
    pub fn scene_mut(&mut self) -> &mut SceneSurface {
        &mut self.scene
    }
}

impl RenderSurface for RasterSurface {
    fn size(&self) -> PixelSize {
        self.scene.size()
    }

    fn resize(&mut self, size: PixelSize) {
        self.scene.resize(size);
    }

    fn insert(&mut self, index: usize, object: SurfaceObject) -> ObjectHandle {
        self.scene.insert(index, object)
    }

    fn remove(&mut self, handle: ObjectHandle) -> bool {
        self.scene.remove(handle)
    }

    fn objects(&self) -> Vec<ObjectHandle> {
        self.scene.objects()
    }

    fn get(&self, handle: ObjectHandle) -> Option<&SurfaceObject> {
        self.scene.get(handle)
    }

    fn get_mut(&mut self, handle: ObjectHandle) -> Option<&mut SurfaceObject> {
        self.scene.get_mut(handle)
    }

    fn set_background(&mut self, background: Option<SurfaceBackground>) {
        self.scene.set_background(background);
    }

    fn active_selection(&self) -> Vec<ObjectHandle> {
        self.scene.active_selection()
    }

    fn request_render(&mut self) {
        self.scene.request_render();
    }

    fn snapshot(&self) -> Option<RasterImage> {
        rasterize_card(&self.scene)
            .map_err(|e| tracing::warn!("Card snapshot failed: {e}"))
            .ok()
    }

    fn dispose(&mut self) {
        self.scene.dispose();
    }
}
