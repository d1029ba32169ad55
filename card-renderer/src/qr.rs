//! QR symbol rasterization.
//!
//! Symbols use medium error correction and no quiet zone, and are sampled
//! onto an exact `size × size` raster.

use card_core::RasterImage;
use qrcode::{Color, EcLevel, QrCode};

use crate::error::{RenderError, RenderResult};

const DARK: [u8; 4] = [0, 0, 0, 255];
const LIGHT: [u8; 4] = [255, 255, 255, 255];

/// Rasterize `value` as a QR symbol of `size` pixels per edge.
///
/// # Errors
///
/// Returns [`RenderError::Qr`] if the payload does not fit in a QR symbol
/// or `size` is zero.
pub fn rasterize_qr(value: &str, size: u32) -> RenderResult<RasterImage> {
    if size == 0 {
        return Err(RenderError::Qr("size must be positive".to_string()));
    }
    let code = QrCode::with_error_correction_level(value.as_bytes(), EcLevel::M)
        .map_err(|e| RenderError::Qr(e.to_string()))?;
    let modules = code.width();
    let edge = size as usize;

    let mut pixels = Vec::with_capacity(edge * edge * 4);
    for py in 0..edge {
        let qy = py * modules / edge;
        for px in 0..edge {
            let qx = px * modules / edge;
            let color = if code[(qx, qy)] == Color::Dark { DARK } else { LIGHT };
            pixels.extend_from_slice(&color);
        }
    }
    tracing::trace!("QR {modules}x{modules} modules rasterized at {size}px");
    RasterImage::from_rgba(size, size, pixels)
        .ok_or_else(|| RenderError::Qr("raster size overflow".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(image: &RasterImage, x: u32, y: u32) -> &[u8] {
        let offset = ((y * image.width + x) * 4) as usize;
        &image.pixels[offset..offset + 4]
    }

    #[test]
    fn test_exact_size() {
        let image = rasterize_qr("S-1023", 80).expect("qr");
        assert_eq!((image.width, image.height), (80, 80));
    }

    #[test]
    fn test_no_quiet_zone() {
        // Finder patterns start dark in the very first module.
        let image = rasterize_qr("QR", 120).expect("qr");
        assert_eq!(pixel(&image, 0, 0), &DARK);
        assert_eq!(pixel(&image, 119, 0), &DARK);
        assert_eq!(pixel(&image, 0, 119), &DARK);
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(matches!(rasterize_qr("x", 0), Err(RenderError::Qr(_))));
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let payload = "x".repeat(4000);
        assert!(rasterize_qr(&payload, 100).is_err());
    }
}
