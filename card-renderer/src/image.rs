//! Image decoding and data URI handling.
//!
//! Images arrive as raw file bytes or as `data:` URIs (base64 or
//! percent-encoded) and are decoded to [`RasterImage`] for the surface.

use std::path::Path;

use base64::Engine;
use card_core::RasterImage;
use image::RgbaImage;

use crate::error::{RenderError, RenderResult};

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG with alpha support.
    Png,
    /// JPEG (no alpha).
    Jpeg,
    /// WebP (alpha support).
    WebP,
    /// Unknown/other format.
    Unknown,
}

impl ImageFormat {
    /// Detect format from file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "png" => Self::Png,
            "jpg" | "jpeg" => Self::Jpeg,
            "webp" => Self::WebP,
            _ => Self::Unknown,
        }
    }

    /// Detect format from magic bytes.
    #[must_use]
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            Self::Png
        } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Self::Jpeg
        } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            Self::WebP
        } else {
            Self::Unknown
        }
    }

    /// MIME type used when embedding images of this format.
    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Unknown => "application/octet-stream",
        }
    }
}

/// Decode raw image bytes.
///
/// # Errors
///
/// Returns [`RenderError::Decode`] if the bytes are not a decodable image.
pub fn load_image_from_bytes(data: &[u8]) -> RenderResult<RasterImage> {
    let img = image::load_from_memory(data).map_err(|e| RenderError::Decode(e.to_string()))?;
    Ok(from_rgba_image(img.to_rgba8()))
}

/// Decode a `data:` URI such as `data:image/png;base64,iVBORw0KGgo...`.
///
/// # Errors
///
/// Returns [`RenderError::DataUri`] if the URI is malformed and
/// [`RenderError::Decode`] if its payload is not an image.
pub fn load_image_from_data_uri(uri: &str) -> RenderResult<RasterImage> {
    load_image_from_bytes(&decode_data_uri(uri)?)
}

/// Extract the payload bytes of a `data:` URI.
///
/// # Errors
///
/// Returns [`RenderError::DataUri`] on a missing prefix or separator, or bad encoding.
pub fn decode_data_uri(uri: &str) -> RenderResult<Vec<u8>> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| RenderError::DataUri("not a data URI".to_string()))?;
    let (metadata, payload) = rest
        .split_once(',')
        .ok_or_else(|| RenderError::DataUri("missing comma".to_string()))?;

    if metadata.split(';').any(|part| part == "base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| RenderError::DataUri(format!("bad base64: {e}")))
    } else {
        percent_decode(payload)
    }
}

/// Embed file bytes as a base64 `data:` URI.
#[must_use]
pub fn encode_data_uri(bytes: &[u8], mime: &str) -> String {
    let mime = if mime.is_empty() {
        ImageFormat::from_magic_bytes(bytes).mime()
    } else {
        mime
    };
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{mime};base64,{encoded}")
}

/// Embed an uploaded file as a `data:` URI. The MIME type comes from the
/// file extension, or from the content when the extension is not an image.
#[must_use]
pub fn encode_file_data_uri(path: &Path, bytes: &[u8]) -> String {
    let format = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(ImageFormat::Unknown, ImageFormat::from_extension);
    let mime = match format {
        ImageFormat::Unknown => "",
        known => known.mime(),
    };
    encode_data_uri(bytes, mime)
}

fn percent_decode(input: &str) -> RenderResult<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let byte = bytes
                .get(i + 1..i + 3)
                .and_then(|hex| std::str::from_utf8(hex).ok())
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or_else(|| RenderError::DataUri("invalid percent escape".to_string()))?;
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

/// Convert a decoded `image` buffer into a raster.
#[must_use]
pub fn from_rgba_image(img: RgbaImage) -> RasterImage {
    let (width, height) = img.dimensions();
    RasterImage {
        width,
        height,
        pixels: img.into_raw().into(),
    }
}

/// Convert a raster into an `image` buffer.
///
/// # Errors
///
/// Returns [`RenderError::Decode`] if the pixel buffer does not match the dimensions.
pub fn to_rgba_image(raster: &RasterImage) -> RenderResult<RgbaImage> {
    RgbaImage::from_raw(raster.width, raster.height, raster.pixels.to_vec())
        .ok_or_else(|| RenderError::Decode("pixel buffer does not match dimensions".to_string()))
}

/// Encode a buffer as PNG bytes.
///
/// # Errors
///
/// Returns [`RenderError::Export`] if encoding fails.
pub fn encode_png(img: &RgbaImage) -> RenderResult<Vec<u8>> {
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .map_err(|e| RenderError::Export(format!("PNG encoding failed: {e}")))?;
    Ok(buf.into_inner())
}

/// Encode a raster as PNG bytes.
///
/// # Errors
///
/// Returns an error if the raster is inconsistent or encoding fails.
pub fn encode_raster_png(raster: &RasterImage) -> RenderResult<Vec<u8>> {
    encode_png(&to_rgba_image(raster)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_1X1: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg==";

    #[test]
    fn test_format_detection_from_magic_bytes() {
        assert_eq!(
            ImageFormat::from_magic_bytes(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
            ImageFormat::Png
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]),
            ImageFormat::Jpeg
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(b"RIFF\x00\x00\x00\x00WEBP"),
            ImageFormat::WebP
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"GI"), ImageFormat::Unknown);
        assert_eq!(ImageFormat::from_extension("JPG"), ImageFormat::Jpeg);
    }

    #[test]
    fn test_data_uri_parsing() {
        let image = load_image_from_data_uri(&format!("data:image/png;base64,{PNG_1X1}"))
            .expect("valid data URI");
        assert_eq!((image.width, image.height), (1, 1));
        assert_eq!(image.pixels.len(), 4);
    }

    #[test]
    fn test_invalid_data_uri() {
        assert!(matches!(
            load_image_from_data_uri("not a data uri"),
            Err(RenderError::DataUri(_))
        ));
        assert!(matches!(
            load_image_from_data_uri("data:image/png"),
            Err(RenderError::DataUri(_))
        ));
        assert!(matches!(
            load_image_from_data_uri("data:image/png;base64,AAAA"),
            Err(RenderError::Decode(_))
        ));
    }

    #[test]
    fn test_percent_encoded_payload() {
        assert_eq!(
            decode_data_uri("data:text/plain,a%20b%2Cc").expect("decode"),
            b"a b,c".to_vec()
        );
        assert!(decode_data_uri("data:text/plain,%G1").is_err());
        assert!(decode_data_uri("data:text/plain,%4").is_err());
    }

    #[test]
    fn test_encode_data_uri_round_trips() {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(PNG_1X1)
            .expect("fixture");
        let uri = encode_data_uri(&bytes, "");
        assert!(uri.starts_with("data:image/png;base64,"));
        assert_eq!(decode_data_uri(&uri).expect("decode"), bytes);
        assert!(encode_data_uri(&bytes, "image/x-custom").starts_with("data:image/x-custom;"));
    }

    #[test]
    fn test_png_encoding() {
        let raster = RasterImage::solid(3, 2, [255, 0, 0, 255]);
        let png = encode_png(&to_rgba_image(&raster).expect("buffer")).expect("png");
        assert_eq!(&png[0..4], &[137, 80, 78, 71]);
        let back = load_image_from_bytes(&png).expect("decode");
        assert_eq!(back, raster);
    }

    #[test]
    fn test_file_data_uri_mime_from_extension() {
        let png = encode_raster_png(&RasterImage::solid(1, 1, [0, 0, 0, 255])).expect("png");
        assert!(encode_file_data_uri(Path::new("bg.PNG"), &png).starts_with("data:image/png;base64,"));
        assert!(encode_file_data_uri(Path::new("photo.jpeg"), b"x").starts_with("data:image/jpeg;"));
        // No usable extension: sniffed from the bytes.
        assert!(encode_file_data_uri(Path::new("upload"), &png).starts_with("data:image/png;"));
    }
}
