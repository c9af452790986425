//! Image decoding and normalisation.
//!
//! Layer sources and service responses arrive as [`ImagePayload`]s in
//! whatever format the producer chose. These helpers sniff the format,
//! decode to RGBA and re-encode as PNG where a uniform format is needed.

use image::ImageEncoder;
use studio_core::ImagePayload;

use crate::error::{RenderError, RenderResult};

/// Decoded RGBA pixels.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA pixel data (4 bytes per pixel, not premultiplied).
    pub data: Vec<u8>,
    /// Format the pixels were decoded from.
    pub format: ImageFormat,
}

/// Image formats the studio accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG with alpha support.
    Png,
    /// JPEG (no alpha).
    Jpeg,
    /// WebP (alpha support).
    WebP,
    /// GIF (first frame only).
    Gif,
    /// SVG, rasterized at its intrinsic size.
    Svg,
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
            "gif" => Self::Gif,
            "svg" => Self::Svg,
            _ => Self::Unknown,
        }
    }

    /// Detect format from MIME type.
    #[must_use]
    pub fn from_mime(mime: &str) -> Self {
        match mime.to_lowercase().as_str() {
            "image/png" => Self::Png,
            "image/jpeg" | "image/jpg" => Self::Jpeg,
            "image/webp" => Self::WebP,
            "image/gif" => Self::Gif,
            "image/svg+xml" => Self::Svg,
            _ => Self::Unknown,
        }
    }

    /// Detect format from magic bytes.
    #[must_use]
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.len() < 4 {
            return Self::Unknown;
        }

        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Self::Png;
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Self::Jpeg;
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Self::WebP;
        }

        if data.starts_with(b"GIF8") {
            return Self::Gif;
        }

        let head = String::from_utf8_lossy(&data[..data.len().min(256)]);
        let head = head.trim_start();
        if head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg")) {
            return Self::Svg;
        }

        Self::Unknown
    }

    /// Canonical MIME type, `None` for unknown formats.
    #[must_use]
    pub const fn mime_type(self) -> Option<&'static str> {
        match self {
            Self::Png => Some("image/png"),
            Self::Jpeg => Some("image/jpeg"),
            Self::WebP => Some("image/webp"),
            Self::Gif => Some("image/gif"),
            Self::Svg => Some("image/svg+xml"),
            Self::Unknown => None,
        }
    }
}

/// Wrap raw file bytes in a payload, sniffing the MIME type.
///
/// # Errors
///
/// Returns an error if the bytes are not a recognised image format.
pub fn payload_from_bytes(bytes: Vec<u8>) -> RenderResult<ImagePayload> {
    let mime = ImageFormat::from_magic_bytes(&bytes)
        .mime_type()
        .ok_or_else(|| RenderError::Resource("Unrecognised image format".to_string()))?;
    Ok(ImagePayload::new(mime, bytes))
}

/// Decode an image from raw bytes.
///
/// # Errors
///
/// Returns an error if the image cannot be decoded.
pub fn load_image_from_bytes(data: &[u8]) -> RenderResult<DecodedImage> {
    let format = ImageFormat::from_magic_bytes(data);
    if format == ImageFormat::Svg {
        return rasterize_svg_image(data);
    }

    let img = image::load_from_memory(data)
        .map_err(|e| RenderError::Resource(format!("Failed to decode image: {e}")))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    Ok(DecodedImage {
        width,
        height,
        data: rgba.into_raw(),
        format,
    })
}

/// Decode the pixels of a payload.
///
/// # Errors
///
/// Returns an error if the payload cannot be decoded.
pub fn decode_payload(payload: &ImagePayload) -> RenderResult<DecodedImage> {
    load_image_from_bytes(&payload.bytes)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn rasterize_svg_image(data: &[u8]) -> RenderResult<DecodedImage> {
    let tree = usvg::Tree::from_data(data, &usvg::Options::default())
        .map_err(|e| RenderError::Resource(format!("Failed to parse SVG: {e}")))?;
    let width = (tree.size().width().ceil() as u32).max(1);
    let height = (tree.size().height().ceil() as u32).max(1);
    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| RenderError::Resource("Failed to create pixmap".to_string()))?;
    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    let mut rgba = Vec::with_capacity(pixmap.pixels().len() * 4);
    for pixel in pixmap.pixels() {
        let color = pixel.demultiply();
        rgba.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }

    Ok(DecodedImage {
        width,
        height,
        data: rgba,
        format: ImageFormat::Svg,
    })
}

/// Encode decoded pixels as PNG.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn encode_png(image: &DecodedImage) -> RenderResult<Vec<u8>> {
    let mut buf = std::io::Cursor::new(Vec::new());
    image::codecs::png::PngEncoder::new(&mut buf)
        .write_image(
            &image.data,
            image.width,
            image.height,
            image::ColorType::Rgba8.into(),
        )
        .map_err(|e| RenderError::Export(format!("PNG encoding failed: {e}")))?;
    Ok(buf.into_inner())
}

/// Re-encode a payload as PNG with an alpha channel.
///
/// PNG input is returned unchanged.
///
/// # Errors
///
/// Returns an error if the payload cannot be decoded or encoded.
pub fn normalize_to_png(payload: &ImagePayload) -> RenderResult<ImagePayload> {
    if ImageFormat::from_magic_bytes(&payload.bytes) == ImageFormat::Png {
        return Ok(ImagePayload::new("image/png", payload.bytes.clone()));
    }
    let decoded = decode_payload(payload)?;
    Ok(ImagePayload::new("image/png", encode_png(&decoded)?))
}

/// Resize an image to fit within max dimensions while preserving aspect ratio.
///
/// Returns `None` if the image is already smaller than the max dimensions.
#[must_use]
pub fn resize_to_fit(image: &DecodedImage, max_width: u32, max_height: u32) -> Option<DecodedImage> {
    if image.width <= max_width && image.height <= max_height {
        return None;
    }

    let scale_x = f64::from(max_width) / f64::from(image.width);
    let scale_y = f64::from(max_height) / f64::from(image.height);
    let scale = scale_x.min(scale_y);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let new_width = ((f64::from(image.width) * scale) as u32).max(1);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let new_height = ((f64::from(image.height) * scale) as u32).max(1);

    let img = image::RgbaImage::from_raw(image.width, image.height, image.data.clone())?;
    let resized = image::imageops::resize(
        &img,
        new_width,
        new_height,
        image::imageops::FilterType::Lanczos3,
    );

    Some(DecodedImage {
        width: new_width,
        height: new_height,
        data: resized.into_raw(),
        format: image.format,
    })
}

/// Shrink a payload so neither side exceeds `max_side`, re-encoding as PNG.
///
/// Payloads already within bounds are returned unchanged.
///
/// # Errors
///
/// Returns an error if the payload cannot be decoded or encoded.
pub fn downscale_payload(payload: &ImagePayload, max_side: u32) -> RenderResult<ImagePayload> {
    let decoded = decode_payload(payload)?;
    match resize_to_fit(&decoded, max_side, max_side) {
        Some(resized) => {
            tracing::debug!(
                "Downscaled {}x{} image to {}x{}",
                decoded.width,
                decoded.height,
                resized.width,
                resized.height
            );
            Ok(ImagePayload::new("image/png", encode_png(&resized)?))
        }
        None => Ok(payload.clone()),
    }
}
