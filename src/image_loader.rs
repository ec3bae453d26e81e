//! # Image Loading and Probing
//!
//! Loads images from file paths, data URIs, or raw base64 strings. Layout
//! only needs an image's pixel size and resolution, so [`ImageCache::probe`]
//! reads headers and remembers the result per source; the PDF backend calls
//! [`load_image`] for the pixels.
//!
//! JPEG images pass through without re-encoding (DCTDecode). PNG and WebP
//! images are decoded to RGB pixels with a separate alpha channel for SMask
//! transparency.
//!
//! Probing never fails layout. A source that cannot be used is classified as
//! an [`ImageFailure`] and the image is drawn as a placeholder.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Cursor;

/// Why an image could not be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ImageFailure {
    #[error("Image not found")]
    FileNotFound,
    #[error("Image has an invalid type")]
    InvalidType,
    #[error("Image could not be read")]
    NotRead,
    #[error("Image has an empty size")]
    EmptySize,
}

/// Header facts about a usable image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageProbe {
    pub width_px: u32,
    pub height_px: u32,
    /// Horizontal resolution stored in the file, if any.
    pub dpi: Option<f64>,
}

/// Probe results keyed by source string.
#[derive(Debug, Default)]
pub struct ImageCache {
    entries: RefCell<HashMap<String, Result<ImageProbe, ImageFailure>>>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe(&self, source: &str) -> Result<ImageProbe, ImageFailure> {
        if let Some(cached) = self.entries.borrow().get(source) {
            return *cached;
        }
        let result = probe_source(source);
        if let Err(failure) = result {
            tracing::warn!(source = %abbreviate(source), %failure, "image replaced by placeholder");
        }
        self.entries.borrow_mut().insert(source.to_string(), result);
        result
    }
}

/// Data URIs can be megabytes long; logs get the start only.
fn abbreviate(source: &str) -> &str {
    match source.char_indices().nth(64) {
        Some((i, _)) => &source[..i],
        None => source,
    }
}

fn probe_source(source: &str) -> Result<ImageProbe, ImageFailure> {
    let bytes = match read_source_bytes(source) {
        Ok(bytes) => bytes,
        Err(_) if is_path(source) => return Err(ImageFailure::FileNotFound),
        Err(_) => return Err(ImageFailure::NotRead),
    };
    probe_bytes(&bytes)
}

fn probe_bytes(data: &[u8]) -> Result<ImageProbe, ImageFailure> {
    let dpi = if is_jpeg(data) {
        jfif_dpi(data)
    } else if is_png(data) {
        png_dpi(data)
    } else if is_webp(data) {
        None
    } else {
        return Err(ImageFailure::InvalidType);
    };
    let (width_px, height_px) = image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|_| ImageFailure::NotRead)?
        .into_dimensions()
        .map_err(|_| ImageFailure::NotRead)?;
    if width_px == 0 || height_px == 0 {
        return Err(ImageFailure::EmptySize);
    }
    Ok(ImageProbe {
        width_px,
        height_px,
        dpi,
    })
}

/// A fully decoded/loaded image ready for PDF embedding.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub pixel_data: ImagePixelData,
    pub width_px: u32,
    pub height_px: u32,
}

/// The pixel data in a format the PDF serializer can consume directly.
#[derive(Debug, Clone)]
pub enum ImagePixelData {
    /// Raw JPEG bytes, embedded directly with DCTDecode.
    Jpeg {
        data: Vec<u8>,
        color_space: JpegColorSpace,
    },
    /// Decoded RGB pixels + optional alpha channel.
    Decoded {
        /// width * height * 3 bytes (RGB)
        rgb: Vec<u8>,
        /// width * height bytes (grayscale alpha). None if fully opaque.
        alpha: Option<Vec<u8>>,
    },
}

/// JPEG color space for the PDF /ColorSpace entry.
#[derive(Debug, Clone, Copy)]
pub enum JpegColorSpace {
    DeviceRGB,
    DeviceGray,
}

/// Load an image from a source string.
///
/// Supported `src` formats:
/// - `data:image/...;base64,...` data URI
/// - File path (absolute or relative), read from disk
/// - Raw base64-encoded image data
pub fn load_image(src: &str) -> Result<LoadedImage, String> {
    let raw_bytes = read_source_bytes(src)?;
    decode_image_bytes(&raw_bytes)
}

fn is_path(src: &str) -> bool {
    src.starts_with('/') || src.starts_with("./") || src.starts_with("../")
}

/// Resolve a source string (data URI, path, raw base64) to bytes. Fonts use
/// the same rules.
pub fn read_source_bytes(src: &str) -> Result<Vec<u8>, String> {
    if let Some(rest) = src.strip_prefix("data:") {
        let comma_pos = rest
            .find(',')
            .ok_or_else(|| "Invalid data URI: missing comma".to_string())?;
        return base64_decode(&rest[comma_pos + 1..]);
    }

    // Only explicit path prefixes count as paths: base64 contains '/'.
    if is_path(src) {
        return std::fs::read(src).map_err(|e| format!("Failed to read file '{}': {}", src, e));
    }

    base64_decode(src)
}

fn base64_decode(input: &str) -> Result<Vec<u8>, String> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(input.trim())
        .map_err(|e| format!("Base64 decode error: {}", e))
}

/// Detect image format from magic bytes and decode accordingly.
fn decode_image_bytes(data: &[u8]) -> Result<LoadedImage, String> {
    if data.len() < 4 {
        return Err("Image data too short".to_string());
    }

    if is_jpeg(data) {
        decode_jpeg(data)
    } else if is_png(data) || is_webp(data) {
        decode_to_rgb(data)
    } else {
        Err("Unsupported image format (expected JPEG, PNG or WebP)".to_string())
    }
}

fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8
}

fn is_png(data: &[u8]) -> bool {
    data.len() >= 4 && data[0] == 0x89 && data[1] == 0x50 && data[2] == 0x4E && data[3] == 0x47
}

fn is_webp(data: &[u8]) -> bool {
    data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP"
}

/// JPEG: read dimensions and color space without decoding pixels.
fn decode_jpeg(data: &[u8]) -> Result<LoadedImage, String> {
    let (width, height) = image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| format!("JPEG format detection error: {}", e))?
        .into_dimensions()
        .map_err(|e| format!("Failed to read JPEG dimensions: {}", e))?;

    Ok(LoadedImage {
        pixel_data: ImagePixelData::Jpeg {
            data: data.to_vec(),
            color_space: detect_jpeg_color_space(data),
        },
        width_px: width,
        height_px: height,
    })
}

/// Walk JPEG segments, calling `visit` with each marker and its payload
/// until it returns a value.
fn scan_jpeg_segments<T>(data: &[u8], mut visit: impl FnMut(u8, &[u8]) -> Option<T>) -> Option<T> {
    let mut i = 2; // skip SOI
    while i + 3 < data.len() {
        if data[i] != 0xFF {
            return None;
        }
        let marker = data[i + 1];
        let seg_len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        let end = (i + 2 + seg_len).min(data.len());
        let payload = data.get(i + 4..end).unwrap_or(&[]);
        if let Some(found) = visit(marker, payload) {
            return Some(found);
        }
        i += 2 + seg_len;
    }
    None
}

/// One component in the SOF segment means grayscale.
fn detect_jpeg_color_space(data: &[u8]) -> JpegColorSpace {
    let is_sof = |m: u8| matches!(m, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF);
    scan_jpeg_segments(data, |marker, payload| {
        // precision(1) + height(2) + width(2) + num_components(1)
        if is_sof(marker) && payload.len() > 5 {
            Some(if payload[5] == 1 {
                JpegColorSpace::DeviceGray
            } else {
                JpegColorSpace::DeviceRGB
            })
        } else {
            None
        }
    })
    .unwrap_or(JpegColorSpace::DeviceRGB)
}

/// Horizontal density from a JFIF APP0 segment.
fn jfif_dpi(data: &[u8]) -> Option<f64> {
    scan_jpeg_segments(data, |marker, payload| {
        if marker != 0xE0 || payload.len() < 12 || &payload[0..5] != b"JFIF\0" {
            return None;
        }
        let units = payload[7];
        let x = u16::from_be_bytes([payload[8], payload[9]]) as f64;
        match units {
            1 if x > 0.0 => Some(Some(x)),
            2 if x > 0.0 => Some(Some(x * 2.54)),
            _ => Some(None),
        }
    })
    .flatten()
}

/// Horizontal density from a PNG pHYs chunk (pixels per metre).
fn png_dpi(data: &[u8]) -> Option<f64> {
    let mut i = 8;
    while i + 8 <= data.len() {
        let len = u32::from_be_bytes([data[i], data[i + 1], data[i + 2], data[i + 3]]) as usize;
        let kind = &data[i + 4..i + 8];
        if kind == b"IDAT" {
            return None;
        }
        if kind == b"pHYs" && i + 8 + 9 <= data.len() {
            let body = &data[i + 8..i + 17];
            let ppu = u32::from_be_bytes([body[0], body[1], body[2], body[3]]) as f64;
            return (body[8] == 1 && ppu > 0.0).then_some(ppu * 0.0254);
        }
        i += 12 + len;
    }
    None
}

/// PNG/WebP: decode to RGBA, split into RGB + alpha.
fn decode_to_rgb(data: &[u8]) -> Result<LoadedImage, String> {
    let img = image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| format!("Image format detection error: {}", e))?
        .decode()
        .map_err(|e| format!("Failed to decode image: {}", e))?;

    let rgba = img.to_rgba8();
    let width = rgba.width();
    let height = rgba.height();

    let pixel_count = (width * height) as usize;
    let mut rgb = Vec::with_capacity(pixel_count * 3);
    let mut alpha = Vec::with_capacity(pixel_count);
    let mut has_transparency = false;

    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel[3]);
        has_transparency |= pixel[3] != 255;
    }

    Ok(LoadedImage {
        pixel_data: ImagePixelData::Decoded {
            rgb,
            alpha: has_transparency.then_some(alpha),
        },
        width_px: width,
        height_px: height,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn png_data_uri(width: u32, height: u32) -> String {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([0, 255, 0, 255]));
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            width,
            height,
            image::ColorType::Rgba8,
        )
        .unwrap();
        use base64::Engine;
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&buf)
        )
    }

    #[test]
    fn test_magic_bytes() {
        assert!(is_jpeg(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(!is_jpeg(&[0x89, 0x50, 0x4E, 0x47]));
        assert!(is_png(&[0x89, 0x50, 0x4E, 0x47]));
        assert!(!is_png(&[0x89, 0x50]));
        assert!(is_webp(b"RIFF\0\0\0\0WEBPVP8 "));
    }

    #[test]
    fn test_invalid_data_uri() {
        assert!(load_image("data:image/png;base64").is_err());
    }

    #[test]
    fn test_failures_are_classified() {
        let cache = ImageCache::new();
        assert_eq!(
            cache.probe("./definitely/not/here.png"),
            Err(ImageFailure::FileNotFound)
        );
        assert_eq!(cache.probe("AAAAAAAA"), Err(ImageFailure::InvalidType));
        assert_eq!(cache.probe("%%%"), Err(ImageFailure::NotRead));
        let truncated = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(probe_bytes(&truncated), Err(ImageFailure::NotRead));
    }

    #[test]
    fn test_probe_reads_dimensions_and_caches() {
        let cache = ImageCache::new();
        let src = png_data_uri(3, 2);
        let probe = cache.probe(&src).unwrap();
        assert_eq!((probe.width_px, probe.height_px), (3, 2));
        assert_eq!(cache.entries.borrow().len(), 1);
        assert_eq!(cache.probe(&src), Ok(probe));
    }

    #[test]
    fn test_decode_png_with_alpha() {
        let mut img = image::RgbaImage::new(1, 1);
        img.put_pixel(0, 0, image::Rgba([255, 0, 0, 128]));
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), 1, 1, image::ColorType::Rgba8)
            .unwrap();

        let loaded = decode_image_bytes(&buf).unwrap();
        match &loaded.pixel_data {
            ImagePixelData::Decoded { rgb, alpha } => {
                assert_eq!(rgb, &[255, 0, 0]);
                assert_eq!(alpha.as_ref().unwrap(), &[128]);
            }
            _ => panic!("PNG should decode to Decoded variant"),
        }
    }

    #[test]
    fn test_decode_minimal_jpeg() {
        let img = image::RgbImage::from_fn(2, 2, |_, _| image::Rgb([0, 128, 255]));
        let mut buf = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), 2, 2, image::ColorType::Rgb8)
            .unwrap();

        let loaded = decode_image_bytes(&buf).unwrap();
        assert_eq!((loaded.width_px, loaded.height_px), (2, 2));
        match &loaded.pixel_data {
            ImagePixelData::Jpeg { data, color_space } => {
                assert!(data.starts_with(&[0xFF, 0xD8]));
                assert!(matches!(color_space, JpegColorSpace::DeviceRGB));
            }
            _ => panic!("JPEG should stay as Jpeg variant"),
        }
    }
}
