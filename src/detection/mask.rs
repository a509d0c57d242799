use image::RgbaImage;
use tracing::debug;

use super::{MaskParams, MaskVerdict};
use crate::error::{Result, SolarDetectError};

/// Red and blue must both exceed this.
const MAGENTA_MIN_RED_BLUE: u8 = 140;

/// Green must stay below this.
const MAGENTA_MAX_GREEN: u8 = 120;

/// Magenta-like: strong red and blue, weak green.
#[inline]
pub fn is_magenta_like(r: u8, g: u8, b: u8) -> bool {
    r > MAGENTA_MIN_RED_BLUE && b > MAGENTA_MIN_RED_BLUE && g < MAGENTA_MAX_GREEN
}

/// Sample a flat row-major RGBA buffer and report whether the overlay is
/// present. Stops at the first sample that pushes the hit count past
/// `params.min_hits`.
pub fn scan_rgba(buf: &[u8], params: &MaskParams) -> bool {
    let stride = params.byte_stride();
    let mut hits = 0u32;
    let mut cursor = 0usize;

    while cursor + 4 <= buf.len() {
        if is_magenta_like(buf[cursor], buf[cursor + 1], buf[cursor + 2]) {
            hits += 1;
            if hits > params.min_hits {
                debug!(hits, cursor, "Mask threshold reached");
                return true;
            }
        }
        cursor += stride;
    }

    debug!(hits, "Mask scan finished below threshold");
    false
}

/// Decode an encoded image (PNG, JPEG, WebP, ...) into an RGBA bitmap.
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| SolarDetectError::Decode(format!("failed to decode image: {}", e)))?;

    if img.width() == 0 || img.height() == 0 {
        return Err(SolarDetectError::Decode("image dimensions are zero".to_string()));
    }
    Ok(img.to_rgba8())
}

/// Decode and scan in one synchronous step.
pub fn detect_mask(bytes: &[u8], params: &MaskParams) -> MaskVerdict {
    match decode_rgba(bytes) {
        Ok(bitmap) => verdict_for(&bitmap, params),
        Err(e) => {
            debug!(error = %e, "Mask detection undetermined");
            MaskVerdict::Unknown
        }
    }
}

pub(super) fn verdict_for(bitmap: &RgbaImage, params: &MaskParams) -> MaskVerdict {
    if scan_rgba(bitmap.as_raw(), params) {
        MaskVerdict::Present
    } else {
        MaskVerdict::Absent
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    /// PNG-encode a solid-colour image.
    pub fn solid_png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
        encode_png(&RgbaImage::from_pixel(
            width,
            height,
            Rgba([rgb[0], rgb[1], rgb[2], 255]),
        ))
    }

    pub fn encode_png(img: &RgbaImage) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png)
            .expect("PNG encoding of an in-memory image");
        buffer.into_inner()
    }
}
