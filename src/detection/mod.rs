//! Detection overlay analysis
//!
//! The prediction service paints detected solar panels with a magenta colour
//! key. This module decides, from a sparse sample of the returned image,
//! whether such an overlay is present.

mod detector;
mod mask;

pub use detector::MaskDetector;
pub use mask::{decode_rgba, detect_mask, is_magenta_like, scan_rgba};

use serde::{Deserialize, Serialize};

/// Default distance between sampled pixels.
pub const DEFAULT_STRIDE_PIXELS: usize = 100;

/// Default hit cutoff; the overlay is reported once hits exceed this.
pub const DEFAULT_MIN_HITS: u32 = 8;

/// Outcome of a mask check.
///
/// `Unknown` means the image could not be analysed at all and must not be
/// read as "no panels".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskVerdict {
    Present,
    Absent,
    Unknown,
}

impl MaskVerdict {
    pub fn is_determined(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl std::fmt::Display for MaskVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Absent => write!(f, "absent"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Sampling parameters for the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskParams {
    /// Pixels skipped between samples (the byte cursor advances 4x this).
    pub stride_pixels: usize,
    /// Report the overlay once more than this many samples are magenta.
    pub min_hits: u32,
}

impl MaskParams {
    /// Byte distance between samples in an RGBA buffer. Never zero.
    pub fn byte_stride(&self) -> usize {
        self.stride_pixels.max(1) * 4
    }
}

impl Default for MaskParams {
    fn default() -> Self {
        Self {
            stride_pixels: DEFAULT_STRIDE_PIXELS,
            min_hits: DEFAULT_MIN_HITS,
        }
    }
}
