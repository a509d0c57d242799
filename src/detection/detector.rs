use image::RgbaImage;
use tracing::{debug, warn};

use super::mask::{decode_rgba, verdict_for};
use super::{MaskParams, MaskVerdict};

/// Mask detector that keeps the most recently decoded bitmap.
///
/// At most one bitmap is retained. Every call to [`MaskDetector::detect`]
/// drops the previous one before decoding, so a failed decode leaves the
/// detector empty rather than holding a stale image.
#[derive(Debug, Default)]
pub struct MaskDetector {
    params: MaskParams,
    bitmap: Option<RgbaImage>,
}

impl MaskDetector {
    pub fn new(params: MaskParams) -> Self {
        Self {
            params,
            bitmap: None,
        }
    }

    pub fn params(&self) -> &MaskParams {
        &self.params
    }

    /// Decode `bytes` on the blocking pool, then scan it.
    ///
    /// Not cancellable mid-scan; race it against a timeout and discard the
    /// result if that is needed.
    pub async fn detect(&mut self, bytes: Vec<u8>) -> MaskVerdict {
        self.release();

        let decoded = tokio::task::spawn_blocking(move || decode_rgba(&bytes)).await;

        let bitmap = match decoded {
            Ok(Ok(bitmap)) => bitmap,
            Ok(Err(e)) => {
                warn!(error = %e, "Could not decode prediction image");
                return MaskVerdict::Unknown;
            }
            Err(e) => {
                warn!(error = %e, "Image decode task did not complete");
                return MaskVerdict::Unknown;
            }
        };

        let verdict = verdict_for(&bitmap, &self.params);
        debug!(
            width = bitmap.width(),
            height = bitmap.height(),
            %verdict,
            "Mask detection finished"
        );
        self.bitmap = Some(bitmap);
        verdict
    }

    /// The bitmap from the last successful detection, if any.
    pub fn bitmap(&self) -> Option<&RgbaImage> {
        self.bitmap.as_ref()
    }

    pub fn has_bitmap(&self) -> bool {
        self.bitmap.is_some()
    }

    /// Drop the retained bitmap.
    pub fn release(&mut self) {
        if self.bitmap.take().is_some() {
            debug!("Released previous bitmap");
        }
    }
}
