use super::ExtractionError;

/// Fraction of overall progress reserved for OCR (and rasterization).
pub const OCR_SHARE: f32 = 0.7;

/// Progress reported once extraction and validation are done.
pub const EXTRACTED: f32 = 0.9;

pub const DONE: f32 = 1.0;

/// Wraps a caller's progress callback.
///
/// Reported values are clamped to `[0, 1]` and never decrease. An error
/// returned by the callback aborts the pipeline call.
pub struct ProgressTracker<'a> {
    callback: &'a mut dyn FnMut(f32) -> Result<(), ExtractionError>,
    last: f32,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(callback: &'a mut dyn FnMut(f32) -> Result<(), ExtractionError>) -> Self {
        Self {
            callback,
            last: 0.0,
        }
    }

    pub fn report(&mut self, fraction: f32) -> Result<(), ExtractionError> {
        let value = if fraction.is_nan() {
            self.last
        } else {
            fraction.clamp(0.0, DONE).max(self.last)
        };
        self.last = value;
        (self.callback)(value)
    }
}

/// Map OCR progress on page `page_index` of `page_count` into the OCR share.
pub fn ocr_fraction(page_index: usize, page_count: usize, page_progress: f32) -> f32 {
    if page_count == 0 {
        return OCR_SHARE;
    }
    let page_progress = page_progress.clamp(0.0, 1.0);
    (page_index as f32 + page_progress) / page_count as f32 * OCR_SHARE
}
