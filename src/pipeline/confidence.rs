use super::types::{OcrWordResult, RawPage};

/// OCR confidence thresholds (0-100 scale) used for log levels.
pub mod thresholds {
    /// Below this: OCR output is mostly noise. Extraction will likely find little.
    pub const VERY_LOW: f32 = 30.0;

    /// Below this: expect misread prices and names.
    pub const LOW: f32 = 60.0;
}

/// Plain mean of per-page OCR confidence. `None` when no page was processed.
///
/// A mean is order-independent, so pages may be accumulated in any order.
pub fn mean_confidence(pages: &[RawPage]) -> Option<f32> {
    if pages.is_empty() {
        return None;
    }
    let sum: f32 = pages.iter().map(|p| p.ocr_confidence).sum();
    Some(sum / pages.len() as f32)
}

/// Page-level confidence from word-level results: mean of words the engine scored.
pub fn page_confidence(words: &[OcrWordResult]) -> f32 {
    let scored: Vec<f32> = words
        .iter()
        .map(|w| w.confidence)
        .filter(|c| *c >= 0.0)
        .collect();
    if scored.is_empty() {
        return 0.0;
    }
    scored.iter().sum::<f32>() / scored.len() as f32
}

/// Log a warning when a page's OCR confidence suggests poor extraction.
pub fn warn_if_low(page_index: usize, confidence: f32) {
    if confidence < thresholds::VERY_LOW {
        tracing::warn!(page = page_index + 1, confidence, "Very low OCR confidence");
    } else if confidence < thresholds::LOW {
        tracing::debug!(page = page_index + 1, confidence, "Low OCR confidence");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(confidence: f32) -> RawPage {
        RawPage {
            text: String::new(),
            ocr_confidence: confidence,
        }
    }

    fn word(confidence: f32) -> OcrWordResult {
        OcrWordResult {
            text: "x".into(),
            confidence,
            line_key: (1, 1, 1),
        }
    }

    #[test]
    fn mean_of_pages() {
        let conf = mean_confidence(&[page(80.0), page(60.0), page(70.0)]).unwrap();
        assert!((conf - 70.0).abs() < 1e-4);
    }

    #[test]
    fn mean_is_order_independent() {
        let a = mean_confidence(&[page(91.0), page(42.0)]).unwrap();
        let b = mean_confidence(&[page(42.0), page(91.0)]).unwrap();
        assert!((a - b).abs() < f32::EPSILON);
    }

    #[test]
    fn no_pages_no_confidence() {
        assert_eq!(mean_confidence(&[]), None);
    }

    #[test]
    fn page_confidence_ignores_unscored_words() {
        let conf = page_confidence(&[word(90.0), word(-1.0), word(70.0)]);
        assert!((conf - 80.0).abs() < 1e-4);
    }

    #[test]
    fn page_confidence_empty_is_zero() {
        assert_eq!(page_confidence(&[]), 0.0);
        assert_eq!(page_confidence(&[word(-1.0)]), 0.0);
    }

    #[test]
    fn thresholds_are_ordered() {
        assert!(thresholds::VERY_LOW < thresholds::LOW);
    }
}
