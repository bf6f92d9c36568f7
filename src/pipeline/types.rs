use std::ops::Deref;

use serde::{Deserialize, Serialize};

use super::units::compute_unit_price;
use super::ExtractionError;

/// OCR output for one page, as handed to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPage {
    pub text: String,
    /// Engine confidence, 0-100.
    pub ocr_confidence: f32,
}

/// How a price was expressed on the flyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceType {
    Standard,
    /// "N pour X$" style offers. `price` holds the per-unit price.
    Bulk,
    Cents,
    Range,
}

/// Extraction confidence, derived from the priority of the matching price pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn from_priority(priority: u8) -> Self {
        match priority {
            0 | 1 => Confidence::High,
            2 => Confidence::Medium,
            _ => Confidence::Low,
        }
    }
}

/// One recognized price with its inferred product name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProduct {
    pub name: String,
    /// Currency units, rounded to cents.
    pub price: f64,
    /// Compact `<amount><unit>` form, e.g. `2l` or `500g`.
    pub volume: Option<String>,
    pub price_type: PriceType,
    pub confidence: Confidence,
    pub raw_line: String,
    pub context: String,
    /// Number of units the advertised total covered, for bulk offers.
    pub bulk_quantity: Option<u32>,
}

impl CandidateProduct {
    /// Price per canonical base unit (ml or g), when the volume is parseable.
    pub fn unit_price(&self) -> Option<f64> {
        compute_unit_price(Some(self.price), self.volume.as_deref())
    }
}

/// A candidate that passed validation. Only `validation::validate` builds these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidatedProduct(CandidateProduct);

impl ValidatedProduct {
    pub(crate) fn new(product: CandidateProduct) -> Self {
        Self(product)
    }
}

impl Deref for ValidatedProduct {
    type Target = CandidateProduct;

    fn deref(&self) -> &CandidateProduct {
        &self.0
    }
}

/// Final, deduplicated record.
pub type UnifiedProduct = ValidatedProduct;

/// The only artifact returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub products: Vec<UnifiedProduct>,
    /// Mean OCR confidence (0-100) across processed pages, if any page was processed.
    pub ocr_confidence: Option<f32>,
    pub raw_text: String,
    /// Candidates emitted by the extractor.
    pub total_found: usize,
    /// Candidates surviving validation, before deduplication.
    pub valid_count: usize,
    pub pages_processed: usize,
}

// ──────────────────────────────────────────────
// Collaborators
// ──────────────────────────────────────────────

/// Word-level OCR output.
#[derive(Debug, Clone)]
pub struct OcrWordResult {
    pub text: String,
    /// 0-100.
    pub confidence: f32,
    pub line_key: (u32, u32, u32),
}

/// Raw OCR result from the engine.
#[derive(Debug, Clone)]
pub struct OcrPageResult {
    pub text: String,
    /// Mean recognition confidence, 0-100.
    pub confidence: f32,
    pub words: Vec<OcrWordResult>,
}

/// Tesseract-style page segmentation modes relevant to flyers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSegMode {
    /// Fully automatic layout analysis; handles dense multi-column pages.
    Auto,
    SingleColumn,
    SparseText,
}

impl PageSegMode {
    pub fn tesseract_psm(&self) -> u8 {
        match self {
            PageSegMode::Auto => 3,
            PageSegMode::SingleColumn => 4,
            PageSegMode::SparseText => 11,
        }
    }
}

/// What the pipeline asks of the OCR engine. Recognition internals stay with the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionOptions {
    /// Tesseract language list, e.g. "fra+eng".
    pub languages: String,
    pub page_segmentation: PageSegMode,
    pub char_whitelist: String,
}

/// OCR engine abstraction (allows mocking for tests).
pub trait OcrEngine: Send + Sync {
    /// Start a recognition session. The session is released when dropped.
    fn open_session(
        &self,
        options: &RecognitionOptions,
    ) -> Result<Box<dyn OcrSession + '_>, ExtractionError>;
}

/// A live recognition worker, scoped to one pipeline call.
pub trait OcrSession {
    /// Recognize one image. `on_progress` receives fractions in `[0, 1]`.
    fn recognize(
        &mut self,
        image_bytes: &[u8],
        on_progress: &mut dyn FnMut(f32),
    ) -> Result<OcrPageResult, ExtractionError>;
}

/// PDF page rasterization abstraction.
pub trait PdfPageRenderer: Send + Sync {
    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError>;

    /// Render one page (0-based) to PNG bytes. `scale` multiplies the page's point size.
    fn render_page(
        &self,
        pdf_bytes: &[u8],
        page_index: usize,
        scale: f32,
    ) -> Result<Vec<u8>, ExtractionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_maps_to_confidence() {
        assert_eq!(Confidence::from_priority(1), Confidence::High);
        assert_eq!(Confidence::from_priority(2), Confidence::Medium);
        assert_eq!(Confidence::from_priority(3), Confidence::Low);
        assert_eq!(Confidence::from_priority(7), Confidence::Low);
    }

    #[test]
    fn enums_serialize_snake_case() {
        assert_eq!(serde_json::to_string(&PriceType::Bulk).unwrap(), "\"bulk\"");
        assert_eq!(serde_json::to_string(&Confidence::High).unwrap(), "\"high\"");
        assert_eq!(
            serde_json::to_string(&PageSegMode::SparseText).unwrap(),
            "\"sparse_text\""
        );
    }

    #[test]
    fn validated_product_serializes_as_plain_record() {
        let product = ValidatedProduct::new(CandidateProduct {
            name: "lait 2l".into(),
            price: 3.99,
            volume: Some("2l".into()),
            price_type: PriceType::Standard,
            confidence: Confidence::High,
            raw_line: "Lait 2L 3.99$".into(),
            context: "Lait 2L".into(),
            bulk_quantity: None,
        });
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["name"], "lait 2l");
        assert_eq!(json["price_type"], "standard");
        assert_eq!(product.name, "lait 2l");
    }

    #[test]
    fn candidate_unit_price_uses_volume() {
        let product = CandidateProduct {
            name: "farine".into(),
            price: 5.0,
            volume: Some("500g".into()),
            price_type: PriceType::Standard,
            confidence: Confidence::High,
            raw_line: String::new(),
            context: String::new(),
            bulk_quantity: None,
        };
        let unit = product.unit_price().unwrap();
        assert!((unit - 0.01).abs() < 1e-9);
    }
}
