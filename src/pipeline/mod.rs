pub mod types;
pub mod units;
pub mod keywords;
pub mod patterns;
pub mod sanitize;
pub mod extractor;
pub mod validation;
pub mod dedup;
pub mod confidence;
pub mod progress;
pub mod ocr;
pub mod pdfium;
pub mod orchestrator;

pub use types::*;
pub use units::{compute_unit_price, parse_unit, to_canonical, ParsedUnit, Unit};
pub use extractor::extract;
pub use validation::validate;
pub use dedup::deduplicate;
pub use ocr::{MockOcrEngine, TesseractCli};
pub use pdfium::{MockPdfPageRenderer, PdfiumRenderer};
pub use orchestrator::{process_text, FlyerPipeline};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OCR initialization failed: {0}")]
    OcrInit(String),

    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),

    #[error("PDF rendering failed on page {page}: {reason}")]
    PdfRendering { page: usize, reason: String },

    #[error("PDF is password-protected")]
    PdfEncrypted,

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("No PDF renderer configured")]
    NoRenderer,

    #[error("Processing aborted: {0}")]
    Aborted(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
