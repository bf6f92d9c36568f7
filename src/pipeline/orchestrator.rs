use std::time::Instant;

use super::confidence::{mean_confidence, warn_if_low};
use super::dedup::deduplicate;
use super::extractor::extract;
use super::progress::{ocr_fraction, ProgressTracker, DONE, EXTRACTED};
use super::sanitize::sanitize_ocr_text;
use super::types::{
    OcrEngine, OcrPageResult, OcrSession, PdfPageRenderer, PipelineResult, RawPage,
    ValidatedProduct,
};
use super::validation::validate;
use super::ExtractionError;
use crate::config::{PipelineConfig, DEFAULT_MAX_PDF_PAGES};

/// Flyer-to-products pipeline.
/// Uses trait objects for OCR and PDF rasterization, enabling dependency injection.
///
/// Every entry point runs sequentially and keeps no state between calls, so
/// one pipeline can serve independent calls from several threads.
pub struct FlyerPipeline {
    ocr_engine: Box<dyn OcrEngine>,
    pdf_renderer: Option<Box<dyn PdfPageRenderer>>,
    config: PipelineConfig,
}

impl FlyerPipeline {
    pub fn new(ocr_engine: Box<dyn OcrEngine>) -> Self {
        Self {
            ocr_engine,
            pdf_renderer: None,
            config: PipelineConfig::default(),
        }
    }

    /// Add a PDF page renderer, required by `process_pdf`.
    pub fn with_pdf_renderer(mut self, renderer: Box<dyn PdfPageRenderer>) -> Self {
        self.pdf_renderer = Some(renderer);
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// OCR a single flyer image and extract its products.
    pub fn process_flyer<F>(
        &self,
        image: &[u8],
        mut on_progress: F,
    ) -> Result<PipelineResult, ExtractionError>
    where
        F: FnMut(f32) -> Result<(), ExtractionError>,
    {
        let started = Instant::now();
        tracing::info!(bytes = image.len(), "Processing flyer image");

        let mut tracker = ProgressTracker::new(&mut on_progress);
        tracker.report(0.0)?;

        let page = {
            let mut session = self.ocr_engine.open_session(&self.config.recognition)?;
            recognize_page(&mut *session, image, 0, 1, &mut tracker)?
        };
        warn_if_low(0, page.confidence);

        let pages = vec![RawPage {
            text: page.text,
            ocr_confidence: page.confidence,
        }];
        let result = run_stages(&pages, mean_confidence(&pages), &mut tracker)?;
        log_complete(&result, started);
        Ok(result)
    }

    /// Rasterize and OCR a flyer PDF, one page at a time.
    ///
    /// At most `config.max_pdf_pages` pages are processed, never more than
    /// `DEFAULT_MAX_PDF_PAGES`; later pages are skipped.
    pub fn process_pdf<F>(
        &self,
        pdf: &[u8],
        mut on_progress: F,
    ) -> Result<PipelineResult, ExtractionError>
    where
        F: FnMut(f32) -> Result<(), ExtractionError>,
    {
        let started = Instant::now();
        let renderer = self
            .pdf_renderer
            .as_deref()
            .ok_or(ExtractionError::NoRenderer)?;

        let total_pages = renderer.page_count(pdf)?;
        let page_count = total_pages
            .min(self.config.max_pdf_pages)
            .min(DEFAULT_MAX_PDF_PAGES);
        if total_pages > page_count {
            tracing::warn!(
                total_pages,
                processed = page_count,
                "PDF page count exceeds limit, skipping remaining pages"
            );
        }
        tracing::info!(bytes = pdf.len(), pages = page_count, "Processing flyer PDF");

        let mut tracker = ProgressTracker::new(&mut on_progress);
        tracker.report(0.0)?;

        let mut pages = Vec::with_capacity(page_count);
        {
            let mut session = self.ocr_engine.open_session(&self.config.recognition)?;
            for page_index in 0..page_count {
                let png = renderer.render_page(pdf, page_index, self.config.render_scale)?;
                let page = recognize_page(
                    &mut *session,
                    &png,
                    page_index,
                    page_count,
                    &mut tracker,
                )?;
                warn_if_low(page_index, page.confidence);
                tracing::debug!(
                    page = page_index + 1,
                    chars = page.text.len(),
                    confidence = page.confidence,
                    "PDF page recognized"
                );
                pages.push(RawPage {
                    text: page.text,
                    ocr_confidence: page.confidence,
                });
                tracker.report(ocr_fraction(page_index + 1, page_count, 0.0))?;
            }
        }

        let result = run_stages(&pages, mean_confidence(&pages), &mut tracker)?;
        log_complete(&result, started);
        Ok(result)
    }

    /// Extract products from text that was already recognized.
    pub fn process_text<F>(
        &self,
        text: &str,
        mut on_progress: F,
    ) -> Result<PipelineResult, ExtractionError>
    where
        F: FnMut(f32) -> Result<(), ExtractionError>,
    {
        let started = Instant::now();
        let mut tracker = ProgressTracker::new(&mut on_progress);
        let pages = [RawPage {
            text: text.to_string(),
            ocr_confidence: 0.0,
        }];
        tracker.report(ocr_fraction(1, 1, 0.0))?;
        let result = run_stages(&pages, None, &mut tracker)?;
        log_complete(&result, started);
        Ok(result)
    }

    /// Extract products from pages recognized elsewhere, keeping their OCR confidence.
    pub fn process_pages<F>(
        &self,
        pages: &[RawPage],
        mut on_progress: F,
    ) -> Result<PipelineResult, ExtractionError>
    where
        F: FnMut(f32) -> Result<(), ExtractionError>,
    {
        let started = Instant::now();
        let mut tracker = ProgressTracker::new(&mut on_progress);
        for (page_index, page) in pages.iter().enumerate() {
            warn_if_low(page_index, page.ocr_confidence);
        }
        tracker.report(ocr_fraction(pages.len(), pages.len(), 0.0))?;
        let result = run_stages(pages, mean_confidence(pages), &mut tracker)?;
        log_complete(&result, started);
        Ok(result)
    }
}

/// Run extraction on plain text without OCR or progress reporting.
pub fn process_text(text: &str) -> PipelineResult {
    let pages = [RawPage {
        text: text.to_string(),
        ocr_confidence: 0.0,
    }];
    unify(extract_stage(&pages), pages.len(), None)
}

/// Recognize one page, mapping engine progress into the OCR share.
///
/// The session's progress hook cannot fail, so a callback error is held and
/// returned once the engine hands control back.
fn recognize_page(
    session: &mut dyn OcrSession,
    image: &[u8],
    page_index: usize,
    page_count: usize,
    tracker: &mut ProgressTracker<'_>,
) -> Result<OcrPageResult, ExtractionError> {
    let mut callback_error = None;
    let result = session.recognize(image, &mut |fraction| {
        if callback_error.is_none() {
            if let Err(e) = tracker.report(ocr_fraction(page_index, page_count, fraction)) {
                callback_error = Some(e);
            }
        }
    });
    let page = result?;
    match callback_error {
        Some(e) => Err(e),
        None => Ok(page),
    }
}

/// Sanitize, extract and validate (→0.9), then deduplicate (→1.0).
fn run_stages(
    pages: &[RawPage],
    ocr_confidence: Option<f32>,
    tracker: &mut ProgressTracker<'_>,
) -> Result<PipelineResult, ExtractionError> {
    let extracted = extract_stage(pages);
    tracker.report(EXTRACTED)?;
    let result = unify(extracted, pages.len(), ocr_confidence);
    tracker.report(DONE)?;
    Ok(result)
}

struct Extracted {
    raw_text: String,
    validated: Vec<ValidatedProduct>,
    total_found: usize,
}

fn extract_stage(pages: &[RawPage]) -> Extracted {
    let raw_text = pages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let candidates = extract(&sanitize_ocr_text(&raw_text));
    let total_found = candidates.len();
    Extracted {
        raw_text,
        validated: validate(candidates),
        total_found,
    }
}

fn unify(
    extracted: Extracted,
    pages_processed: usize,
    ocr_confidence: Option<f32>,
) -> PipelineResult {
    let valid_count = extracted.validated.len();
    PipelineResult {
        products: deduplicate(extracted.validated),
        ocr_confidence,
        raw_text: extracted.raw_text,
        total_found: extracted.total_found,
        valid_count,
        pages_processed,
    }
}

fn log_complete(result: &PipelineResult, started: Instant) {
    tracing::info!(
        pages = result.pages_processed,
        found = result.total_found,
        valid = result.valid_count,
        products = result.products.len(),
        confidence = ?result.ocr_confidence,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Flyer processing complete"
    );
}
