//! PDFium-backed page rasterizer for flyer PDFs.
//!
//! `Pdfium` is `!Send`, so the renderer binds the library again for every
//! call and stays a zero-sized `Send + Sync` handle itself.

use std::io::Cursor;
use std::path::Path;
use std::sync::Mutex;

use image::{DynamicImage, GrayImage, ImageOutputFormat, Luma};
use pdfium_render::prelude::*;
use tracing::{debug, warn};

use super::types::PdfPageRenderer;
use super::ExtractionError;

/// Explicit path to the PDFium shared library.
const PDFIUM_PATH_ENV: &str = "PDFIUM_DYNAMIC_LIB_PATH";

/// Longest side of a rasterized page, in pixels.
const MAX_DIMENSION_PX: u32 = 4096;

/// Rasterizes flyer pages to PNG.
pub struct PdfiumRenderer;

impl PdfiumRenderer {
    /// Fails when no PDFium library can be bound. Lookup goes
    /// `PDFIUM_DYNAMIC_LIB_PATH`, then the executable's directory, then the
    /// system search path.
    pub fn new() -> Result<Self, ExtractionError> {
        bind_library()?;
        Ok(Self)
    }
}

fn library_error(reason: String) -> ExtractionError {
    ExtractionError::PdfRendering { page: 0, reason }
}

fn bind_library() -> Result<Pdfium, ExtractionError> {
    if let Ok(path) = std::env::var(PDFIUM_PATH_ENV) {
        debug!(path = %path, "Binding PDFium from {PDFIUM_PATH_ENV}");
        return Pdfium::bind_to_library(&path)
            .map(Pdfium::new)
            .map_err(|e| library_error(format!("cannot load PDFium from {path}: {e}")));
    }

    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    if let Some(dir) = exe_dir {
        let candidate =
            Pdfium::pdfium_platform_library_name_at_path(dir.to_string_lossy().as_ref());
        if let Ok(bindings) = Pdfium::bind_to_library(&candidate) {
            debug!(dir = %dir.display(), "Bound PDFium beside executable");
            return Ok(Pdfium::new(bindings));
        }
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| {
            library_error(format!(
                "no PDFium library found (set {PDFIUM_PATH_ENV} or install it): {e}"
            ))
        })
}

/// Bind PDFium, open `pdf_bytes` and hand the document to `f`.
fn with_document<T>(
    pdf_bytes: &[u8],
    f: impl FnOnce(&PdfDocument<'_>) -> Result<T, ExtractionError>,
) -> Result<T, ExtractionError> {
    let pdfium = bind_library()?;
    let document = pdfium
        .load_pdf_from_byte_slice(pdf_bytes, None)
        .map_err(open_error)?;
    f(&document)
}

/// Password-protected files get their own variant so callers can tell the user.
fn open_error(e: PdfiumError) -> ExtractionError {
    let text = e.to_string().to_lowercase();
    if text.contains("password") || text.contains("encrypt") {
        ExtractionError::PdfEncrypted
    } else {
        library_error(format!("cannot open PDF: {e}"))
    }
}

/// Pixel size of a page of `width_pt` x `height_pt` points at `scale` px/pt.
///
/// A non-positive or non-finite scale counts as 1. The longer side is held to
/// `MAX_DIMENSION_PX` with the aspect ratio kept; neither side drops below 1.
fn compute_render_dimensions(width_pt: f32, height_pt: f32, scale: f32) -> (u32, u32) {
    let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
    let w = (width_pt * scale).max(1.0);
    let h = (height_pt * scale).max(1.0);

    let shrink = (MAX_DIMENSION_PX as f32 / w.max(h)).min(1.0);
    let fit = |side: f32| ((side * shrink) as u32).clamp(1, MAX_DIMENSION_PX);
    (fit(w), fit(h))
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, ExtractionError> {
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageOutputFormat::Png)
        .map_err(|e| ExtractionError::ImageProcessing(format!("PNG encoding failed: {e}")))?;
    Ok(out.into_inner())
}

impl PdfPageRenderer for PdfiumRenderer {
    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError> {
        with_document(pdf_bytes, |document| Ok(document.pages().len() as usize))
    }

    fn render_page(
        &self,
        pdf_bytes: &[u8],
        page_index: usize,
        scale: f32,
    ) -> Result<Vec<u8>, ExtractionError> {
        let page_error = |reason: String| ExtractionError::PdfRendering {
            page: page_index,
            reason,
        };

        with_document(pdf_bytes, |document| {
            let pages = document.pages();
            let page = u16::try_from(page_index)
                .ok()
                .and_then(|index| pages.get(index).ok())
                .ok_or_else(|| {
                    page_error(format!("no page {page_index} in a {}-page PDF", pages.len()))
                })?;

            let (width_pt, height_pt) = (page.width().value, page.height().value);
            let (width_px, height_px) = compute_render_dimensions(width_pt, height_pt, scale);
            if width_px < (width_pt * scale) as u32 {
                warn!(
                    page = page_index,
                    width_px,
                    height_px,
                    "Flyer page shrunk to fit {MAX_DIMENSION_PX}px"
                );
            }

            let render = PdfRenderConfig::new()
                .set_target_width(width_px as i32)
                .set_maximum_height(height_px as i32);
            let bitmap = page
                .render_with_config(&render)
                .map_err(|e| page_error(format!("rasterization failed: {e}")))?;
            let png = encode_png(&bitmap.as_image())?;

            debug!(
                page = page_index,
                width_px,
                height_px,
                png_bytes = png.len(),
                "Rasterized flyer page"
            );
            Ok(png)
        })
    }
}

// ── Mock for testing ──────────────────────────────────────

/// Renderer over a fake document of `page_count` blank pages.
/// Keeps the order in which pages were requested.
pub struct MockPdfPageRenderer {
    page_count: usize,
    broken_page: Option<usize>,
    requested: Mutex<Vec<usize>>,
}

impl MockPdfPageRenderer {
    pub fn new(page_count: usize) -> Self {
        Self {
            page_count,
            broken_page: None,
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Make rasterizing `page_index` fail.
    pub fn failing_on(mut self, page_index: usize) -> Self {
        self.broken_page = Some(page_index);
        self
    }

    pub fn rendered_pages(&self) -> Vec<usize> {
        self.requested
            .lock()
            .map(|pages| pages.clone())
            .unwrap_or_default()
    }
}

impl PdfPageRenderer for MockPdfPageRenderer {
    fn page_count(&self, _pdf_bytes: &[u8]) -> Result<usize, ExtractionError> {
        Ok(self.page_count)
    }

    fn render_page(
        &self,
        _pdf_bytes: &[u8],
        page_index: usize,
        _scale: f32,
    ) -> Result<Vec<u8>, ExtractionError> {
        if page_index >= self.page_count || self.broken_page == Some(page_index) {
            return Err(ExtractionError::PdfRendering {
                page: page_index,
                reason: "mock page unavailable".into(),
            });
        }
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(page_index);
        }
        encode_png(&DynamicImage::ImageLuma8(GrayImage::from_pixel(
            1,
            1,
            Luma([255]),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn letter_page_at_scale_two() {
        // US Letter: 612 x 792 points
        assert_eq!(compute_render_dimensions(612.0, 792.0, 2.0), (1224, 1584));
    }

    #[test]
    fn tabloid_flyer_capped() {
        // 792 x 1224 points at scale 4 is 3168 x 4896 before the cap
        let (w, h) = compute_render_dimensions(792.0, 1224.0, 4.0);
        assert!(h <= MAX_DIMENSION_PX && h >= MAX_DIMENSION_PX - 1);
        assert!(w < MAX_DIMENSION_PX);
        let ratio = w as f32 / h as f32;
        assert!((ratio - 792.0 / 1224.0).abs() < 0.01);
    }

    #[test]
    fn zero_points_clamped_to_one() {
        assert_eq!(compute_render_dimensions(0.0, 0.0, 2.0), (1, 1));
    }

    #[test]
    fn invalid_scale_falls_back_to_one() {
        assert_eq!(compute_render_dimensions(612.0, 792.0, 0.0), (612, 792));
        assert_eq!(compute_render_dimensions(612.0, 792.0, f32::NAN), (612, 792));
    }

    #[test]
    fn mock_renders_png_and_records_pages() {
        let renderer = MockPdfPageRenderer::new(3);
        assert_eq!(renderer.page_count(b"pdf").unwrap(), 3);
        let png = renderer.render_page(b"pdf", 2, 2.0).unwrap();
        assert_eq!(&png[..8], &PNG_SIGNATURE);
        renderer.render_page(b"pdf", 0, 2.0).unwrap();
        assert_eq!(renderer.rendered_pages(), vec![2, 0]);
    }

    #[test]
    fn mock_errors_for_out_of_range_and_failing_pages() {
        let renderer = MockPdfPageRenderer::new(2).failing_on(1);
        assert!(renderer.render_page(b"pdf", 0, 2.0).is_ok());
        assert!(matches!(
            renderer.render_page(b"pdf", 1, 2.0),
            Err(ExtractionError::PdfRendering { page: 1, .. })
        ));
        assert!(renderer.render_page(b"pdf", 5, 2.0).is_err());
        assert_eq!(renderer.rendered_pages(), vec![0]);
    }
}
