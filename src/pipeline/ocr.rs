use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::TempDir;

use super::confidence::page_confidence;
use super::types::{OcrEngine, OcrPageResult, OcrSession, OcrWordResult, RecognitionOptions};
use super::ExtractionError;

/// Tesseract OCR via the system `tesseract` binary.
///
/// Each session owns a scratch directory for page images; it is removed when
/// the session is dropped.
pub struct TesseractCli {
    binary: PathBuf,
}

impl TesseractCli {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
        }
    }

    /// Use a specific tesseract executable instead of the one on `PATH`.
    pub fn with_binary(path: &Path) -> Self {
        Self {
            binary: path.to_path_buf(),
        }
    }
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrEngine for TesseractCli {
    fn open_session(
        &self,
        options: &RecognitionOptions,
    ) -> Result<Box<dyn OcrSession + '_>, ExtractionError> {
        let workdir = TempDir::new()?;
        tracing::debug!(
            workdir = %workdir.path().display(),
            languages = %options.languages,
            "Opened tesseract session"
        );
        Ok(Box::new(TesseractSession {
            binary: &self.binary,
            options: options.clone(),
            workdir,
            pages: 0,
        }))
    }
}

struct TesseractSession<'a> {
    binary: &'a Path,
    options: RecognitionOptions,
    workdir: TempDir,
    pages: usize,
}

impl TesseractSession<'_> {
    fn run(&self, image_path: &Path) -> Result<String, ExtractionError> {
        let psm = self.options.page_segmentation.tesseract_psm().to_string();
        let mut command = Command::new(self.binary);
        command
            .arg(image_path)
            .arg("stdout")
            .args(["-l", self.options.languages.as_str()])
            .args(["--psm", psm.as_str()]);
        if !self.options.char_whitelist.is_empty() {
            command
                .arg("-c")
                .arg(format!("tessedit_char_whitelist={}", self.options.char_whitelist));
        }
        command.arg("tsv");

        match command.output() {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(output) => Err(ExtractionError::OcrProcessing(format!(
                "tesseract failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ExtractionError::OcrInit(
                format!("{} not found (install tesseract-ocr)", self.binary.display()),
            )),
            Err(e) => Err(ExtractionError::Io(e)),
        }
    }
}

impl OcrSession for TesseractSession<'_> {
    fn recognize(
        &mut self,
        image_bytes: &[u8],
        on_progress: &mut dyn FnMut(f32),
    ) -> Result<OcrPageResult, ExtractionError> {
        on_progress(0.0);
        self.pages += 1;
        let image_path = self.workdir.path().join(format!("page-{}.img", self.pages));
        std::fs::write(&image_path, image_bytes)?;

        let tsv = self.run(&image_path)?;
        let words = parse_tsv_words(&tsv);
        let result = OcrPageResult {
            text: words_to_text(&words),
            confidence: page_confidence(&words),
            words,
        };

        tracing::debug!(
            page = self.pages,
            words = result.words.len(),
            confidence = result.confidence,
            "Tesseract recognized page"
        );
        on_progress(1.0);
        Ok(result)
    }
}

impl Drop for TesseractSession<'_> {
    fn drop(&mut self) {
        tracing::debug!(pages = self.pages, "Released tesseract session");
    }
}

/// Parse Tesseract TSV output into word results.
/// TSV columns: level page_num block_num par_num line_num word_num left top width height conf text
/// Level 5 = individual word entries. Confidence stays on Tesseract's 0-100 scale (-1 = unscored).
fn parse_tsv_words(tsv: &str) -> Vec<OcrWordResult> {
    let mut results = Vec::new();

    for line in tsv.lines().skip(1) {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        match fields[0].parse::<i32>() {
            Ok(5) => {}
            _ => continue,
        }

        let Ok(confidence) = fields[10].trim().parse::<f32>() else {
            continue;
        };

        let word = fields[11].trim();
        if word.is_empty() {
            continue;
        }

        let line_key = (
            fields[2].parse().unwrap_or(0),
            fields[3].parse().unwrap_or(0),
            fields[4].parse().unwrap_or(0),
        );

        results.push(OcrWordResult {
            text: word.to_string(),
            confidence,
            line_key,
        });
    }

    results
}

/// Rebuild line-oriented text from words, one output line per (block, paragraph, line).
fn words_to_text(words: &[OcrWordResult]) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current_key = None;

    for word in words {
        if current_key == Some(word.line_key) {
            if let Some(last) = lines.last_mut() {
                last.push(' ');
                last.push_str(&word.text);
            }
        } else {
            lines.push(word.text.clone());
            current_key = Some(word.line_key);
        }
    }

    lines.join("\n")
}

// ── Mock for testing ──────────────────────────────────────

#[derive(Default)]
struct MockCounters {
    sessions_opened: AtomicUsize,
    sessions_released: AtomicUsize,
    recognize_calls: AtomicUsize,
}

/// Mock OCR engine returning scripted pages in order (cycling when exhausted).
///
/// Clones share counters, so a test can keep a clone to inspect session
/// lifetimes after boxing the engine into a pipeline.
#[derive(Clone)]
pub struct MockOcrEngine {
    pages: Arc<Vec<(String, f32)>>,
    fail_on_call: Option<usize>,
    counters: Arc<MockCounters>,
}

impl MockOcrEngine {
    pub fn new(text: &str, confidence: f32) -> Self {
        Self::with_pages(vec![(text, confidence)])
    }

    pub fn with_pages(pages: Vec<(&str, f32)>) -> Self {
        Self {
            pages: Arc::new(
                pages
                    .into_iter()
                    .map(|(text, conf)| (text.to_string(), conf))
                    .collect(),
            ),
            fail_on_call: None,
            counters: Arc::new(MockCounters::default()),
        }
    }

    /// Make the n-th recognize call (0-based) fail.
    pub fn failing_on(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    pub fn sessions_opened(&self) -> usize {
        self.counters.sessions_opened.load(Ordering::SeqCst)
    }

    pub fn sessions_released(&self) -> usize {
        self.counters.sessions_released.load(Ordering::SeqCst)
    }

    pub fn recognize_calls(&self) -> usize {
        self.counters.recognize_calls.load(Ordering::SeqCst)
    }
}

impl OcrEngine for MockOcrEngine {
    fn open_session(
        &self,
        _options: &RecognitionOptions,
    ) -> Result<Box<dyn OcrSession + '_>, ExtractionError> {
        self.counters.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockOcrSession { engine: self }))
    }
}

struct MockOcrSession<'a> {
    engine: &'a MockOcrEngine,
}

impl OcrSession for MockOcrSession<'_> {
    fn recognize(
        &mut self,
        _image_bytes: &[u8],
        on_progress: &mut dyn FnMut(f32),
    ) -> Result<OcrPageResult, ExtractionError> {
        let call = self
            .engine
            .counters
            .recognize_calls
            .fetch_add(1, Ordering::SeqCst);
        if self.engine.fail_on_call == Some(call) {
            return Err(ExtractionError::OcrProcessing(format!(
                "mock failure on call {call}"
            )));
        }

        on_progress(0.5);
        let (text, confidence) = if self.engine.pages.is_empty() {
            (String::new(), 0.0)
        } else {
            self.engine.pages[call % self.engine.pages.len()].clone()
        };
        let words = text
            .lines()
            .enumerate()
            .flat_map(|(line, l)| {
                l.split_whitespace().map(move |w| OcrWordResult {
                    text: w.to_string(),
                    confidence,
                    line_key: (1, 1, line as u32 + 1),
                })
            })
            .collect();
        on_progress(1.0);

        Ok(OcrPageResult {
            text,
            confidence,
            words,
        })
    }
}

impl Drop for MockOcrSession<'_> {
    fn drop(&mut self) {
        self.engine
            .counters
            .sessions_released
            .fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;

    fn options() -> RecognitionOptions {
        PipelineConfig::default().recognition
    }

    #[test]
    fn mock_returns_scripted_pages_in_order() {
        let engine = MockOcrEngine::with_pages(vec![("Lait 3.99$", 90.0), ("Pain 2.49$", 70.0)]);
        let mut session = engine.open_session(&options()).unwrap();
        let first = session.recognize(b"img", &mut |_| {}).unwrap();
        let second = session.recognize(b"img", &mut |_| {}).unwrap();
        assert_eq!(first.text, "Lait 3.99$");
        assert_eq!(second.text, "Pain 2.49$");
        assert!((second.confidence - 70.0).abs() < f32::EPSILON);
        assert_eq!(first.words.len(), 2);
    }

    #[test]
    fn mock_counts_session_lifetime() {
        let engine = MockOcrEngine::new("x", 50.0);
        {
            let _session = engine.open_session(&options()).unwrap();
            assert_eq!(engine.sessions_opened(), 1);
            assert_eq!(engine.sessions_released(), 0);
        }
        assert_eq!(engine.sessions_released(), 1);
    }

    #[test]
    fn mock_failure_on_requested_call() {
        let engine = MockOcrEngine::new("x", 50.0).failing_on(1);
        let mut session = engine.open_session(&options()).unwrap();
        assert!(session.recognize(b"img", &mut |_| {}).is_ok());
        assert!(matches!(
            session.recognize(b"img", &mut |_| {}),
            Err(ExtractionError::OcrProcessing(_))
        ));
    }

    #[test]
    fn mock_reports_progress() {
        let engine = MockOcrEngine::new("x", 50.0);
        let mut session = engine.open_session(&options()).unwrap();
        let mut seen = Vec::new();
        session.recognize(b"img", &mut |p| seen.push(p)).unwrap();
        assert_eq!(seen, vec![0.5, 1.0]);
    }

    #[test]
    fn missing_tesseract_binary_is_init_error() {
        let engine = TesseractCli::with_binary(Path::new("/nonexistent/tesseract-binary"));
        let mut session = engine.open_session(&options()).unwrap();
        let result = session.recognize(b"not an image", &mut |_| {});
        assert!(matches!(result, Err(ExtractionError::OcrInit(_))));
    }

    // --- TSV parsing ---

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    #[test]
    fn tsv_words_and_lines() {
        let tsv = format!(
            "{HEADER}\n\
             1\t1\t0\t0\t0\t0\t0\t0\t600\t800\t-1\t\n\
             5\t1\t1\t1\t1\t1\t10\t20\t80\t30\t95.5\tLait\n\
             5\t1\t1\t1\t1\t2\t100\t20\t60\t30\t88\t2L\n\
             5\t1\t1\t1\t2\t1\t10\t60\t120\t30\t72\t3.99$\n\
             5\t1\t2\t1\t1\t1\t300\t20\t80\t30\t-1\tPain"
        );
        let words = parse_tsv_words(&tsv);
        assert_eq!(words.len(), 4);
        assert_eq!(words[0].text, "Lait");
        assert!((words[0].confidence - 95.5).abs() < f32::EPSILON);
        assert_eq!(words[3].confidence, -1.0);
        assert_eq!(words_to_text(&words), "Lait 2L\n3.99$\nPain");
        // Unscored word excluded from the mean: (95.5 + 88 + 72) / 3
        assert!((page_confidence(&words) - 85.1667).abs() < 1e-3);
    }

    #[test]
    fn tsv_skips_malformed_and_empty() {
        let tsv = format!(
            "{HEADER}\n\
             too\tfew\tfields\n\
             5\t1\t1\t1\t1\t1\t10\t20\t80\t30\t90\t\n\
             5\t1\t1\t1\t1\t2\t10\t20\t80\t30\tbad\tword\n\
             5\t1\t1\t1\t1\t3\t10\t20\t80\t30\t91\tOK"
        );
        let words = parse_tsv_words(&tsv);
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].text, "OK");
    }

    #[test]
    fn tsv_empty_input() {
        assert!(parse_tsv_words("").is_empty());
        assert!(parse_tsv_words(HEADER).is_empty());
        assert_eq!(words_to_text(&[]), "");
    }
}
