use serde::{Deserialize, Serialize};

use crate::pipeline::types::{PageSegMode, RecognitionOptions};
use crate::pipeline::ExtractionError;

/// Application-level constants
pub const APP_NAME: &str = "flyerscan";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Hard cap on PDF pages rasterized per call. Later pages are skipped.
/// Configuration may lower it, never raise it.
pub const DEFAULT_MAX_PDF_PAGES: usize = 10;

/// Pixels per PDF point when rasterizing flyer pages.
pub const DEFAULT_RENDER_SCALE: f32 = 2.0;

pub const DEFAULT_OCR_LANGUAGES: &str = "fra+eng";

/// Characters the OCR engine may emit: letters, digits, accented French
/// letters, currency symbols and price punctuation.
pub const OCR_CHAR_WHITELIST: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789ÀÂÄÇÉÈÊËÎÏÔÖÙÛÜŸàâäçéèêëîïôöùûüÿ$¢.,%-/";

pub const ENV_MAX_PDF_PAGES: &str = "FLYERSCAN_MAX_PDF_PAGES";
pub const ENV_RENDER_SCALE: &str = "FLYERSCAN_RENDER_SCALE";
pub const ENV_OCR_LANG: &str = "FLYERSCAN_OCR_LANG";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "flyerscan=debug,warn"
    } else {
        "flyerscan=info,warn"
    }
}

/// Tunables for one pipeline instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub max_pdf_pages: usize,
    pub render_scale: f32,
    pub recognition: RecognitionOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_pdf_pages: DEFAULT_MAX_PDF_PAGES,
            render_scale: DEFAULT_RENDER_SCALE,
            recognition: RecognitionOptions {
                languages: DEFAULT_OCR_LANGUAGES.to_string(),
                page_segmentation: PageSegMode::Auto,
                char_whitelist: OCR_CHAR_WHITELIST.to_string(),
            },
        }
    }
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        PipelineConfig::default().recognition
    }
}

impl PipelineConfig {
    /// Defaults overridden by `FLYERSCAN_*` environment variables.
    pub fn from_env() -> Result<Self, ExtractionError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Parse a JSON config document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ExtractionError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ExtractionError::Config(format!("Invalid pipeline config: {e}")))?;
        config.validate()
    }

    fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ExtractionError> {
        if let Some(raw) = lookup(ENV_MAX_PDF_PAGES) {
            self.max_pdf_pages = raw.trim().parse().map_err(|_| {
                ExtractionError::Config(format!("{ENV_MAX_PDF_PAGES} must be an integer, got {raw:?}"))
            })?;
        }
        if let Some(raw) = lookup(ENV_RENDER_SCALE) {
            self.render_scale = raw.trim().parse().map_err(|_| {
                ExtractionError::Config(format!("{ENV_RENDER_SCALE} must be a number, got {raw:?}"))
            })?;
        }
        if let Some(raw) = lookup(ENV_OCR_LANG) {
            self.recognition.languages = raw.trim().to_string();
        }
        self.validate()
    }

    fn validate(mut self) -> Result<Self, ExtractionError> {
        if self.max_pdf_pages == 0 {
            return Err(ExtractionError::Config("max_pdf_pages must be at least 1".into()));
        }
        if self.max_pdf_pages > DEFAULT_MAX_PDF_PAGES {
            tracing::warn!(
                requested = self.max_pdf_pages,
                cap = DEFAULT_MAX_PDF_PAGES,
                "max_pdf_pages above the hard cap, clamping"
            );
            self.max_pdf_pages = DEFAULT_MAX_PDF_PAGES;
        }
        if !(self.render_scale.is_finite() && self.render_scale > 0.0) {
            return Err(ExtractionError::Config(format!(
                "render_scale must be positive, got {}",
                self.render_scale
            )));
        }
        if self.recognition.languages.is_empty() {
            return Err(ExtractionError::Config("OCR languages must not be empty".into()));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_pdf_pages, 10);
        assert!((config.render_scale - 2.0).abs() < f32::EPSILON);
        assert_eq!(config.recognition.languages, "fra+eng");
        assert_eq!(config.recognition.page_segmentation, PageSegMode::Auto);
        assert!(config.recognition.char_whitelist.contains('$'));
        assert!(config.recognition.char_whitelist.contains('é'));
    }

    #[test]
    fn env_overrides_apply() {
        let vars = [(ENV_MAX_PDF_PAGES, "4"), (ENV_RENDER_SCALE, "1.5"), (ENV_OCR_LANG, "fra")];
        let config = PipelineConfig::default().with_overrides(lookup(&vars)).unwrap();
        assert_eq!(config.max_pdf_pages, 4);
        assert!((config.render_scale - 1.5).abs() < f32::EPSILON);
        assert_eq!(config.recognition.languages, "fra");
    }

    #[test]
    fn invalid_env_values_rejected() {
        let vars = [(ENV_MAX_PDF_PAGES, "ten")];
        assert!(matches!(
            PipelineConfig::default().with_overrides(lookup(&vars)),
            Err(ExtractionError::Config(_))
        ));
        let vars = [(ENV_MAX_PDF_PAGES, "0")];
        assert!(PipelineConfig::default().with_overrides(lookup(&vars)).is_err());
        let vars = [(ENV_RENDER_SCALE, "-2")];
        assert!(PipelineConfig::default().with_overrides(lookup(&vars)).is_err());
    }

    #[test]
    fn page_limit_cannot_exceed_hard_cap() {
        let vars = [(ENV_MAX_PDF_PAGES, "15")];
        let config = PipelineConfig::default().with_overrides(lookup(&vars)).unwrap();
        assert_eq!(config.max_pdf_pages, DEFAULT_MAX_PDF_PAGES);

        let config = PipelineConfig::from_json(r#"{"max_pdf_pages": 40}"#).unwrap();
        assert_eq!(config.max_pdf_pages, DEFAULT_MAX_PDF_PAGES);
    }

    #[test]
    fn json_partial_config_uses_defaults() {
        let config = PipelineConfig::from_json(r#"{"max_pdf_pages": 3}"#).unwrap();
        assert_eq!(config.max_pdf_pages, 3);
        assert!((config.render_scale - DEFAULT_RENDER_SCALE).abs() < f32::EPSILON);
        assert_eq!(config.recognition, RecognitionOptions::default());
    }

    #[test]
    fn json_round_trip_field_names() {
        let json = serde_json::to_string(&PipelineConfig::default()).unwrap();
        assert!(json.contains("\"max_pdf_pages\":10"));
        assert!(json.contains("\"page_segmentation\":\"auto\""));
    }

    #[test]
    fn malformed_json_is_config_error() {
        assert!(matches!(
            PipelineConfig::from_json("{not json"),
            Err(ExtractionError::Config(_))
        ));
    }

    #[test]
    fn app_name() {
        assert_eq!(APP_NAME, "flyerscan");
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
    }
}
