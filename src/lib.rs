//! Grocery flyer price extraction.
//!
//! OCR text from flyer images or PDFs goes through price detection, name
//! inference, validation and near-duplicate merging to produce a list of
//! products with their prices.

pub mod config;
pub mod pipeline;

pub use pipeline::{
    compute_unit_price, deduplicate, extract, parse_unit, process_text, to_canonical, validate,
    ExtractionError, FlyerPipeline, PipelineResult, UnifiedProduct,
};

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to
/// `config::default_log_filter()`. Later calls are no-ops.
pub fn init_tracing() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("{} v{} logging initialized", config::APP_NAME, config::APP_VERSION);
    }
}
