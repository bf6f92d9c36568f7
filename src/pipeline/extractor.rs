//! Line-by-line price and product-name extraction.
//!
//! Each line is scanned on its own. When a price is found, the product name
//! and volume are inferred from a small window of neighbouring lines, which
//! recovers the common flyer layout where the name sits above the price.

use std::sync::LazyLock;

use regex::Regex;

use super::keywords::{has_category_keyword, is_stop_word, ARTICLE_RE};
use super::patterns::{best_price_match, strip_prices, PriceMatch};
use super::types::{CandidateProduct, Confidence};

/// Lines before the price line included in the context window.
const CONTEXT_BEFORE: usize = 2;

/// Lines after the price line included in the context window.
const CONTEXT_AFTER: usize = 1;

/// Score given to a context line mentioning a grocery category.
const CATEGORY_SCORE: usize = 10;

const MIN_NAME_CHARS: usize = 3;

/// Extractor-level price sanity bound (exclusive). The validator applies a stricter one.
const MAX_EXTRACTED_PRICE: f64 = 1000.0;

static CONTAINER_VOLUME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:bouteille|sac|paquet|boîte|boite|pot|contenant|format|caisse|emballage)\s+de\s+(\d+(?:[.,]\d+)?)\s*(litres|litre|kg|lb|oz|ml|g|l)\b",
    )
    .expect("valid container volume regex")
});

static VOLUME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+(?:[.,]\d+)?)\s*(litres|litre|kg|lb|oz|ml|g|l)\b")
        .expect("valid volume regex")
});

static NAME_NOISE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s'\-]").expect("valid name noise regex"));

/// Extract candidate products from OCR text.
pub fn extract(text: &str) -> Vec<CandidateProduct> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut candidates = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        if is_stop_word(line) {
            continue;
        }

        let Some(price_match) = best_price_match(line) else {
            continue;
        };

        if !(price_match.price > 0.0 && price_match.price < MAX_EXTRACTED_PRICE) {
            tracing::trace!(line = %line, price = price_match.price, "Price out of range");
            continue;
        }

        let context = context_window(&lines, idx, &price_match);
        let raw_name = infer_name(&context);
        let name = normalize_name(&raw_name);

        if name.chars().count() < MIN_NAME_CHARS {
            tracing::trace!(line = %line, raw_name = %raw_name, "No usable product name");
            continue;
        }

        candidates.push(CandidateProduct {
            name,
            price: price_match.price,
            volume: find_volume(&context),
            price_type: price_match.price_type,
            confidence: Confidence::from_priority(price_match.priority),
            raw_line: line.to_string(),
            context: context.join(" | "),
            bulk_quantity: price_match.bulk_quantity,
        });
    }

    tracing::debug!(
        lines = lines.len(),
        candidates = candidates.len(),
        "Price extraction pass complete"
    );

    candidates
}

/// Up to two lines before, the price line minus its price, and one line after.
fn context_window(lines: &[&str], idx: usize, price_match: &PriceMatch) -> Vec<String> {
    let line = lines[idx];
    let start = idx.saturating_sub(CONTEXT_BEFORE);
    let end = (idx + CONTEXT_AFTER).min(lines.len() - 1);

    let mut window = Vec::with_capacity(end - start + 1);
    for (i, l) in lines.iter().enumerate().take(end + 1).skip(start) {
        if i == idx {
            let without_price = format!("{}{}", &line[..price_match.start], &line[price_match.end..]);
            window.push(without_price.trim().to_string());
        } else {
            window.push(l.to_string());
        }
    }
    window
}

/// Pick the most name-like context line. Ties keep the earliest line.
fn infer_name(context: &[String]) -> String {
    let mut best: Option<(usize, String)> = None;

    for line in context {
        let stripped = strip_prices(line);
        if stripped.chars().count() < MIN_NAME_CHARS || is_stop_word(&stripped) {
            continue;
        }
        let score = if has_category_keyword(&stripped) {
            CATEGORY_SCORE
        } else {
            stripped.chars().count()
        };
        if best.as_ref().map_or(true, |(s, _)| score > *s) {
            best = Some((score, stripped));
        }
    }

    match best {
        Some((_, name)) => name,
        None => context.first().cloned().unwrap_or_default(),
    }
}

/// First volume or weight expression in window order, compacted to `<amount><unit>`.
fn find_volume(context: &[String]) -> Option<String> {
    context.iter().find_map(|line| {
        let caps = CONTAINER_VOLUME_RE
            .captures(line)
            .or_else(|| VOLUME_RE.captures(line))?;
        Some(format!("{}{}", &caps[1], caps[2].to_lowercase()))
    })
}

/// Keep word characters, apostrophes and hyphens; drop French articles; lower-case.
pub fn normalize_name(raw: &str) -> String {
    let cleaned = NAME_NOISE_RE.replace_all(raw, " ");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let without_articles = ARTICLE_RE.replace_all(&collapsed, " ");
    without_articles
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
