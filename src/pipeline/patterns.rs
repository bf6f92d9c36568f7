//! Ranked price patterns for flyer lines.
//!
//! Lower priority wins when several patterns match the same line. Every
//! priority-3 form that carries cents also contains a priority-1 match, so
//! `N pour X.XX$` resolves to the priority-1 total price; the bulk forms win
//! on their own only when written without cents (`2 pour 5$`, `3/10$`).
//! The bulk and `à partir de` forms therefore accept whole-dollar totals,
//! which is wider than a cents-only grammar.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::types::PriceType;
use super::units::round_to;

/// A recognized price inside one line.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceMatch {
    pub priority: u8,
    pub price_type: PriceType,
    pub price: f64,
    pub bulk_quantity: Option<u32>,
    /// Byte range of the matched substring within the line.
    pub start: usize,
    pub end: usize,
}

struct PricePattern {
    regex: Regex,
    priority: u8,
    price_type: PriceType,
    /// Returns (price, bulk quantity) from the captures.
    compute: fn(&Captures) -> Option<(f64, Option<u32>)>,
}

/// In test order. Ties on priority keep the first pattern tested.
static PRICE_PATTERNS: LazyLock<Vec<PricePattern>> = LazyLock::new(|| {
    vec![
        pattern(r"(\d+)[.,](\d{2})\s*\$", 1, PriceType::Standard, dollars_cents),
        pattern(r"\$\s*(\d+)[.,](\d{2})", 1, PriceType::Standard, dollars_cents),
        pattern(r"(\d+)\s*\$\s*(\d{2})\b", 2, PriceType::Standard, dollars_cents),
        pattern(r"(\d+)\s*¢", 2, PriceType::Cents, cents_only),
        pattern(
            r"(?i)(\d+)\s+pour\s+(\d+)(?:[.,](\d{2}))?\s*\$",
            3,
            PriceType::Bulk,
            bulk_unit_price,
        ),
        pattern(
            r"(\d+)/(\d+)(?:[.,](\d{2}))?\s*\$",
            3,
            PriceType::Bulk,
            bulk_unit_price,
        ),
        pattern(
            r"(?i)à\s+partir\s+de\s+(\d+)(?:[.,](\d{2}))?\s*\$",
            3,
            PriceType::Standard,
            dollars_optional_cents,
        ),
    ]
});

fn pattern(
    regex_str: &str,
    priority: u8,
    price_type: PriceType,
    compute: fn(&Captures) -> Option<(f64, Option<u32>)>,
) -> PricePattern {
    PricePattern {
        regex: Regex::new(regex_str).expect("Invalid price regex pattern"),
        priority,
        price_type,
        compute,
    }
}

fn parse_amount(whole: &str, cents: Option<&str>) -> Option<f64> {
    let text = format!("{whole}.{}", cents.unwrap_or("00"));
    text.parse().ok()
}

fn dollars_cents(caps: &Captures) -> Option<(f64, Option<u32>)> {
    Some((parse_amount(&caps[1], Some(&caps[2]))?, None))
}

fn dollars_optional_cents(caps: &Captures) -> Option<(f64, Option<u32>)> {
    Some((parse_amount(&caps[1], caps.get(2).map(|m| m.as_str()))?, None))
}

fn cents_only(caps: &Captures) -> Option<(f64, Option<u32>)> {
    let cents: f64 = caps[1].parse().ok()?;
    Some((cents / 100.0, None))
}

/// Total divided by quantity: the output price is always per unit.
fn bulk_unit_price(caps: &Captures) -> Option<(f64, Option<u32>)> {
    let quantity: u32 = caps[1].parse().ok()?;
    if quantity == 0 {
        return None;
    }
    let total = parse_amount(&caps[2], caps.get(3).map(|m| m.as_str()))?;
    Some((total / quantity as f64, Some(quantity)))
}

/// Evaluate every pattern against `line` and keep the lowest-priority match.
pub fn best_price_match(line: &str) -> Option<PriceMatch> {
    let mut best: Option<PriceMatch> = None;

    for pattern in PRICE_PATTERNS.iter() {
        if best.as_ref().is_some_and(|b| b.priority <= pattern.priority) {
            continue;
        }
        let Some(caps) = pattern.regex.captures(line) else {
            continue;
        };
        let (Some(whole), Some((price, bulk_quantity))) = (caps.get(0), (pattern.compute)(&caps))
        else {
            continue;
        };
        best = Some(PriceMatch {
            priority: pattern.priority,
            price_type: pattern.price_type,
            price: round_to(price, 2),
            bulk_quantity,
            start: whole.start(),
            end: whole.end(),
        });
    }

    best
}

/// Remove every price-like substring, longest forms first.
pub fn strip_prices(line: &str) -> String {
    let mut out = line.to_string();
    for pattern in PRICE_PATTERNS.iter().rev() {
        out = pattern.regex.replace_all(&out, " ").into_owned();
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
