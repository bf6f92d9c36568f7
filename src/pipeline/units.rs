//! Quantity parsing and unit-price canonicalization.
//!
//! Liquids canonicalize to millilitres, weights to grams. The two bases are
//! never compared against each other.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static UNIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:[.,]\d+)?)(ml|l|g|kg)$").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Ml,
    L,
    G,
    Kg,
}

impl Unit {
    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "ml" => Some(Unit::Ml),
            "l" => Some(Unit::L),
            "g" => Some(Unit::G),
            "kg" => Some(Unit::Kg),
            _ => None,
        }
    }

    /// Canonical base this unit converts to.
    pub fn base(&self) -> &'static str {
        match self {
            Unit::Ml | Unit::L => "ml",
            Unit::G | Unit::Kg => "g",
        }
    }

    fn factor(&self) -> f64 {
        match self {
            Unit::Ml | Unit::G => 1.0,
            Unit::L | Unit::Kg => 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParsedUnit {
    pub amount: f64,
    pub unit: Unit,
}

/// Parse strings like `2L`, `500 g` or `1,5 kg`. The whole cleaned string must match.
pub fn parse_unit(raw: &str) -> Option<ParsedUnit> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();

    let caps = UNIT_RE.captures(&cleaned)?;
    let amount: f64 = caps[1].replace(',', ".").parse().ok()?;
    let unit = Unit::from_suffix(&caps[2])?;

    Some(ParsedUnit { amount, unit })
}

/// Amount expressed in the unit's canonical base (ml or g).
pub fn to_canonical(parsed: &ParsedUnit) -> f64 {
    parsed.amount * parsed.unit.factor()
}

/// Price per ml or per g, rounded half-up to 4 decimals.
pub fn compute_unit_price(price: Option<f64>, volume_text: Option<&str>) -> Option<f64> {
    let price = price?;
    let parsed = parse_unit(volume_text?)?;
    let base = to_canonical(&parsed);
    if base <= 0.0 {
        return None;
    }
    Some(round_to(price / base, 4))
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
