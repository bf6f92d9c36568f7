// Post-extraction validation for candidate products.
// Drops extraction artifacts: non-names and misparsed totals. The price bound
// here is stricter than the extractor's own sanity bound.

use super::keywords::NAME_DENYLIST;
use super::types::{CandidateProduct, ValidatedProduct};

/// Maximum plausible grocery price (inclusive).
pub const MAX_VALID_PRICE: f64 = 500.0;

const MIN_NAME_CHARS: usize = 3;

/// Why a candidate was rejected. Logged only, never surfaced as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NameTooShort,
    PriceOutOfRange,
    NumericName,
    DeniedName,
}

/// Filter candidates down to plausible products. Order is preserved.
pub fn validate(candidates: Vec<CandidateProduct>) -> Vec<ValidatedProduct> {
    let total = candidates.len();
    let validated: Vec<ValidatedProduct> = candidates
        .into_iter()
        .filter_map(|candidate| match check(&candidate) {
            Ok(()) => Some(ValidatedProduct::new(candidate)),
            Err(reason) => {
                tracing::debug!(
                    name = %candidate.name,
                    price = candidate.price,
                    reason = ?reason,
                    "Candidate rejected"
                );
                None
            }
        })
        .collect();

    tracing::debug!(total, valid = validated.len(), "Validation complete");
    validated
}

/// Check a single candidate against the product invariants.
pub fn check(candidate: &CandidateProduct) -> Result<(), Rejection> {
    let name = candidate.name.trim();

    if name.chars().count() < MIN_NAME_CHARS {
        return Err(Rejection::NameTooShort);
    }
    if !(candidate.price > 0.0 && candidate.price <= MAX_VALID_PRICE) {
        return Err(Rejection::PriceOutOfRange);
    }
    if name
        .chars()
        .filter(|c| !c.is_whitespace())
        .all(|c| c.is_ascii_digit())
    {
        return Err(Rejection::NumericName);
    }
    if NAME_DENYLIST.contains(&name.to_lowercase().as_str()) {
        return Err(Rejection::DeniedName);
    }
    Ok(())
}
