//! Near-duplicate merging for validated products.
//!
//! Products whose normalized keys contain one another form a name family;
//! one representative per family survives. The earliest high-confidence
//! entry of a family wins, otherwise the earliest entry.
//!
//! A name without ASCII letters has an empty key. Plain containment would put
//! it in every family, so empty keys only match other empty keys and the
//! output may hold both `""` and a non-empty key.
//!
//! The scan over kept keys is linear, which is fine at flyer scale (tens to
//! low hundreds of products).

use super::types::{Confidence, UnifiedProduct, ValidatedProduct};

/// Lower-cased name restricted to ASCII letters.
pub fn dedup_key(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase())
        .collect()
}

/// Containment in either direction. An empty key only matches another empty key.
fn keys_overlap(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return a == b;
    }
    a.contains(b) || b.contains(a)
}

/// Merge near-duplicates in a single pass over the input order.
pub fn deduplicate(validated: Vec<ValidatedProduct>) -> Vec<UnifiedProduct> {
    let input_len = validated.len();
    // Parallel vectors: kept[i] is stored under keys[i].
    let mut kept: Vec<ValidatedProduct> = Vec::new();
    let mut keys: Vec<String> = Vec::new();

    for product in validated {
        let key = dedup_key(&product.name);
        let matches: Vec<usize> = keys
            .iter()
            .enumerate()
            .filter(|(_, existing)| keys_overlap(existing, &key))
            .map(|(i, _)| i)
            .collect();

        let Some(&first) = matches.first() else {
            keys.push(key);
            kept.push(product);
            continue;
        };

        let upgrades = product.confidence == Confidence::High
            && matches.iter().all(|&i| kept[i].confidence != Confidence::High);

        if !upgrades {
            tracing::trace!(name = %product.name, kept = %kept[first].name, "Duplicate discarded");
            continue;
        }

        tracing::trace!(
            name = %product.name,
            replaced = %kept[first].name,
            "High-confidence entry replaces duplicate"
        );
        kept[first] = product;
        keys[first] = key;

        // Other members of the family are now covered by the replacement key.
        for &i in matches.iter().skip(1).rev() {
            kept.remove(i);
            keys.remove(i);
        }
    }

    tracing::debug!(input = input_len, output = kept.len(), "Deduplication complete");
    kept
}
