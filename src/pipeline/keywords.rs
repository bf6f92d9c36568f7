//! Static vocabularies for flyer text: promotional boilerplate, grocery
//! categories and French articles.

use std::sync::LazyLock;

use regex::Regex;

/// Lines that are pure promotional boilerplate. Compared against the whole
/// trimmed, lower-cased line.
pub const STOP_WORDS: &[&str] = &[
    "rabais",
    "valide",
    "page",
    "prix",
    "spécial",
    "special",
    "économisez",
    "economisez",
    "épargnez",
    "seulement",
    "chacun",
    "ch.",
    "ch",
    "limite",
    "achetez",
    "obtenez",
    "nouveau",
    "exclusif",
    "promo",
    "aubaine",
    "semaine",
    "jusqu'à",
    "du",
    "au",
];

/// Residual false positives that survive extraction as product names.
pub const NAME_DENYLIST: &[&str] = &["page", "du", "au", "limite"];

/// Grocery-category terms (meat, dairy, produce, staples). Matched as word prefixes
/// so plurals count.
static CATEGORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:lait|fromage|yogourt|yaourt|beurre|crème|creme|œuf|oeuf|poulet|boeuf|bœuf|porc|jambon|saucisse|bacon|dinde|poisson|saumon|thon|crevette|pomme|banane|orange|citron|tomate|laitue|carotte|patate|brocoli|fraise|raisin|légume|legume|fruit|pain|pâte|pate|riz|céréale|cereale|jus|café|cafe)",
    )
    .expect("valid category regex")
});

/// French definite and partial articles, dropped from normalized names.
pub(crate) static ARTICLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:du|de|la|le|les|un|une|des)\b").expect("valid article regex")
});

/// True when the trimmed, lower-cased line is a stop word.
pub fn is_stop_word(line: &str) -> bool {
    let lower = line.trim().to_lowercase();
    STOP_WORDS.contains(&lower.as_str())
}

pub fn has_category_keyword(line: &str) -> bool {
    CATEGORY_RE.is_match(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_words_match_whole_line_only() {
        assert!(is_stop_word("RABAIS"));
        assert!(is_stop_word("  Valide  "));
        assert!(!is_stop_word("rabais de 20%"));
        assert!(!is_stop_word("Lait"));
    }

    #[test]
    fn category_keywords_cover_plurals_and_accents() {
        assert!(has_category_keyword("Pommes Cortland"));
        assert!(has_category_keyword("Poitrines de POULET"));
        assert!(has_category_keyword("Pâtes Catelli"));
        assert!(!has_category_keyword("Papier hygiénique"));
    }

    #[test]
    fn article_regex_is_whole_word() {
        let stripped = ARTICLE_RE.replace_all("jus de pomme les delices", "");
        assert!(stripped.contains("delices"));
        assert!(!stripped.contains(" de "));
        // "lait" starts with "la" but is not an article
        assert_eq!(ARTICLE_RE.replace_all("lait", ""), "lait");
    }
}
