/// Sanitize OCR text before extraction.
/// Strips control characters and OCR noise glyphs, keeps price punctuation,
/// trims lines and drops empty ones.
pub fn sanitize_ocr_text(raw: &str) -> String {
    raw.chars()
        .map(|c| if c == '\t' { ' ' } else { c })
        .filter(|c| {
            c.is_alphanumeric()
                || *c == '\n'
                || (c.is_whitespace() && !c.is_control())
                || matches!(
                    c,
                    '$' | '¢'
                        | '€'
                        | '.'
                        | ','
                        | ';'
                        | ':'
                        | '-'
                        | '/'
                        | '('
                        | ')'
                        | '+'
                        | '%'
                        | '#'
                        | '&'
                        | '\''
                        | '"'
                        | '!'
                        | '*'
                        | '«'
                        | '»'
                        | '\u{2019}' // Right single quotation mark
                        | '\u{2013}' // En-dash
                )
        })
        .collect::<String>()
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
