//! Default text sanitizer for free text that arrives from outside the app
//! (share links, saved-team names, legacy storage).

/// Longest free-text value kept after sanitizing.
pub const MAX_TEXT_LEN: usize = 64;

/// Characters that can open a tag, an attribute value or an entity.
/// Apostrophes are kept: item and move names use them.
fn is_markup_char(c: char) -> bool {
    matches!(c, '<' | '>' | '"' | '`' | '&') || c.is_control()
}

/// Drop markup characters, trim, and cap the length.
pub fn strip_markup(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .filter(|c| !is_markup_char(*c))
        .take(MAX_TEXT_LEN)
        .collect();
    cleaned.trim().to_string()
}
