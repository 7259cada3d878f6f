//! Input sanitization.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Maximum number of characters kept from a message.
pub const MAX_INPUT_CHARS: usize = 1000;

/// Suffix appended when a message is cut at [`MAX_INPUT_CHARS`].
pub const TRUNCATION_MARKER: &str = "... [truncated]";

static SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<script.*?>.*?</script>").expect("valid script regex"));

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));

// Placeholders from the anonymizer are matched first so they survive the filter.
static DISALLOWED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\[(?:EMAIL|PHONE|CREDIT_CARD|SSN)\])|[^\w\s.,!?'-]")
        .expect("valid character filter regex")
});

/// Folds typographic apostrophes to `'`.
///
/// Mobile and desktop keyboards substitute U+2019 for the ASCII apostrophe,
/// which the character filter would otherwise drop ("I’m" becoming "Im").
pub fn normalize_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{201B}' | '\u{02BC}' | '\u{FF07}' => '\'',
            other => other,
        })
        .collect()
}

/// Cleans raw user text before it reaches any classifier or prompt.
///
/// Script blocks and markup are removed, characters outside word
/// characters, whitespace and `.,!?'-` are dropped, and the result is capped
/// at [`MAX_INPUT_CHARS`] characters. Typographic apostrophes are folded
/// first. Always returns a string, possibly empty.
pub fn sanitize_input(text: &str) -> String {
    let text = normalize_quotes(text);
    let text = SCRIPT_BLOCK.replace_all(&text, "");
    let text = HTML_TAG.replace_all(&text, "");
    let text = DISALLOWED.replace_all(&text, |caps: &Captures| {
        caps.get(1)
            .map(|placeholder| placeholder.as_str().to_string())
            .unwrap_or_default()
    });

    let mut cleaned = text.into_owned();
    if let Some((byte_idx, _)) = cleaned.char_indices().nth(MAX_INPUT_CHARS) {
        cleaned.truncate(byte_idx);
        cleaned.push_str(TRUNCATION_MARKER);
    }

    cleaned.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_script_block() {
        assert_eq!(sanitize_input("<script>alert(1)</script>Hello"), "Hello");
    }

    #[test]
    fn strips_script_block_case_insensitive() {
        assert_eq!(
            sanitize_input("<SCRIPT type=\"text/javascript\">steal()</Script>hi there"),
            "hi there"
        );
    }

    #[test]
    fn strips_markup_and_keeps_text() {
        assert_eq!(sanitize_input("<b>I feel</b> <i>tired</i>"), "I feel tired");
    }

    #[test]
    fn drops_disallowed_characters() {
        assert_eq!(
            sanitize_input("Hey @you, what's up? #sad (really)"),
            "Hey you, what's up? sad really"
        );
    }

    #[test]
    fn folds_curly_apostrophes() {
        assert_eq!(sanitize_input("I\u{2019}ve decided"), "I've decided");
        assert_eq!(sanitize_input("I can\u{2019}t go on"), "I can't go on");
        assert_eq!(normalize_quotes("\u{2018}quoted\u{2019} it\u{02BC}s"), "'quoted' it's");
    }

    #[test]
    fn keeps_unicode_word_characters() {
        assert_eq!(sanitize_input("Tôi buồn quá!"), "Tôi buồn quá!");
    }

    #[test]
    fn truncates_long_input() {
        let input = "a".repeat(1500);
        let result = sanitize_input(&input);
        assert!(result.ends_with(TRUNCATION_MARKER));
        let content = result.strip_suffix(TRUNCATION_MARKER).unwrap();
        assert_eq!(content.chars().count(), MAX_INPUT_CHARS);
    }

    #[test]
    fn input_at_limit_is_not_truncated() {
        let input = "b".repeat(MAX_INPUT_CHARS);
        assert_eq!(sanitize_input(&input), input);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let input = "é".repeat(1200);
        let result = sanitize_input(&input);
        let content = result.strip_suffix(TRUNCATION_MARKER).unwrap();
        assert_eq!(content.chars().count(), MAX_INPUT_CHARS);
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(sanitize_input("   hello   "), "hello");
        assert_eq!(sanitize_input("<p></p>"), "");
    }

    #[test]
    fn preserves_anonymizer_placeholders() {
        assert_eq!(
            sanitize_input("mail me at [EMAIL] or [PHONE]"),
            "mail me at [EMAIL] or [PHONE]"
        );
        assert_eq!(sanitize_input("[OTHER]"), "OTHER");
    }
}
