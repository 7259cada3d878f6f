//! PII masking.
//!
//! Patterns are applied in a fixed order. Earlier patterns consume their
//! digits, so a credit card number is never also reported as a phone number.

use once_cell::sync::Lazy;
use regex::Regex;

/// Placeholder for email addresses.
pub const EMAIL_PLACEHOLDER: &str = "[EMAIL]";
/// Placeholder for phone numbers.
pub const PHONE_PLACEHOLDER: &str = "[PHONE]";
/// Placeholder for credit-card-like digit groups.
pub const CREDIT_CARD_PLACEHOLDER: &str = "[CREDIT_CARD]";
/// Placeholder for SSN-like numbers.
pub const SSN_PLACEHOLDER: &str = "[SSN]";

struct PiiPattern {
    regex: Regex,
    placeholder: &'static str,
}

static PII_PATTERNS: Lazy<Vec<PiiPattern>> = Lazy::new(|| {
    let patterns: [(&str, &'static str); 6] = [
        (
            r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}",
            EMAIL_PLACEHOLDER,
        ),
        (r"\b(?:\d{4}[- ]?){3}\d{4}\b", CREDIT_CARD_PLACEHOLDER),
        (r"\b\d{3}-\d{2}-\d{4}\b", SSN_PLACEHOLDER),
        // +1 555 123 4567, +44 20 7946 0958
        (
            r"\+\d{1,3}[-.\s]?\d{1,4}[-.\s]?\d{3,4}[-.\s]?\d{3,4}\b",
            PHONE_PLACEHOLDER,
        ),
        // (555) 123-4567
        (r"\(\d{3}\)\s*\d{3}[-.\s]?\d{4}\b", PHONE_PLACEHOLDER),
        // 555-123-4567, 555.123.4567, 555 123 4567
        (r"\b\d{3}[-.\s]\d{3}[-.\s]\d{4}\b", PHONE_PLACEHOLDER),
    ];

    patterns
        .into_iter()
        .map(|(pattern, placeholder)| PiiPattern {
            regex: Regex::new(pattern).expect("valid PII regex"),
            placeholder,
        })
        .collect()
});

/// Replaces emails, phone numbers, card numbers and SSNs with placeholders.
pub fn anonymize_text(text: &str) -> String {
    PII_PATTERNS
        .iter()
        .fold(text.to_string(), |acc, pattern| {
            pattern
                .regex
                .replace_all(&acc, pattern.placeholder)
                .into_owned()
        })
}

/// Returns true if the text contains anything [`anonymize_text`] would mask.
pub fn contains_pii(text: &str) -> bool {
    PII_PATTERNS.iter().any(|p| p.regex.is_match(text))
}
