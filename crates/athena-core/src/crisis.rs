//! Rule-based crisis and concern detection.
//!
//! Two tiers of pre-compiled regex patterns are evaluated against the
//! lower-cased message, with typographic apostrophes folded to `'`. The crisis tier always runs first and short-circuits;
//! the concern tier only runs when no crisis pattern matched.

use regex::{Regex, RegexSet};
use serde::{Deserialize, Serialize};

use crate::sanitize::normalize_quotes;

/// How urgently a message needs a safety-oriented response.
///
/// The absence of urgency is modelled as `Option::<UrgencyLevel>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    /// Distress, hopelessness or non-immediate self-harm.
    Concern,
    /// Immediate risk, explicit intent or actions already taken.
    Crisis,
}

impl UrgencyLevel {
    /// Returns the lowercase label used in prompts and API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyLevel::Concern => "concern",
            UrgencyLevel::Crisis => "crisis",
        }
    }
}

impl std::fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const CRISIS_PATTERNS: &[&str] = &[
    // Direct and explicit intentions
    r"\bi (want to|wanna|'m going to|gonna|will|plan to|need to) (die|kill myself|k.m.s|end it all|end my life)\b",
    r"\bi can't (go on|live|take it) (like this )?anymore\b",
    r"\b(i'm|i am) (seriously|really) (thinking of|considering) suicide\b",
    r"\b(goodbye|bye bye) (cruel )?(world|everyone)\b",
    r"\bthis is my last (message|post|day|night)\b",
    r"\bi've decided to end my life\b",
    // Specific methods
    r"\b(i'm|i am) going to (jump|hang|overdose|o.d.|shoot|cut myself)\b",
    r"\b(planning to|gonna) (jump off a bridge|hang myself|take all my pills)\b",
    r"\bi (have|got) a (gun|rope|blade|pills) and i'm going to use it\b",
    // Happening now or already done
    r"\b(i'm|i am) (cutting|bleeding) myself (right now|currently)\b",
    r"\b(i've|i have) (already )?taken (pills|medication|the whole bottle) to end my life\b",
    r"\bi (just|already) (cut myself|tried to hang myself|jumped)\b",
    r"\b(i'm|i am) being (abused|raped|assaulted) (right now|currently)\b",
    // Farewells
    r"\b(there's|there is) no other way out\b",
    r"\beveryone would be better off without me\b",
    r"\bi have a plan to kill myself\b",
    r"\btell my (family|mom|dad) i love them\b",
];

const CONCERN_PATTERNS: &[&str] = &[
    // Hopelessness and worthlessness
    r"\bi feel (so )?(hopeless|trapped|worthless|empty|numb)\b",
    r"\b(what's|what is) the point of (living|anything)\b",
    r"\b(i have|i've got|there's|there is) no (reason|point) to live\b",
    r"\bi (just )?don't want to be here anymore\b",
    r"\bi wish i (was dead|was never born|could disappear)\b",
    r"\bmy life is (meaningless|a mess|not worth living)\b",
    // Burden and isolation
    r"\b(i'm|i am) (such )?a burden (to everyone)?\b",
    r"\bno one (cares|would miss me|understands)\b",
    r"\bi feel (so|completely) alone\b",
    r"\bi'm better off dead\b",
    // Non-specific ideation
    r"\b(i've|i have) been feeling (really )?(depressed|suicidal)\b",
    r"\bi (sometimes|often|can't stop) think(ing)? about (dying|ending it|self-harm)\b",
    r"\b(i'm|i am) struggling with (suicidal thoughts|self-harm urges)\b",
    r"\bthe pain is (unbearable|too much)\b",
    // Self-harm, not immediate
    r"\bi (self-harm|self harm|s.h.|hurt myself|cut myself)\b",
    r"\b(i want to|i feel like) (cutting|hurting myself)\b",
    r"\bthe urge to (cut|self harm) is (so strong|back)\b",
];

/// One tier of patterns sharing an urgency level.
struct PatternTier {
    level: UrgencyLevel,
    /// Regex set for the fast any-match check.
    regex_set: RegexSet,
    /// Individual regexes for reporting which phrase matched.
    regexes: Vec<Regex>,
}

impl PatternTier {
    fn new(level: UrgencyLevel, patterns: &[&str]) -> Result<Self, regex::Error> {
        let regex_set = RegexSet::new(patterns)?;
        let regexes = patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            level,
            regex_set,
            regexes,
        })
    }

    fn first_match<'t>(&self, text: &'t str) -> Option<&'t str> {
        let index = self.regex_set.matches(text).into_iter().next()?;
        self.regexes[index].find(text).map(|m| m.as_str())
    }
}

/// Crisis/concern pattern matcher.
///
/// Stateless after construction; share it behind an `Arc`.
pub struct CrisisDetector {
    /// Evaluated in order; crisis first.
    tiers: [PatternTier; 2],
}

impl CrisisDetector {
    /// Creates a detector with the built-in pattern lists.
    pub fn new() -> Self {
        Self::with_patterns(CRISIS_PATTERNS, CONCERN_PATTERNS)
            .expect("built-in crisis patterns are valid")
    }

    /// Creates a detector from custom pattern lists.
    pub fn with_patterns(crisis: &[&str], concern: &[&str]) -> Result<Self, regex::Error> {
        Ok(Self {
            tiers: [
                PatternTier::new(UrgencyLevel::Crisis, crisis)?,
                PatternTier::new(UrgencyLevel::Concern, concern)?,
            ],
        })
    }

    /// Returns the urgency of `text`, or `None` when nothing matched.
    pub fn detect(&self, text: &str) -> Option<UrgencyLevel> {
        let text_lower = normalize_quotes(text).to_lowercase();
        self.tiers
            .iter()
            .find(|tier| tier.regex_set.is_match(&text_lower))
            .map(|tier| tier.level)
    }

    /// Like [`detect`](Self::detect) but also returns the matched phrase.
    pub fn detect_with_match(&self, text: &str) -> Option<(UrgencyLevel, String)> {
        let text_lower = normalize_quotes(text).to_lowercase();
        self.tiers.iter().find_map(|tier| {
            tier.first_match(&text_lower)
                .map(|m| (tier.level, m.to_string()))
        })
    }
}

impl Default for CrisisDetector {
    fn default() -> Self {
        Self::new()
    }
}
