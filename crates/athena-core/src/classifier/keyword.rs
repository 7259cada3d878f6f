//! Offline regex-based moderation.
//!
//! Catches obvious harmful requests with pre-compiled patterns when no
//! remote moderation model is configured. Self-harm statements are left to
//! the crisis detector: a person describing their own distress is never
//! refused.

use async_trait::async_trait;
use regex::{Regex, RegexSet};
use serde::{Deserialize, Serialize};

use super::{Classifier, ClassifierError, ModerationClassifier};

/// Categories of harmful content the keyword moderator recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarmCategory {
    /// Content promoting or describing violence against others.
    Violence,
    /// Hate speech or discrimination.
    Hate,
    /// Sexual content involving minors or explicit requests.
    Adult,
    /// Instructions for illegal activities.
    Illegal,
}

impl HarmCategory {
    /// Returns a human-readable name for this category.
    pub fn name(&self) -> &'static str {
        match self {
            HarmCategory::Violence => "Violence",
            HarmCategory::Hate => "Hate",
            HarmCategory::Adult => "Adult",
            HarmCategory::Illegal => "Illegal",
        }
    }
}

/// The first harmful pattern found in a text.
#[derive(Debug, Clone, PartialEq)]
pub struct HarmMatch {
    pub category: HarmCategory,
    /// Confidence score (0.0 to 1.0).
    pub confidence: f32,
    /// The matched text.
    pub matched: String,
}

struct CategoryPatterns {
    category: HarmCategory,
    regex_set: RegexSet,
    regexes: Vec<Regex>,
    confidence: f32,
}

/// Keyword moderator.
pub struct KeywordModerator {
    patterns: Vec<CategoryPatterns>,
}

impl KeywordModerator {
    /// Creates a moderator with the default patterns.
    pub fn new() -> Self {
        Self {
            patterns: vec![
                Self::violence_patterns(),
                Self::hate_patterns(),
                Self::adult_patterns(),
                Self::illegal_patterns(),
            ],
        }
    }

    /// Returns the highest-confidence match, if any.
    pub fn classify(&self, text: &str) -> Option<HarmMatch> {
        let text_lower = text.to_lowercase();

        self.patterns
            .iter()
            .filter(|p| p.regex_set.is_match(&text_lower))
            .filter_map(|p| {
                let index = p.regex_set.matches(&text_lower).into_iter().next()?;
                let m = p.regexes[index].find(&text_lower)?;
                Some(HarmMatch {
                    category: p.category,
                    confidence: p.confidence,
                    matched: m.as_str().to_string(),
                })
            })
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    }

    fn violence_patterns() -> CategoryPatterns {
        // Word boundaries keep "skill" from matching "kill"
        let patterns = [
            r"\b(kill|murder|assassinate)\s+(someone|people|him|her|them)\b",
            r"\bhow\s+to\s+(kill|murder|assassinate)\s+(a\s+)?(person|someone|people)\b",
            r"\b(bomb|explosive)\s+(making|instructions|build)\b",
            r"\bmake\s+a\s+(bomb|explosive|weapon)\b",
            r"\b(plan|planning)\s+a\s+(mass\s+shooting|school\s+shooting|terrorist\s+attack)\b",
            r"\btorture\s+(someone|people|methods)\b",
        ];
        Self::build(HarmCategory::Violence, &patterns, 0.95)
    }

    fn hate_patterns() -> CategoryPatterns {
        let patterns = [
            r"\b(hate|kill|eliminate)\s+(all\s+)?(jews|muslims|blacks|whites|asians|gays|immigrants)\b",
            r"\b(racial|ethnic)\s+(cleansing|genocide|extermination)\b",
            r"\b(master\s+race|white\s+power|racial\s+purity)\b",
            r"\bwrite\s+(hate\s+)?speech\s+(against|targeting)\b",
        ];
        Self::build(HarmCategory::Hate, &patterns, 0.95)
    }

    fn adult_patterns() -> CategoryPatterns {
        let patterns = [
            r"\bwrite\s+(porn|erotica|smut)\b",
            r"\b(child|minor|underage)\s+(porn|sexual|nude)\b",
            r"\bsexual\s+content\s+(involving|with)\s+(child|minor)\b",
        ];
        Self::build(HarmCategory::Adult, &patterns, 0.95)
    }

    fn illegal_patterns() -> CategoryPatterns {
        let patterns = [
            r"\bhow\s+to\s+(make|cook|synthesize)\s+(meth|cocaine|heroin|fentanyl)\b",
            r"\b(drug|meth)\s+(recipe|synthesis|manufacturing)\b",
            r"\bhack\s+into\s+(\S+\s+)?(bank|account|computer|system)\b",
            r"\bsteal\s+(identity|credit\s+card|personal\s+data)\b",
            r"\bcreate\s+(fake|counterfeit)\s+(id|passport|money)\b",
            r"\blaunder\s+money\b",
        ];
        Self::build(HarmCategory::Illegal, &patterns, 0.90)
    }

    fn build(category: HarmCategory, patterns: &[&str], confidence: f32) -> CategoryPatterns {
        let regex_set = RegexSet::new(patterns).expect("Invalid regex patterns");
        let regexes = patterns
            .iter()
            .map(|p| Regex::new(p).expect("Invalid regex pattern"))
            .collect();

        CategoryPatterns {
            category,
            regex_set,
            regexes,
            confidence,
        }
    }
}

impl Default for KeywordModerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for KeywordModerator {
    fn name(&self) -> &'static str {
        "keyword"
    }
}

#[async_trait]
impl ModerationClassifier for KeywordModerator {
    async fn harmful_probability(&self, text: &str) -> Result<f32, ClassifierError> {
        Ok(self.classify(text).map(|m| m.confidence).unwrap_or(0.0))
    }
}
