//! Scored-label types shared by all classifiers.

use serde::{Deserialize, Serialize};

use crate::crisis::UrgencyLevel;

/// Probability above which content counts as harmful.
///
/// The comparison is strict: a score of exactly 0.7 is not harmful.
pub const HARMFUL_THRESHOLD: f32 = 0.7;

/// Score above which sadness, anger or fear forces a negative label.
pub const NEGATIVE_EMOTION_THRESHOLD: f32 = 0.7;

/// Number of emotions kept after ranking.
pub const DEFAULT_TOP_EMOTIONS: usize = 3;

/// Emotions that override a non-negative sentiment label.
pub const NEGATIVE_EMOTIONS: &[&str] = &["sadness", "anger", "fear"];

/// Outcome of harmful-content moderation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModerationResult {
    /// Whether the content crossed [`HARMFUL_THRESHOLD`].
    pub is_harmful: bool,
    /// Probability mass on the harmful class (0.0 to 1.0).
    pub score: f32,
}

impl ModerationResult {
    /// Derives the verdict from a harmful-class probability.
    pub fn from_score(score: f32) -> Self {
        let score = score.clamp(0.0, 1.0);
        Self {
            is_harmful: score > HARMFUL_THRESHOLD,
            score,
        }
    }
}

/// Sentiment label.
///
/// `Concern` and `Crisis` only appear when urgency detection overrides the
/// statistical classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
    Concern,
    Crisis,
}

impl SentimentLabel {
    /// Returns the lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Concern => "concern",
            SentimentLabel::Crisis => "crisis",
        }
    }

    /// Maps a raw model label onto a sentiment label.
    ///
    /// Accepts the common spellings (`POSITIVE`, `pos`) and the
    /// `LABEL_0/1/2` ids used by three-class sentiment models.
    pub fn from_model_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "positive" | "pos" | "label_2" => Some(SentimentLabel::Positive),
            "negative" | "neg" | "label_0" => Some(SentimentLabel::Negative),
            "neutral" | "neu" | "label_1" => Some(SentimentLabel::Neutral),
            _ => None,
        }
    }
}

impl From<UrgencyLevel> for SentimentLabel {
    fn from(level: UrgencyLevel) -> Self {
        match level {
            UrgencyLevel::Concern => SentimentLabel::Concern,
            UrgencyLevel::Crisis => SentimentLabel::Crisis,
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sentiment label with its confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub label: SentimentLabel,
    /// Confidence score (0.0 to 1.0).
    pub confidence: f32,
}

impl SentimentResult {
    /// Creates a sentiment result, clamping the confidence.
    pub fn new(label: SentimentLabel, confidence: f32) -> Self {
        Self {
            label,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// The value used when the sentiment classifier is unavailable.
    pub fn neutral_fallback() -> Self {
        Self::new(SentimentLabel::Neutral, 0.5)
    }
}

/// A single emotion label with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionScore {
    pub label: String,
    /// Score (0.0 to 1.0).
    pub score: f32,
}

impl EmotionScore {
    /// Creates an emotion score, clamping the score.
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score: score.clamp(0.0, 1.0),
        }
    }

    /// The value used when the emotion classifier is unavailable.
    pub fn unknown_fallback() -> Vec<Self> {
        vec![Self::new("unknown", 0.5)]
    }

    /// Returns true for sadness, anger or fear above the override threshold.
    pub fn is_strong_negative(&self) -> bool {
        self.score > NEGATIVE_EMOTION_THRESHOLD
            && NEGATIVE_EMOTIONS.contains(&self.label.as_str())
    }
}

/// Sorts emotions by descending score and keeps the first `top_n`.
pub fn rank_emotions(mut emotions: Vec<EmotionScore>, top_n: usize) -> Vec<EmotionScore> {
    emotions.sort_by(|a, b| b.score.total_cmp(&a.score));
    emotions.truncate(top_n);
    emotions
}

/// Result of a fail-open classifier call.
///
/// A failing classifier never fails the request: the caller receives a
/// safe default and the reason it was used.
#[derive(Debug, Clone, PartialEq)]
pub enum Assessment<T> {
    /// The classifier answered.
    Measured(T),
    /// The classifier failed; `fallback` stands in for its answer.
    Degraded { fallback: T, reason: String },
}

impl<T> Assessment<T> {
    /// Returns the measured value or the fallback.
    pub fn value(&self) -> &T {
        match self {
            Assessment::Measured(value) => value,
            Assessment::Degraded { fallback, .. } => fallback,
        }
    }

    /// Returns true if the fallback was used.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Assessment::Degraded { .. })
    }

    /// Returns the degradation reason, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Assessment::Measured(_) => None,
            Assessment::Degraded { reason, .. } => Some(reason),
        }
    }

    /// Transforms the contained value, preserving degradation.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Assessment<U> {
        match self {
            Assessment::Measured(value) => Assessment::Measured(f(value)),
            Assessment::Degraded { fallback, reason } => Assessment::Degraded {
                fallback: f(fallback),
                reason,
            },
        }
    }
}

/// Sentiment and emotions for one message.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedSentiment {
    pub sentiment: Assessment<SentimentResult>,
    pub emotions: Assessment<Vec<EmotionScore>>,
    /// Set when urgency detection replaced the classifiers.
    pub urgency_override: Option<UrgencyLevel>,
}

impl CombinedSentiment {
    /// Builds the synthetic result used when urgency was detected.
    pub fn from_urgency(level: UrgencyLevel) -> Self {
        Self {
            sentiment: Assessment::Measured(SentimentResult::new(level.into(), 1.0)),
            emotions: Assessment::Measured(vec![EmotionScore::new(
                format!("{}_detected", level.as_str()),
                1.0,
            )]),
            urgency_override: Some(level),
        }
    }
}
