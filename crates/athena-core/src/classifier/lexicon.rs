//! Lexicon-based sentiment and emotion analysis.
//!
//! An offline stand-in for the remote sentiment and emotion models. Each
//! lexicon word carries a valence, a weight and optionally one of the six
//! emotion labels used by the remote emotion model. Negations within three
//! words flip and dampen valence; intensifiers boost the next sentiment word.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{
    Classifier, ClassifierError, EmotionClassifier, EmotionScore, SentimentClassifier,
    SentimentLabel, SentimentResult,
};

/// Overall valence magnitude below which text is neutral.
const NEUTRAL_BAND: f32 = 0.05;

/// Emotion labels, matching the remote emotion model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Sadness,
    Joy,
    Love,
    Anger,
    Fear,
    Surprise,
}

impl Emotion {
    /// Returns all emotion labels.
    pub fn all() -> &'static [Emotion] {
        &[
            Emotion::Sadness,
            Emotion::Joy,
            Emotion::Love,
            Emotion::Anger,
            Emotion::Fear,
            Emotion::Surprise,
        ]
    }

    /// Returns the lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Sadness => "sadness",
            Emotion::Joy => "joy",
            Emotion::Love => "love",
            Emotion::Anger => "anger",
            Emotion::Fear => "fear",
            Emotion::Surprise => "surprise",
        }
    }
}

#[derive(Debug, Clone)]
struct LexiconEntry {
    /// Valence score (-1.0 to 1.0).
    valence: f32,
    weight: f32,
    emotion: Option<Emotion>,
}

/// A lexicon word seen in the text, after negation and intensifiers.
struct ScoredWord {
    valence: f32,
    weight: f32,
    emotion: Option<Emotion>,
    negated: bool,
}

/// Lexicon sentiment and emotion analyzer.
pub struct LexiconAnalyzer {
    lexicon: HashMap<String, LexiconEntry>,
    intensifiers: HashMap<String, f32>,
    negations: HashSet<String>,
}

impl LexiconAnalyzer {
    /// Creates an analyzer with the default lexicons.
    pub fn new() -> Self {
        let mut analyzer = Self {
            lexicon: HashMap::new(),
            intensifiers: HashMap::new(),
            negations: HashSet::new(),
        };
        analyzer.load_intensifiers();
        analyzer.load_negations();
        analyzer.load_word_lexicon();
        analyzer
    }

    /// Returns the overall valence of `text` (-1.0 to 1.0).
    pub fn valence(&self, text: &str) -> f32 {
        let scored = self.score_words(text);
        let total_weight: f32 = scored.iter().map(|w| w.weight).sum();
        if total_weight == 0.0 {
            return 0.0;
        }

        let total: f32 = scored
            .iter()
            .map(|w| {
                let score = w.valence * w.weight;
                if w.negated {
                    -score * 0.7
                } else {
                    score
                }
            })
            .sum();

        (total / total_weight).clamp(-1.0, 1.0)
    }

    /// Classifies `text` as positive, negative or neutral.
    pub fn classify_sentiment(&self, text: &str) -> SentimentResult {
        let valence = self.valence(text);
        if valence > NEUTRAL_BAND {
            SentimentResult::new(SentimentLabel::Positive, 0.5 + valence / 2.0)
        } else if valence < -NEUTRAL_BAND {
            SentimentResult::new(SentimentLabel::Negative, 0.5 - valence / 2.0)
        } else {
            SentimentResult::new(SentimentLabel::Neutral, 1.0 - valence.abs() * 10.0)
        }
    }

    /// Scores each emotion present in `text`.
    ///
    /// Scores are each emotion's share of the emotional weight, scaled down
    /// when little emotional language is present. Negated words are ignored.
    pub fn score_emotions(&self, text: &str) -> Vec<EmotionScore> {
        let mut weights: HashMap<Emotion, f32> = HashMap::new();
        for word in self.score_words(text) {
            if let (Some(emotion), false) = (word.emotion, word.negated) {
                *weights.entry(emotion).or_insert(0.0) += word.weight;
            }
        }

        let total: f32 = weights.values().sum();
        if total == 0.0 {
            return Vec::new();
        }
        let saturation = total / (total + 0.5);

        Emotion::all()
            .iter()
            .filter_map(|emotion| {
                weights
                    .get(emotion)
                    .map(|w| EmotionScore::new(emotion.as_str(), w / total * saturation))
            })
            .collect()
    }

    fn score_words(&self, text: &str) -> Vec<ScoredWord> {
        let text_lower = text.to_lowercase();
        let mut scored = Vec::new();
        let mut negation_distance: Option<usize> = None;
        let mut pending_intensifier = 1.0f32;

        for raw in text_lower.split_whitespace() {
            let word = raw.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'');
            if word.is_empty() {
                continue;
            }

            if self.negations.contains(word) {
                negation_distance = Some(0);
                continue;
            }

            if let Some(&boost) = self.intensifiers.get(word) {
                pending_intensifier = boost;
                continue;
            }

            if let Some(entry) = self.lexicon.get(word) {
                scored.push(ScoredWord {
                    valence: (entry.valence * pending_intensifier).clamp(-1.0, 1.0),
                    weight: entry.weight * pending_intensifier,
                    emotion: entry.emotion,
                    negated: negation_distance.is_some_and(|d| d < 3),
                });
                pending_intensifier = 1.0;
            }

            // Negation only reaches three words forward
            negation_distance = match negation_distance {
                Some(d) if d + 1 < 3 => Some(d + 1),
                _ => None,
            };
        }

        scored
    }

    fn load_intensifiers(&mut self) {
        let intensifiers = [
            ("very", 1.3),
            ("really", 1.3),
            ("extremely", 1.5),
            ("absolutely", 1.5),
            ("totally", 1.3),
            ("so", 1.2),
            ("incredibly", 1.4),
            ("terribly", 1.4),
            ("deeply", 1.3),
            ("completely", 1.4),
        ];

        for (word, boost) in intensifiers {
            self.intensifiers.insert(word.to_string(), boost);
        }
    }

    fn load_negations(&mut self) {
        let negations = [
            "not", "no", "never", "none", "nobody", "nothing", "cannot", "can't", "don't",
            "doesn't", "didn't", "won't", "wouldn't", "couldn't", "isn't", "aren't", "wasn't",
            "weren't", "haven't", "hasn't",
        ];

        for word in negations {
            self.negations.insert(word.to_string());
        }
    }

    fn load_word_lexicon(&mut self) {
        let emotional_words: [(Emotion, &[(&str, f32, f32)]); 6] = [
            (
                Emotion::Sadness,
                &[
                    ("sad", -0.7, 1.0),
                    ("unhappy", -0.7, 1.0),
                    ("depressed", -0.9, 1.2),
                    ("lonely", -0.8, 1.1),
                    ("alone", -0.6, 1.0),
                    ("hopeless", -0.9, 1.2),
                    ("worthless", -0.9, 1.2),
                    ("miserable", -0.8, 1.1),
                    ("empty", -0.6, 0.9),
                    ("crying", -0.6, 1.0),
                    ("cried", -0.6, 1.0),
                    ("tears", -0.5, 0.9),
                    ("heartbroken", -0.8, 1.1),
                    ("devastated", -0.9, 1.2),
                    ("grief", -0.8, 1.1),
                    ("broken", -0.7, 1.0),
                    ("lost", -0.5, 0.8),
                    ("hurt", -0.6, 0.9),
                    ("rejected", -0.7, 1.0),
                    ("abandoned", -0.8, 1.1),
                    ("unloved", -0.8, 1.1),
                    ("exhausted", -0.5, 0.8),
                ],
            ),
            (
                Emotion::Fear,
                &[
                    ("anxious", -0.7, 1.0),
                    ("anxiety", -0.7, 1.0),
                    ("worried", -0.5, 0.8),
                    ("scared", -0.6, 0.9),
                    ("afraid", -0.6, 0.9),
                    ("terrified", -0.8, 1.1),
                    ("nervous", -0.5, 0.8),
                    ("panic", -0.8, 1.1),
                    ("overwhelmed", -0.7, 1.0),
                    ("trapped", -0.7, 1.0),
                    ("stressed", -0.6, 0.9),
                ],
            ),
            (
                Emotion::Anger,
                &[
                    ("angry", -0.7, 0.9),
                    ("furious", -0.9, 1.1),
                    ("annoyed", -0.5, 0.7),
                    ("frustrated", -0.6, 0.8),
                    ("irritated", -0.5, 0.7),
                    ("mad", -0.6, 0.8),
                    ("hate", -0.8, 1.0),
                    ("resent", -0.7, 0.9),
                    ("upset", -0.6, 0.8),
                ],
            ),
            (
                Emotion::Joy,
                &[
                    ("happy", 0.8, 1.0),
                    ("glad", 0.7, 0.9),
                    ("joy", 0.9, 1.1),
                    ("great", 0.7, 0.9),
                    ("good", 0.6, 0.8),
                    ("wonderful", 0.8, 1.0),
                    ("awesome", 0.8, 1.0),
                    ("excited", 0.7, 0.9),
                    ("proud", 0.7, 0.9),
                    ("grateful", 0.7, 0.9),
                    ("thankful", 0.7, 0.9),
                    ("calm", 0.5, 0.7),
                    ("relieved", 0.6, 0.8),
                    ("hopeful", 0.6, 0.8),
                    ("fun", 0.6, 0.8),
                ],
            ),
            (
                Emotion::Love,
                &[
                    ("love", 0.8, 1.0),
                    ("loved", 0.8, 1.0),
                    ("adore", 0.8, 1.0),
                    ("caring", 0.6, 0.8),
                    ("cherish", 0.8, 1.0),
                    ("affection", 0.7, 0.9),
                ],
            ),
            (
                Emotion::Surprise,
                &[
                    ("surprised", 0.2, 0.8),
                    ("shocked", -0.2, 0.9),
                    ("amazed", 0.6, 0.9),
                    ("astonished", 0.3, 0.9),
                    ("unexpected", 0.0, 0.6),
                ],
            ),
        ];

        for (emotion, words) in emotional_words {
            for &(word, valence, weight) in words {
                self.lexicon.insert(
                    word.to_string(),
                    LexiconEntry {
                        valence,
                        weight,
                        emotion: Some(emotion),
                    },
                );
            }
        }

        // Valence-only words
        let plain_words = [
            ("terrible", -0.7, 0.9),
            ("awful", -0.7, 0.9),
            ("horrible", -0.8, 1.0),
            ("worst", -0.8, 1.0),
            ("bad", -0.5, 0.7),
            ("useless", -0.7, 0.9),
            ("failure", -0.7, 1.0),
            ("pain", -0.6, 0.9),
            ("tired", -0.3, 0.5),
            ("sick", -0.4, 0.6),
            ("nice", 0.5, 0.7),
            ("kind", 0.6, 0.8),
            ("helpful", 0.6, 0.8),
            ("friend", 0.5, 0.7),
            ("friends", 0.5, 0.7),
            ("beautiful", 0.7, 0.9),
            ("amazing", 0.8, 1.0),
            ("fine", 0.3, 0.5),
            ("better", 0.5, 0.7),
        ];

        for (word, valence, weight) in plain_words {
            self.lexicon
                .entry(word.to_string())
                .or_insert(LexiconEntry {
                    valence,
                    weight,
                    emotion: None,
                });
        }
    }
}

impl Default for LexiconAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for LexiconAnalyzer {
    fn name(&self) -> &'static str {
        "lexicon"
    }
}

#[async_trait]
impl SentimentClassifier for LexiconAnalyzer {
    async fn sentiment(&self, text: &str) -> Result<SentimentResult, ClassifierError> {
        Ok(self.classify_sentiment(text))
    }
}

#[async_trait]
impl EmotionClassifier for LexiconAnalyzer {
    async fn emotions(&self, text: &str) -> Result<Vec<EmotionScore>, ClassifierError> {
        Ok(self.score_emotions(text))
    }
}
