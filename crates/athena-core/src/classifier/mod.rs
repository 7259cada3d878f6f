//! Text classification for the triage pipeline.
//!
//! Moderation, sentiment and emotion are opaque scored-label services behind
//! async traits. [`Classifiers`] bundles one of each and applies the
//! thresholds and fail-open rules the pipeline relies on.

mod adapter;
mod keyword;
mod lexicon;
mod remote;
mod types;

pub use adapter::Classifiers;
pub use keyword::{HarmCategory, HarmMatch, KeywordModerator};
pub use lexicon::{Emotion, LexiconAnalyzer};
pub use remote::{RemoteClassifier, RemoteModels};
pub use types::{
    rank_emotions, Assessment, CombinedSentiment, EmotionScore, ModerationResult,
    SentimentLabel, SentimentResult, DEFAULT_TOP_EMOTIONS, HARMFUL_THRESHOLD,
    NEGATIVE_EMOTIONS, NEGATIVE_EMOTION_THRESHOLD,
};

use async_trait::async_trait;
use thiserror::Error;

use crate::inference::InferenceFailure;

/// Errors returned by classifier implementations.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// The remote inference call failed.
    #[error("inference failed: {0}")]
    Inference(#[from] InferenceFailure),

    /// The service answered with labels we could not interpret.
    #[error("unexpected classifier output: {0}")]
    UnexpectedOutput(String),
}

/// Common identity of every classifier.
pub trait Classifier: Send + Sync {
    /// Returns the name of this classifier for logging.
    fn name(&self) -> &'static str;
}

/// Harmful-content moderation.
#[async_trait]
pub trait ModerationClassifier: Classifier {
    /// Returns the probability (0.0 to 1.0) that `text` is harmful.
    async fn harmful_probability(&self, text: &str) -> Result<f32, ClassifierError>;
}

/// Positive/negative/neutral sentiment.
#[async_trait]
pub trait SentimentClassifier: Classifier {
    /// Returns the dominant sentiment of `text`.
    async fn sentiment(&self, text: &str) -> Result<SentimentResult, ClassifierError>;
}

/// Multi-label emotion scoring.
#[async_trait]
pub trait EmotionClassifier: Classifier {
    /// Returns every emotion label the service scored, in any order.
    async fn emotions(&self, text: &str) -> Result<Vec<EmotionScore>, ClassifierError>;
}
