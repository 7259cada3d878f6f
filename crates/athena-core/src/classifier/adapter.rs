//! Uniform access to the three classifiers.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{
    rank_emotions, Assessment, ClassifierError, CombinedSentiment, EmotionClassifier,
    EmotionScore, KeywordModerator, LexiconAnalyzer, ModerationClassifier, ModerationResult,
    SentimentClassifier, SentimentLabel, SentimentResult, DEFAULT_TOP_EMOTIONS,
};
use crate::crisis::UrgencyLevel;

/// Moderation, sentiment and emotion classifiers behind one handle.
///
/// Built once at start-up and shared by every request.
#[derive(Clone)]
pub struct Classifiers {
    moderation: Arc<dyn ModerationClassifier>,
    sentiment: Arc<dyn SentimentClassifier>,
    emotion: Arc<dyn EmotionClassifier>,
}

impl Classifiers {
    /// Creates an adapter over the given classifiers.
    pub fn new(
        moderation: Arc<dyn ModerationClassifier>,
        sentiment: Arc<dyn SentimentClassifier>,
        emotion: Arc<dyn EmotionClassifier>,
    ) -> Self {
        Self {
            moderation,
            sentiment,
            emotion,
        }
    }

    /// Creates an adapter backed by the local keyword and lexicon classifiers.
    pub fn offline() -> Self {
        let lexicon = Arc::new(LexiconAnalyzer::new());
        Self {
            moderation: Arc::new(KeywordModerator::new()),
            sentiment: lexicon.clone(),
            emotion: lexicon,
        }
    }

    /// Returns the classifier names as (moderation, sentiment, emotion).
    pub fn names(&self) -> (&'static str, &'static str, &'static str) {
        (
            self.moderation.name(),
            self.sentiment.name(),
            self.emotion.name(),
        )
    }

    /// Moderates `text`. Failures propagate; moderation never fails open.
    pub async fn moderate(&self, text: &str) -> Result<ModerationResult, ClassifierError> {
        let score = self.moderation.harmful_probability(text).await?;
        let result = ModerationResult::from_score(score);
        debug!(
            classifier = self.moderation.name(),
            score = result.score,
            harmful = result.is_harmful,
            "Moderation complete"
        );
        Ok(result)
    }

    /// Classifies sentiment, falling back to neutral/0.5 on failure.
    pub async fn sentiment(&self, text: &str) -> Assessment<SentimentResult> {
        match self.sentiment.sentiment(text).await {
            Ok(result) => Assessment::Measured(result),
            Err(e) => {
                warn!(
                    classifier = self.sentiment.name(),
                    error = %e,
                    "Sentiment classifier failed, using neutral fallback"
                );
                Assessment::Degraded {
                    fallback: SentimentResult::neutral_fallback(),
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Scores emotions, keeping the `top_n` highest.
    ///
    /// Falls back to a single `("unknown", 0.5)` entry on failure.
    pub async fn emotions(&self, text: &str, top_n: usize) -> Assessment<Vec<EmotionScore>> {
        match self.emotion.emotions(text).await {
            Ok(scores) => Assessment::Measured(rank_emotions(scores, top_n)),
            Err(e) => {
                warn!(
                    classifier = self.emotion.name(),
                    error = %e,
                    "Emotion classifier failed, using unknown fallback"
                );
                Assessment::Degraded {
                    fallback: EmotionScore::unknown_fallback(),
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Sentiment and emotions for a message, honouring detected urgency.
    ///
    /// With urgency present neither classifier is called and the result is
    /// the urgency label at confidence 1.0. Otherwise both classifiers run
    /// concurrently, and a strong sadness, anger or fear score forces the
    /// label to negative.
    pub async fn combined_sentiment(
        &self,
        text: &str,
        urgency: Option<UrgencyLevel>,
    ) -> CombinedSentiment {
        if let Some(level) = urgency {
            debug!(urgency = %level, "Urgency detected, bypassing sentiment classifiers");
            return CombinedSentiment::from_urgency(level);
        }

        let (sentiment, emotions) = tokio::join!(
            self.sentiment(text),
            self.emotions(text, DEFAULT_TOP_EMOTIONS)
        );

        let forced_negative = emotions.value().iter().any(EmotionScore::is_strong_negative);
        let sentiment = if forced_negative {
            sentiment.map(|s| SentimentResult::new(SentimentLabel::Negative, s.confidence))
        } else {
            sentiment
        };

        CombinedSentiment {
            sentiment,
            emotions,
            urgency_override: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::classifier::Classifier;
    use crate::inference::InferenceFailure;

    /// Scripted classifier that counts its calls.
    #[derive(Default)]
    struct Scripted {
        harmful: f32,
        sentiment: Option<SentimentResult>,
        emotions: Option<Vec<EmotionScore>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Classifier for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    #[async_trait]
    impl ModerationClassifier for Scripted {
        async fn harmful_probability(&self, _text: &str) -> Result<f32, ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.harmful)
        }
    }

    #[async_trait]
    impl SentimentClassifier for Scripted {
        async fn sentiment(&self, _text: &str) -> Result<SentimentResult, ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.sentiment
                .ok_or(ClassifierError::Inference(InferenceFailure::Timeout))
        }
    }

    #[async_trait]
    impl EmotionClassifier for Scripted {
        async fn emotions(&self, _text: &str) -> Result<Vec<EmotionScore>, ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.emotions
                .clone()
                .ok_or_else(|| ClassifierError::UnexpectedOutput("empty body".to_string()))
        }
    }

    fn adapter(scripted: Arc<Scripted>) -> Classifiers {
        Classifiers::new(scripted.clone(), scripted.clone(), scripted)
    }

    #[tokio::test]
    async fn moderation_uses_strict_threshold() {
        let at_boundary = Arc::new(Scripted {
            harmful: 0.7,
            ..Default::default()
        });
        assert!(!adapter(at_boundary).moderate("x").await.unwrap().is_harmful);

        let above = Arc::new(Scripted {
            harmful: 0.75,
            ..Default::default()
        });
        assert!(adapter(above).moderate("x").await.unwrap().is_harmful);
    }

    #[tokio::test]
    async fn sentiment_fails_open_to_neutral() {
        let scripted = Arc::new(Scripted::default());
        let result = adapter(scripted).sentiment("anything").await;
        assert!(result.is_degraded());
        assert_eq!(*result.value(), SentimentResult::neutral_fallback());
    }

    #[tokio::test]
    async fn emotions_fail_open_to_unknown() {
        let scripted = Arc::new(Scripted::default());
        let result = adapter(scripted).emotions("anything", 3).await;
        assert!(result.is_degraded());
        assert_eq!(result.value(), &vec![EmotionScore::new("unknown", 0.5)]);
    }

    #[tokio::test]
    async fn emotions_are_ranked_and_truncated() {
        let scripted = Arc::new(Scripted {
            emotions: Some(vec![
                EmotionScore::new("surprise", 0.05),
                EmotionScore::new("joy", 0.5),
                EmotionScore::new("love", 0.3),
                EmotionScore::new("fear", 0.15),
            ]),
            ..Default::default()
        });
        let result = adapter(scripted).emotions("anything", 3).await;
        let labels: Vec<_> = result.value().iter().map(|e| e.label.clone()).collect();
        assert_eq!(labels, vec!["joy", "love", "fear"]);
    }

    #[tokio::test]
    async fn urgency_bypasses_classifiers() {
        let scripted = Arc::new(Scripted {
            sentiment: Some(SentimentResult::new(SentimentLabel::Positive, 0.9)),
            emotions: Some(vec![EmotionScore::new("joy", 0.9)]),
            ..Default::default()
        });
        let classifiers = adapter(scripted.clone());

        let combined = classifiers
            .combined_sentiment("I feel hopeless", Some(UrgencyLevel::Concern))
            .await;

        assert_eq!(combined.sentiment.value().label, SentimentLabel::Concern);
        assert_eq!(combined.sentiment.value().confidence, 1.0);
        assert_eq!(combined.emotions.value()[0].label, "concern_detected");
        assert_eq!(scripted.calls(), 0);
    }

    #[tokio::test]
    async fn strong_negative_emotion_forces_negative_label() {
        let scripted = Arc::new(Scripted {
            sentiment: Some(SentimentResult::new(SentimentLabel::Positive, 0.8)),
            emotions: Some(vec![
                EmotionScore::new("sadness", 0.85),
                EmotionScore::new("joy", 0.1),
            ]),
            ..Default::default()
        });
        let combined = adapter(scripted.clone())
            .combined_sentiment("it's fine I guess", None)
            .await;

        assert_eq!(combined.sentiment.value().label, SentimentLabel::Negative);
        assert_eq!(combined.sentiment.value().confidence, 0.8);
        assert!(combined.urgency_override.is_none());
        assert_eq!(scripted.calls(), 2);
    }

    #[tokio::test]
    async fn weak_negative_emotion_keeps_label() {
        let scripted = Arc::new(Scripted {
            sentiment: Some(SentimentResult::new(SentimentLabel::Positive, 0.8)),
            emotions: Some(vec![EmotionScore::new("anger", 0.7)]),
            ..Default::default()
        });
        let combined = adapter(scripted).combined_sentiment("fine", None).await;
        assert_eq!(combined.sentiment.value().label, SentimentLabel::Positive);
    }

    #[tokio::test]
    async fn degraded_classifiers_do_not_fail_combined_analysis() {
        let scripted = Arc::new(Scripted::default());
        let combined = adapter(scripted).combined_sentiment("hello", None).await;
        assert!(combined.sentiment.is_degraded());
        assert!(combined.emotions.is_degraded());
        assert_eq!(combined.sentiment.value().label, SentimentLabel::Neutral);
    }

    #[test]
    fn offline_adapter_names() {
        let classifiers = Classifiers::offline();
        assert_eq!(classifiers.names(), ("keyword", "lexicon", "lexicon"));
    }
}
