//! Classifiers backed by hosted text-classification models.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use super::{
    Classifier, ClassifierError, EmotionClassifier, EmotionScore, ModerationClassifier,
    SentimentClassifier, SentimentLabel, SentimentResult,
};
use crate::inference::InferenceApi;

/// Model ids used by [`RemoteClassifier`].
#[derive(Debug, Clone)]
pub struct RemoteModels {
    pub moderation: String,
    /// Label whose score counts as the harmful probability.
    pub harmful_label: String,
    pub sentiment: String,
    pub emotion: String,
}

#[derive(Debug, Clone, Deserialize)]
struct LabelScore {
    label: String,
    score: f32,
}

/// Moderation, sentiment and emotion over the Inference API.
pub struct RemoteClassifier {
    api: Arc<InferenceApi>,
    models: RemoteModels,
}

impl RemoteClassifier {
    /// Creates a remote classifier sharing `api`.
    pub fn new(api: Arc<InferenceApi>, models: RemoteModels) -> Self {
        Self { api, models }
    }

    async fn classify(&self, model: &str, text: &str) -> Result<Vec<LabelScore>, ClassifierError> {
        let payload = json!({
            "inputs": text,
            "options": { "wait_for_model": true },
        });
        let body = self.api.post(model, &payload).await?;
        parse_label_scores(body)
    }
}

/// Accepts both `[{label, score}]` and `[[{label, score}]]` bodies.
fn parse_label_scores(body: Value) -> Result<Vec<LabelScore>, ClassifierError> {
    let list = match body {
        Value::Array(items) if matches!(items.first(), Some(Value::Array(_))) => {
            items.into_iter().next().unwrap_or(Value::Array(Vec::new()))
        }
        other => other,
    };

    let scores: Vec<LabelScore> = serde_json::from_value(list)
        .map_err(|e| ClassifierError::UnexpectedOutput(e.to_string()))?;

    if scores.is_empty() {
        return Err(ClassifierError::UnexpectedOutput(
            "no labels returned".to_string(),
        ));
    }
    Ok(scores)
}

/// Score of `harmful_label`, or 0.0 when the model did not return it.
///
/// Warns when the label is missing from a multi-label answer.
fn harmful_score(scores: &[LabelScore], harmful_label: &str) -> f32 {
    match scores
        .iter()
        .find(|s| s.label.eq_ignore_ascii_case(harmful_label))
    {
        Some(score) => score.score,
        None => {
            if scores.len() > 1 {
                let labels: Vec<&str> = scores.iter().map(|s| s.label.as_str()).collect();
                warn!(
                    harmful_label,
                    returned = ?labels,
                    "Harmful label missing from moderation output, check ATHENA_HARMFUL_LABEL"
                );
            }
            0.0
        }
    }
}

impl Classifier for RemoteClassifier {
    fn name(&self) -> &'static str {
        "inference-api"
    }
}

#[async_trait]
impl ModerationClassifier for RemoteClassifier {
    async fn harmful_probability(&self, text: &str) -> Result<f32, ClassifierError> {
        let scores = self.classify(&self.models.moderation, text).await?;
        Ok(harmful_score(&scores, &self.models.harmful_label))
    }
}

#[async_trait]
impl SentimentClassifier for RemoteClassifier {
    async fn sentiment(&self, text: &str) -> Result<SentimentResult, ClassifierError> {
        let scores = self.classify(&self.models.sentiment, text).await?;
        let best = scores
            .iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
            .ok_or_else(|| ClassifierError::UnexpectedOutput("no labels returned".to_string()))?;

        let label = SentimentLabel::from_model_label(&best.label).ok_or_else(|| {
            ClassifierError::UnexpectedOutput(format!("unknown sentiment label {}", best.label))
        })?;
        Ok(SentimentResult::new(label, best.score))
    }
}

#[async_trait]
impl EmotionClassifier for RemoteClassifier {
    async fn emotions(&self, text: &str) -> Result<Vec<EmotionScore>, ClassifierError> {
        let scores = self.classify(&self.models.emotion, text).await?;
        Ok(scores
            .into_iter()
            .map(|s| EmotionScore::new(s.label.to_lowercase(), s.score))
            .collect())
    }
}
