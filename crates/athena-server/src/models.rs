//! API request and response models.

use athena_core::{
    Assessment, EmotionScore, PipelineReply, ReplyOutcome, SentimentLabel, SentimentResult,
    UrgencyLevel,
};
use serde::Serialize;

/// Request body for POST /chat.
pub use athena_core::ChatRequest;

/// Response body for GET /.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

/// Sentiment part of a chat response.
#[derive(Debug, Serialize)]
pub struct SentimentAnalysisBody {
    pub label: SentimentLabel,
    pub confidence: f32,
}

impl From<&Assessment<SentimentResult>> for SentimentAnalysisBody {
    fn from(a: &Assessment<SentimentResult>) -> Self {
        let value = a.value();
        Self {
            label: value.label,
            confidence: value.confidence,
        }
    }
}

/// Emotion part of a chat response.
///
/// Fallback values are reported like measured ones; degradation is only
/// visible in the logs.
#[derive(Debug, Serialize)]
pub struct EmotionAnalysisBody {
    pub emotions: Vec<EmotionScore>,
}

impl From<&Assessment<Vec<EmotionScore>>> for EmotionAnalysisBody {
    fn from(a: &Assessment<Vec<EmotionScore>>) -> Self {
        Self {
            emotions: a.value().clone(),
        }
    }
}

/// Response body for POST /chat.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub outcome: ReplyOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment_analysis: Option<SentimentAnalysisBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion_analysis: Option<EmotionAnalysisBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency: Option<UrgencyLevel>,
}

impl From<PipelineReply> for ChatResponse {
    fn from(reply: PipelineReply) -> Self {
        let (sentiment_analysis, emotion_analysis) = match &reply.analysis {
            Some(analysis) => (
                Some(SentimentAnalysisBody::from(&analysis.sentiment)),
                Some(EmotionAnalysisBody::from(&analysis.emotions)),
            ),
            None => (None, None),
        };

        Self {
            response: reply.response,
            outcome: reply.outcome,
            sentiment_analysis,
            emotion_analysis,
            urgency: reply.urgency,
        }
    }
}
