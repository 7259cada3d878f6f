//! Athena Core - triage pipeline for supportive chat.
//!
//! Each chat turn is sanitized, moderated, checked for crisis language and
//! assessed for sentiment before a reply is generated. Generated replies are
//! moderated again, and support resources are attached when urgency was
//! detected.

pub mod anonymize;
pub mod classifier;
pub mod config;
pub mod crisis;
pub mod exemplars;
pub mod generation;
pub mod inference;
pub mod message;
pub mod pipeline;
pub mod prompt;
pub mod resources;
pub mod sanitize;

pub use anonymize::anonymize_text;
pub use classifier::{
    Assessment, ClassifierError, Classifiers, CombinedSentiment, EmotionScore, ModerationResult,
    SentimentLabel, SentimentResult,
};
pub use config::{AthenaConfig, ConfigError};
pub use crisis::{CrisisDetector, UrgencyLevel};
pub use exemplars::{Exemplar, ExemplarError, ExemplarStore};
pub use generation::{
    extract_reply, GenerationBackend, GenerationError, GenerationParams, HuggingFaceGenerator,
};
pub use inference::{InferenceApi, InferenceFailure};
pub use message::{ChatMessage, ChatRequest, Role};
pub use pipeline::{
    PipelineConfig, PipelineError, PipelineReply, ReplyOutcome, ResponsePipeline,
    EMPTY_REPLY_FALLBACK, INPUT_REFUSAL, OUTPUT_REFUSAL,
};
pub use prompt::{PromptBuilder, PromptContext};
pub use resources::ResourceSet;
pub use sanitize::{normalize_quotes, sanitize_input};
