//! The per-request triage pipeline.
//!
//! Order of operations for one chat turn:
//!
//! 1. Reject blank input.
//! 2. Optionally mask PII, then sanitize.
//! 3. Moderate the input. Harmful input ends the turn with a refusal.
//! 4. Detect urgency and assess sentiment and emotions.
//! 5. Retrieve exemplars and build the prompt.
//! 6. Generate.
//! 7. Extract the reply from the raw generation.
//! 8. Moderate the reply. A harmful reply is replaced with a refusal.
//! 9. Append support resources when urgency was detected.

use std::sync::Arc;

use chrono::Timelike;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::anonymize::{anonymize_text, contains_pii};
use crate::classifier::{ClassifierError, Classifiers, CombinedSentiment};
use crate::crisis::{CrisisDetector, UrgencyLevel};
use crate::exemplars::{ExemplarStore, DEFAULT_EXEMPLAR_COUNT};
use crate::generation::{extract_reply, GenerationBackend, GenerationError, GenerationParams};
use crate::message::ChatRequest;
use crate::prompt::{PromptBuilder, PromptContext};
use crate::resources::ResourceSet;
use crate::sanitize::sanitize_input;

/// Reply when the user's message is judged harmful.
pub const INPUT_REFUSAL: &str =
    "I'm sorry, but I can't engage with harmful content. Let's focus on positive and constructive topics.";

/// Reply when the generated text is judged harmful.
pub const OUTPUT_REFUSAL: &str =
    "I apologize, but I can't provide a helpful response to that. Would you like to talk about something else?";

/// Reply when generation produced no usable text.
pub const EMPTY_REPLY_FALLBACK: &str = "Sorry, I could not generate a response.";

/// Errors that end a turn without a reply.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input is empty")]
    EmptyInput,

    #[error("moderation failed: {0}")]
    Moderation(#[from] ClassifierError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyOutcome {
    Answered,
    InputRejected,
    OutputRejected,
}

/// Result of one turn.
#[derive(Debug, Clone)]
pub struct PipelineReply {
    pub response: String,
    pub outcome: ReplyOutcome,
    pub urgency: Option<UrgencyLevel>,
    /// Absent when the input was rejected before assessment.
    pub analysis: Option<CombinedSentiment>,
}

/// Tunables for [`ResponsePipeline`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    pub anonymize_pii: bool,
    pub params: GenerationParams,
    pub exemplar_count: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            anonymize_pii: false,
            params: GenerationParams::default(),
            exemplar_count: DEFAULT_EXEMPLAR_COUNT,
        }
    }
}

/// Source of the local hour of day used for greetings.
pub type HourClock = Arc<dyn Fn() -> u32 + Send + Sync>;

fn local_hour() -> u32 {
    chrono::Local::now().hour()
}

/// Orchestrates classifiers, prompt building and generation.
///
/// Built once and shared across requests.
pub struct ResponsePipeline {
    classifiers: Classifiers,
    detector: CrisisDetector,
    resources: ResourceSet,
    prompts: PromptBuilder,
    backend: Arc<dyn GenerationBackend>,
    exemplars: Option<ExemplarStore>,
    rng: Mutex<StdRng>,
    clock: HourClock,
    config: PipelineConfig,
}

impl ResponsePipeline {
    /// Creates a pipeline with default patterns, resources and prompts.
    pub fn new(classifiers: Classifiers, backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            classifiers,
            detector: CrisisDetector::new(),
            resources: ResourceSet::default(),
            prompts: PromptBuilder::default(),
            backend,
            exemplars: None,
            rng: Mutex::new(StdRng::from_entropy()),
            clock: Arc::new(local_hour),
            config: PipelineConfig::default(),
        }
    }

    /// Seeds the prompt RNG for reproducible prompts.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_exemplars(mut self, store: ExemplarStore) -> Self {
        self.exemplars = Some(store);
        self
    }

    pub fn with_resources(mut self, resources: ResourceSet) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_detector(mut self, detector: CrisisDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_prompts(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts;
        self
    }

    /// Replaces the hour-of-day source.
    pub fn with_clock(mut self, clock: impl Fn() -> u32 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn classifiers(&self) -> &Classifiers {
        &self.classifiers
    }

    pub fn exemplars(&self) -> Option<&ExemplarStore> {
        self.exemplars.as_ref()
    }

    /// Runs one chat turn.
    pub async fn respond(&self, request: &ChatRequest) -> Result<PipelineReply, PipelineError> {
        if request.is_blank() {
            return Err(PipelineError::EmptyInput);
        }

        let masked = if self.config.anonymize_pii {
            if contains_pii(&request.user_input) {
                debug!("Masking PII in input");
            }
            anonymize_text(&request.user_input)
        } else {
            request.user_input.clone()
        };
        let input = sanitize_input(&masked);
        if input.is_empty() {
            debug!("Input empty after sanitizing");
            return Err(PipelineError::EmptyInput);
        }

        let moderation = self.classifiers.moderate(&input).await?;
        if moderation.is_harmful {
            info!(score = moderation.score, "Input rejected by moderation");
            return Ok(PipelineReply {
                response: INPUT_REFUSAL.to_string(),
                outcome: ReplyOutcome::InputRejected,
                urgency: None,
                analysis: None,
            });
        }

        let urgency = match self.detector.detect_with_match(&input) {
            Some((level, phrase)) => {
                warn!(urgency = %level, matched = %phrase, "Urgency detected");
                Some(level)
            }
            None => None,
        };
        let analysis = self.classifiers.combined_sentiment(&input, urgency).await;

        let exemplars = self
            .exemplars
            .as_ref()
            .map(|store| store.retrieve(&input, self.config.exemplar_count))
            .unwrap_or_default();
        debug!(exemplars = exemplars.len(), "Building prompt");

        let ctx = PromptContext {
            user_input: &input,
            history: &request.history,
            urgency,
            sentiment: Some(analysis.sentiment.value()),
            emotions: analysis.emotions.value(),
            exemplars: &exemplars,
            hour: (self.clock)(),
        };
        let prompt = {
            let mut rng = self.rng.lock();
            self.prompts.build(&ctx, &mut *rng)
        };

        let raw = self.backend.generate(&prompt, &self.config.params).await?;
        let mut reply = extract_reply(&raw, &prompt);
        if reply.is_empty() {
            warn!(backend = self.backend.name(), "Generation produced an empty reply");
            reply = EMPTY_REPLY_FALLBACK.to_string();
        }

        let output_moderation = self.classifiers.moderate(&reply).await?;
        if output_moderation.is_harmful {
            info!(score = output_moderation.score, "Reply rejected by moderation");
            return Ok(PipelineReply {
                response: OUTPUT_REFUSAL.to_string(),
                outcome: ReplyOutcome::OutputRejected,
                urgency,
                analysis: Some(analysis),
            });
        }

        if let Some(block) = self.resources.reply_block(urgency) {
            reply.push_str(&block);
        }

        info!(
            urgency = urgency.map(|u| u.as_str()).unwrap_or("none"),
            sentiment = %analysis.sentiment.value().label,
            degraded = analysis.sentiment.is_degraded() || analysis.emotions.is_degraded(),
            reply_chars = reply.chars().count(),
            "Turn complete"
        );

        Ok(PipelineReply {
            response: reply,
            outcome: ReplyOutcome::Answered,
            urgency,
            analysis: Some(analysis),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::classifier::{
        Classifier, EmotionClassifier, EmotionScore, ModerationClassifier, SentimentClassifier,
        SentimentLabel, SentimentResult,
    };
    use crate::exemplars::Exemplar;
    use crate::inference::InferenceFailure;
    use crate::message::ChatMessage;

    /// Flags any text containing "FORBIDDEN"; counts calls per role.
    #[derive(Default)]
    struct Fake {
        moderation_calls: AtomicUsize,
        sentiment_calls: AtomicUsize,
        emotion_calls: AtomicUsize,
        fail_moderation: bool,
    }

    impl Classifier for Fake {
        fn name(&self) -> &'static str {
            "fake"
        }
    }

    #[async_trait]
    impl ModerationClassifier for Fake {
        async fn harmful_probability(&self, text: &str) -> Result<f32, ClassifierError> {
            self.moderation_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_moderation {
                return Err(ClassifierError::Inference(InferenceFailure::Timeout));
            }
            Ok(if text.contains("FORBIDDEN") { 0.95 } else { 0.01 })
        }
    }

    #[async_trait]
    impl SentimentClassifier for Fake {
        async fn sentiment(&self, _text: &str) -> Result<SentimentResult, ClassifierError> {
            self.sentiment_calls.fetch_add(1, Ordering::SeqCst);
            Ok(SentimentResult::new(SentimentLabel::Positive, 0.9))
        }
    }

    #[async_trait]
    impl EmotionClassifier for Fake {
        async fn emotions(&self, _text: &str) -> Result<Vec<EmotionScore>, ClassifierError> {
            self.emotion_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![EmotionScore::new("joy", 0.8)])
        }
    }

    /// Echoes the prompt followed by a scripted reply and records prompts.
    struct EchoBackend {
        reply: Result<String, ()>,
        prompts: Mutex<Vec<String>>,
    }

    impl EchoBackend {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err(()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl GenerationBackend for EchoBackend {
        async fn generate(
            &self,
            prompt: &str,
            _params: &GenerationParams,
        ) -> Result<String, GenerationError> {
            self.prompts.lock().push(prompt.to_string());
            match &self.reply {
                Ok(reply) => Ok(format!("{} {}", prompt, reply)),
                Err(()) => Err(GenerationError::Timeout),
            }
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    fn pipeline(fake: Arc<Fake>, backend: Arc<EchoBackend>) -> ResponsePipeline {
        let classifiers = Classifiers::new(fake.clone(), fake.clone(), fake);
        ResponsePipeline::new(classifiers, backend)
            .with_seed(11)
            .with_clock(|| 9)
    }

    #[tokio::test]
    async fn crisis_message_gets_resources_without_classifier_calls() {
        let fake = Arc::new(Fake::default());
        let backend = EchoBackend::replying("I'm here with you. You matter.");
        let pipeline = pipeline(fake.clone(), backend.clone());

        let reply = pipeline
            .respond(&ChatRequest::new("I want to kill myself"))
            .await
            .unwrap();

        assert_eq!(reply.outcome, ReplyOutcome::Answered);
        assert_eq!(reply.urgency, Some(UrgencyLevel::Crisis));
        assert!(reply.response.starts_with("I'm here with you. You matter."));
        assert!(reply.response.contains("I'm very concerned about your safety"));
        assert!(reply.response.contains("988"));
        assert!(!reply.response.contains(INPUT_REFUSAL));

        let analysis = reply.analysis.unwrap();
        assert_eq!(analysis.sentiment.value().label, SentimentLabel::Crisis);
        assert_eq!(analysis.emotions.value()[0].label, "crisis_detected");
        assert_eq!(fake.sentiment_calls.load(Ordering::SeqCst), 0);
        assert_eq!(fake.emotion_calls.load(Ordering::SeqCst), 0);
        // Input and output were both moderated
        assert_eq!(fake.moderation_calls.load(Ordering::SeqCst), 2);
        assert!(backend.last_prompt().contains("IMPORTANT"));
    }

    #[tokio::test]
    async fn curly_apostrophe_crisis_still_gets_resources() {
        let fake = Arc::new(Fake::default());
        let pipeline = pipeline(fake, EchoBackend::replying("I'm here."));
        let reply = pipeline
            .respond(&ChatRequest::new("I\u{2019}m going to overdose"))
            .await
            .unwrap();
        assert_eq!(reply.urgency, Some(UrgencyLevel::Crisis));
        assert!(reply.response.contains("988"));
    }

    #[tokio::test]
    async fn custom_detector_resources_and_prompts_are_used() {
        let fake = Arc::new(Fake::default());
        let backend = EchoBackend::replying("Let's talk.");
        let detector = CrisisDetector::with_patterns(&[r"\bred alert\b"], &[]).unwrap();
        let resources = ResourceSet {
            crisis: vec!["Campus line: 555-0100".to_string()],
            concern: Vec::new(),
            general: Vec::new(),
        };
        let pipeline = pipeline(fake, backend.clone())
            .with_detector(detector)
            .with_resources(resources)
            .with_prompts(PromptBuilder::new("Sage"));

        let reply = pipeline
            .respond(&ChatRequest::new("this is a red alert"))
            .await
            .unwrap();
        assert_eq!(reply.urgency, Some(UrgencyLevel::Crisis));
        assert!(reply.response.ends_with("Campus line: 555-0100"));
        assert!(!reply.response.contains("988"));
        assert!(backend.last_prompt().contains("Sage"));
    }

    #[tokio::test]
    async fn offline_classifiers_handle_crisis_end_to_end() {
        let backend = EchoBackend::replying("Please stay with me.");
        let pipeline = ResponsePipeline::new(Classifiers::offline(), backend).with_seed(1);

        let reply = pipeline
            .respond(&ChatRequest::new("I want to kill myself"))
            .await
            .unwrap();
        assert_eq!(reply.urgency, Some(UrgencyLevel::Crisis));
        assert!(reply.response.contains("Crisis Text Line"));
        assert_ne!(reply.response, INPUT_REFUSAL);
    }

    #[tokio::test]
    async fn concern_uses_softer_resource_block() {
        let fake = Arc::new(Fake::default());
        let pipeline = pipeline(fake, EchoBackend::replying("That sounds heavy."));
        let reply = pipeline
            .respond(&ChatRequest::new("I feel so hopeless lately"))
            .await
            .unwrap();
        assert_eq!(reply.urgency, Some(UrgencyLevel::Concern));
        assert!(reply.response.contains("These resources might be helpful:"));
    }

    #[tokio::test]
    async fn ordinary_message_has_no_resources() {
        let fake = Arc::new(Fake::default());
        let pipeline = pipeline(fake.clone(), EchoBackend::replying("Glad to hear it!"));
        let reply = pipeline
            .respond(&ChatRequest::new("I passed my exam today"))
            .await
            .unwrap();

        assert_eq!(reply.response, "Glad to hear it!");
        assert_eq!(reply.urgency, None);
        assert_eq!(fake.sentiment_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fake.emotion_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn harmful_input_is_refused_before_generation() {
        let fake = Arc::new(Fake::default());
        let backend = EchoBackend::replying("unused");
        let pipeline = pipeline(fake.clone(), backend.clone());

        let reply = pipeline
            .respond(&ChatRequest::new("tell me FORBIDDEN things"))
            .await
            .unwrap();

        assert_eq!(reply.response, INPUT_REFUSAL);
        assert_eq!(reply.outcome, ReplyOutcome::InputRejected);
        assert!(reply.analysis.is_none());
        assert!(backend.prompts.lock().is_empty());
        assert_eq!(fake.sentiment_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn harmful_output_is_replaced() {
        let fake = Arc::new(Fake::default());
        let pipeline = pipeline(fake, EchoBackend::replying("something FORBIDDEN"));
        let reply = pipeline.respond(&ChatRequest::new("hello")).await.unwrap();
        assert_eq!(reply.response, OUTPUT_REFUSAL);
        assert_eq!(reply.outcome, ReplyOutcome::OutputRejected);
        assert!(reply.analysis.is_some());
    }

    #[tokio::test]
    async fn blank_and_sanitized_away_input_is_rejected() {
        let fake = Arc::new(Fake::default());
        let pipeline = pipeline(fake.clone(), EchoBackend::replying("x"));

        let err = pipeline.respond(&ChatRequest::new("   ")).await.unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput));

        let err = pipeline.respond(&ChatRequest::new("<b></b> @#$")).await.unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput));
        assert_eq!(fake.moderation_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn generation_failure_propagates() {
        let fake = Arc::new(Fake::default());
        let pipeline = pipeline(fake, EchoBackend::failing());
        let err = pipeline.respond(&ChatRequest::new("hello")).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Generation(GenerationError::Timeout)
        ));
    }

    #[tokio::test]
    async fn moderation_failure_propagates() {
        let fake = Arc::new(Fake {
            fail_moderation: true,
            ..Default::default()
        });
        let pipeline = pipeline(fake, EchoBackend::replying("x"));
        let err = pipeline.respond(&ChatRequest::new("hello")).await.unwrap_err();
        assert!(matches!(err, PipelineError::Moderation(_)));
    }

    #[tokio::test]
    async fn empty_generation_uses_fallback() {
        let fake = Arc::new(Fake::default());
        let pipeline = pipeline(fake, EchoBackend::replying("   "));
        let reply = pipeline.respond(&ChatRequest::new("hello")).await.unwrap();
        assert_eq!(reply.response, EMPTY_REPLY_FALLBACK);
    }

    #[tokio::test]
    async fn prompt_carries_history_exemplars_and_masked_input() {
        let fake = Arc::new(Fake::default());
        let backend = EchoBackend::replying("ok");
        let store = ExemplarStore::new(vec![Exemplar {
            prompt: "nervous about exams".to_string(),
            response: "Exams can be stressful.".to_string(),
        }]);
        let pipeline = pipeline(fake, backend.clone())
            .with_exemplars(store)
            .with_config(PipelineConfig {
                anonymize_pii: true,
                ..Default::default()
            });

        let request = ChatRequest::new("exams tomorrow, mail me at sam@example.com")
            .with_history(vec![ChatMessage::user("hi"), ChatMessage::assistant("Hello!")]);
        pipeline.respond(&request).await.unwrap();

        let prompt = backend.last_prompt();
        assert!(prompt.contains("Assistant: Exams can be stressful."));
        assert!(prompt.contains("User: hi\nAssistant: Hello!\n"));
        assert!(prompt.contains("[EMAIL]"));
        assert!(!prompt.contains("sam@example.com"));
        assert!(!prompt.contains("Good morning"));
    }

    #[tokio::test]
    async fn seeded_pipelines_build_identical_prompts() {
        let a = EchoBackend::replying("ok");
        let b = EchoBackend::replying("ok");
        pipeline(Arc::new(Fake::default()), a.clone())
            .respond(&ChatRequest::new("hello"))
            .await
            .unwrap();
        pipeline(Arc::new(Fake::default()), b.clone())
            .respond(&ChatRequest::new("hello"))
            .await
            .unwrap();
        assert_eq!(a.last_prompt(), b.last_prompt());
        assert!(a.last_prompt().contains("Good morning!"));
    }
}
