//! Text generation backends and reply extraction.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::inference::{InferenceApi, InferenceFailure};
use crate::prompt::INST_END;

/// Default generation model. Its chat format matches `[INST]` prompts.
pub const DEFAULT_LLM_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.2";

/// Errors from a generation backend.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation timed out")]
    Timeout,

    #[error("generation transport error: {0}")]
    Transport(String),

    #[error("generation API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("unexpected generation output: {0}")]
    Decode(String),

    #[error("generation backend not configured: {0}")]
    NotConfigured(String),
}

impl From<InferenceFailure> for GenerationError {
    fn from(e: InferenceFailure) -> Self {
        match e {
            InferenceFailure::MissingToken => {
                GenerationError::NotConfigured("HF_TOKEN is not set".to_string())
            }
            InferenceFailure::Timeout => GenerationError::Timeout,
            InferenceFailure::Transport(msg) => GenerationError::Transport(msg),
            InferenceFailure::Status { status, message } => GenerationError::Api { status, message },
            InferenceFailure::Decode(msg) => GenerationError::Decode(msg),
        }
    }
}

/// Sampling parameters for one generation call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_new_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 256,
            temperature: 0.7,
        }
    }
}

/// Text-in, text-out generation.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Returns the raw generated text for `prompt`.
    ///
    /// The text may echo the prompt; see [`extract_reply`].
    async fn generate(&self, prompt: &str, params: &GenerationParams)
        -> Result<String, GenerationError>;

    fn name(&self) -> &str;
}

/// Generation through the Hugging Face Inference API.
pub struct HuggingFaceGenerator {
    api: Arc<InferenceApi>,
    model: String,
}

impl HuggingFaceGenerator {
    pub fn new(api: Arc<InferenceApi>, model: impl Into<String>) -> Self {
        Self {
            api,
            model: model.into(),
        }
    }
}

#[async_trait]
impl GenerationBackend for HuggingFaceGenerator {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        let payload = json!({
            "inputs": prompt,
            "parameters": {
                "max_new_tokens": params.max_new_tokens,
                "temperature": params.temperature,
                "return_full_text": true,
            },
            "options": { "wait_for_model": true },
        });

        let body = self.api.post(&self.model, &payload).await?;
        parse_generated_text(&body)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Reads `generated_text` from `[{..}]` or `{..}` bodies.
fn parse_generated_text(body: &Value) -> Result<String, GenerationError> {
    let item = match body {
        Value::Array(items) => items.first(),
        other => Some(other),
    };

    item.and_then(|v| v.get("generated_text"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| GenerationError::Decode("missing generated_text".to_string()))
}

/// Extracts the assistant reply from raw backend output.
///
/// Strips an echoed prompt, otherwise keeps the text after the last
/// `[/INST]`. Anything from a fabricated next `User:` turn onward is cut.
/// The result is trimmed and may be empty.
pub fn extract_reply(raw: &str, prompt: &str) -> String {
    let reply = if let Some(rest) = raw.strip_prefix(prompt) {
        rest
    } else if let Some(idx) = raw.rfind(INST_END) {
        &raw[idx + INST_END.len()..]
    } else {
        raw
    };

    let reply = match reply.find("\nUser:") {
        Some(idx) => &reply[..idx],
        None => reply,
    };

    let reply = reply.trim();
    reply.strip_prefix("Assistant:").unwrap_or(reply).trim().to_string()
}
