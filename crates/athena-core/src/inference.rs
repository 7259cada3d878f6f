//! Minimal client for the Hugging Face Inference API.
//!
//! Shared by the remote classifiers and the generation backend. Every call
//! is a JSON POST to `{base_url}/{model}` with a bearer token and a bounded
//! timeout.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Default Inference API base URL.
pub const DEFAULT_INFERENCE_URL: &str = "https://api-inference.huggingface.co/models";

/// Default timeout for outbound calls.
pub const DEFAULT_TIMEOUT_SECS: u64 = 45;

/// Errors from the Inference API.
#[derive(Debug, Error)]
pub enum InferenceFailure {
    /// No API token was configured.
    #[error("HF_TOKEN is not configured")]
    MissingToken,

    /// The request timed out.
    #[error("request timed out")]
    Timeout,

    /// The request could not be sent or the body could not be read.
    #[error("transport error: {0}")]
    Transport(String),

    /// The API answered with a non-success status.
    #[error("API error {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body was not the JSON we expected.
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for InferenceFailure {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            InferenceFailure::Timeout
        } else if e.is_decode() {
            InferenceFailure::Decode(e.to_string())
        } else {
            InferenceFailure::Transport(e.to_string())
        }
    }
}

/// Inference API client.
#[derive(Debug, Clone)]
pub struct InferenceApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl InferenceApi {
    /// Creates a client with the given base URL, token and timeout.
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, InferenceFailure> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceFailure::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Returns true if an API token is configured.
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Returns the endpoint URL for `model`.
    pub fn model_url(&self, model: &str) -> String {
        format!("{}/{}", self.base_url, model)
    }

    /// POSTs `payload` to `model` and returns the decoded JSON body.
    pub async fn post<P: Serialize + ?Sized>(
        &self,
        model: &str,
        payload: &P,
    ) -> Result<Value, InferenceFailure> {
        let token = self.token.as_ref().ok_or(InferenceFailure::MissingToken)?;
        let url = self.model_url(model);
        debug!(%url, "Calling inference API");

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(InferenceFailure::Status {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        serde_json::from_str(&body).map_err(|e| InferenceFailure::Decode(e.to_string()))
    }
}

/// Extracts the `error` field of an API error body, or the raw body.
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("unknown").to_string()
            } else {
                body.trim().to_string()
            }
        })
}
