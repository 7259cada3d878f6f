//! Service configuration read from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classifier::RemoteModels;
use crate::exemplars::DEFAULT_EXEMPLAR_COUNT;
use crate::generation::{GenerationParams, DEFAULT_LLM_MODEL};
use crate::inference::{DEFAULT_INFERENCE_URL, DEFAULT_TIMEOUT_SECS};
use crate::pipeline::PipelineConfig;

pub const DEFAULT_MODERATION_MODEL: &str = "facebook/roberta-hate-speech-dynabench-r4-target";
pub const DEFAULT_HARMFUL_LABEL: &str = "hate";
pub const DEFAULT_SENTIMENT_MODEL: &str = "cardiffnlp/twitter-roberta-base-sentiment-latest";
pub const DEFAULT_EMOTION_MODEL: &str = "bhadresh-savani/distilbert-base-uncased-emotion";

/// Errors reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Settings for the classifiers, generator and pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AthenaConfig {
    /// Inference API token. Never serialized.
    #[serde(skip_serializing)]
    pub hf_token: Option<String>,
    pub inference_url: String,
    pub moderation_model: String,
    pub harmful_label: String,
    pub sentiment_model: String,
    pub emotion_model: String,
    pub llm_model: String,
    pub timeout_secs: u64,
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub anonymize_pii: bool,
    pub prompt_seed: Option<u64>,
    pub exemplars_path: Option<PathBuf>,
    pub exemplar_count: usize,
}

impl Default for AthenaConfig {
    fn default() -> Self {
        let params = GenerationParams::default();
        Self {
            hf_token: None,
            inference_url: DEFAULT_INFERENCE_URL.to_string(),
            moderation_model: DEFAULT_MODERATION_MODEL.to_string(),
            harmful_label: DEFAULT_HARMFUL_LABEL.to_string(),
            sentiment_model: DEFAULT_SENTIMENT_MODEL.to_string(),
            emotion_model: DEFAULT_EMOTION_MODEL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_new_tokens: params.max_new_tokens,
            temperature: params.temperature,
            anonymize_pii: false,
            prompt_seed: None,
            exemplars_path: None,
            exemplar_count: DEFAULT_EXEMPLAR_COUNT,
        }
    }
}

impl AthenaConfig {
    /// Reads the process environment over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`. Unset or blank keys keep defaults.
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        config.hf_token = get("HF_TOKEN");
        if let Some(v) = get("ATHENA_INFERENCE_URL") {
            config.inference_url = v;
        }
        if let Some(v) = get("ATHENA_MODERATION_MODEL") {
            config.moderation_model = v;
        }
        if let Some(v) = get("ATHENA_HARMFUL_LABEL") {
            config.harmful_label = v;
        }
        if let Some(v) = get("ATHENA_SENTIMENT_MODEL") {
            config.sentiment_model = v;
        }
        if let Some(v) = get("ATHENA_EMOTION_MODEL") {
            config.emotion_model = v;
        }
        if let Some(v) = get("ATHENA_LLM_MODEL") {
            config.llm_model = v;
        }
        if let Some(v) = get("ATHENA_TIMEOUT_SECS") {
            config.timeout_secs = parse("ATHENA_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("ATHENA_MAX_NEW_TOKENS") {
            config.max_new_tokens = parse("ATHENA_MAX_NEW_TOKENS", &v)?;
        }
        if let Some(v) = get("ATHENA_TEMPERATURE") {
            config.temperature = parse("ATHENA_TEMPERATURE", &v)?;
        }
        if let Some(v) = get("ATHENA_ANONYMIZE") {
            config.anonymize_pii = parse_bool("ATHENA_ANONYMIZE", &v)?;
        }
        if let Some(v) = get("ATHENA_PROMPT_SEED") {
            config.prompt_seed = Some(parse("ATHENA_PROMPT_SEED", &v)?);
        }
        if let Some(v) = get("ATHENA_EXEMPLARS") {
            config.exemplars_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("ATHENA_EXEMPLAR_COUNT") {
            config.exemplar_count = parse("ATHENA_EXEMPLAR_COUNT", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(invalid("ATHENA_TIMEOUT_SECS", "0", "must be positive"));
        }
        if self.max_new_tokens == 0 {
            return Err(invalid("ATHENA_MAX_NEW_TOKENS", "0", "must be positive"));
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(invalid(
                "ATHENA_TEMPERATURE",
                &self.temperature.to_string(),
                "must be a non-negative number",
            ));
        }
        Ok(())
    }

    pub fn has_token(&self) -> bool {
        self.hf_token.is_some()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            max_new_tokens: self.max_new_tokens,
            temperature: self.temperature,
        }
    }

    pub fn remote_models(&self) -> RemoteModels {
        RemoteModels {
            moderation: self.moderation_model.clone(),
            harmful_label: self.harmful_label.clone(),
            sentiment: self.sentiment_model.clone(),
            emotion: self.emotion_model.clone(),
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            anonymize_pii: self.anonymize_pii,
            params: self.generation_params(),
            exemplar_count: self.exemplar_count,
        }
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| invalid(key, value, &e.to_string()))
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value, "expected true or false")),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = AthenaConfig::from_env_with(env(&[])).unwrap();
        assert_eq!(config, AthenaConfig::default());
        assert!(!config.has_token());
        assert_eq!(config.generation_params(), GenerationParams::default());
    }

    #[test]
    fn reads_overrides() {
        let config = AthenaConfig::from_env_with(env(&[
            ("HF_TOKEN", "hf_abc"),
            ("ATHENA_LLM_MODEL", "org/chat"),
            ("ATHENA_TIMEOUT_SECS", "10"),
            ("ATHENA_TEMPERATURE", "0.2"),
            ("ATHENA_ANONYMIZE", "yes"),
            ("ATHENA_PROMPT_SEED", "42"),
            ("ATHENA_EXEMPLARS", "/tmp/exemplars.json"),
        ]))
        .unwrap();

        assert_eq!(config.hf_token.as_deref(), Some("hf_abc"));
        assert_eq!(config.llm_model, "org/chat");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert!((config.temperature - 0.2).abs() < f32::EPSILON);
        assert!(config.anonymize_pii);
        assert_eq!(config.prompt_seed, Some(42));
        assert_eq!(
            config.exemplars_path,
            Some(PathBuf::from("/tmp/exemplars.json"))
        );
        assert!(config.pipeline_config().anonymize_pii);
    }

    #[test]
    fn blank_token_is_unset() {
        let config = AthenaConfig::from_env_with(env(&[("HF_TOKEN", "  ")])).unwrap();
        assert!(config.hf_token.is_none());
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = AthenaConfig::from_env_with(env(&[("ATHENA_MAX_NEW_TOKENS", "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains("ATHENA_MAX_NEW_TOKENS"));

        assert!(AthenaConfig::from_env_with(env(&[("ATHENA_TIMEOUT_SECS", "0")])).is_err());
        assert!(AthenaConfig::from_env_with(env(&[("ATHENA_TEMPERATURE", "-1")])).is_err());
        assert!(AthenaConfig::from_env_with(env(&[("ATHENA_ANONYMIZE", "maybe")])).is_err());
    }

    #[test]
    fn token_is_not_serialized() {
        let config = AthenaConfig {
            hf_token: Some("secret".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
