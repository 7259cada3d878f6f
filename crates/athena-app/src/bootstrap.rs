//! Start-up wiring.
//!
//! Turns an [`AthenaConfig`] into a ready [`ResponsePipeline`]:
//! - Remote classifiers when an API token is present, local ones otherwise
//! - Inference API generation backend
//! - Optional exemplar store and prompt seed
//!
//! # Usage
//!
//! ```ignore
//! use athena_app::bootstrap::build_pipeline;
//! use athena_core::AthenaConfig;
//!
//! let config = AthenaConfig::from_env().expect("Invalid configuration");
//! let pipeline = build_pipeline(&config, false).expect("Failed to build pipeline");
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use athena_core::classifier::RemoteClassifier;
use athena_core::{
    AthenaConfig, Classifiers, ExemplarError, ExemplarStore, HuggingFaceGenerator, InferenceApi,
    InferenceFailure, ResponsePipeline,
};
use thiserror::Error;
use tracing::{info, warn};

/// Errors that can occur while wiring the pipeline.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The HTTP client could not be created.
    #[error("failed to create inference client: {0}")]
    Client(#[from] InferenceFailure),

    /// The exemplar file could not be loaded.
    #[error("failed to load exemplars from {path:?}: {source}")]
    Exemplars {
        path: PathBuf,
        #[source]
        source: ExemplarError,
    },
}

/// Which classifiers the pipeline runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierMode {
    /// Hosted models over the Inference API.
    Remote,
    /// Local keyword moderation and lexicon sentiment.
    Offline,
}

impl ClassifierMode {
    /// Picks remote classifiers only when a token is set and offline mode
    /// was not requested.
    pub fn select(config: &AthenaConfig, force_offline: bool) -> Self {
        if force_offline || !config.has_token() {
            ClassifierMode::Offline
        } else {
            ClassifierMode::Remote
        }
    }
}

/// Builds the pipeline described by `config`.
pub fn build_pipeline(
    config: &AthenaConfig,
    force_offline: bool,
) -> Result<ResponsePipeline, BootstrapError> {
    let api = Arc::new(InferenceApi::new(
        config.inference_url.clone(),
        config.hf_token.clone(),
        config.timeout(),
    )?);

    let mode = ClassifierMode::select(config, force_offline);
    let classifiers = match mode {
        ClassifierMode::Remote => {
            let remote = Arc::new(RemoteClassifier::new(api.clone(), config.remote_models()));
            Classifiers::new(remote.clone(), remote.clone(), remote)
        }
        ClassifierMode::Offline => {
            if !force_offline {
                warn!("HF_TOKEN not set, using local classifiers");
            }
            Classifiers::offline()
        }
    };

    if !api.has_token() {
        warn!("HF_TOKEN not set, chat requests will return 503 until it is configured");
    }
    let backend = Arc::new(HuggingFaceGenerator::new(api, config.llm_model.clone()));

    let mut pipeline =
        ResponsePipeline::new(classifiers, backend).with_config(config.pipeline_config());

    if let Some(seed) = config.prompt_seed {
        pipeline = pipeline.with_seed(seed);
    }

    if let Some(path) = &config.exemplars_path {
        let store = ExemplarStore::load(path).map_err(|source| BootstrapError::Exemplars {
            path: path.clone(),
            source,
        })?;
        info!("Loaded {} exemplars from {:?}", store.len(), path);
        pipeline = pipeline.with_exemplars(store);
    }

    let (moderation, sentiment, emotion) = pipeline.classifiers().names();
    info!(
        moderation,
        sentiment,
        emotion,
        llm = %config.llm_model,
        anonymize = config.anonymize_pii,
        "Pipeline ready"
    );

    Ok(pipeline)
}
