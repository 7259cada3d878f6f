//! Application state for the API server.

use std::sync::Arc;

use athena_core::ResponsePipeline;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Triage pipeline shared by all requests.
    pub pipeline: Arc<ResponsePipeline>,
}

impl AppState {
    /// Creates application state around a pipeline.
    pub fn new(pipeline: ResponsePipeline) -> Self {
        Self::with_shared(Arc::new(pipeline))
    }

    /// Creates application state from an already shared pipeline.
    pub fn with_shared(pipeline: Arc<ResponsePipeline>) -> Self {
        Self { pipeline }
    }
}
