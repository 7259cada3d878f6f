//! Athena Server - HTTP API server.
//!
//! This crate exposes the triage pipeline over HTTP.
//!
//! ## Endpoints
//!
//! - `GET /` - Liveness check
//! - `POST /chat` - Run one chat turn and return the reply with its analysis
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use athena_core::{Classifiers, HuggingFaceGenerator, InferenceApi, ResponsePipeline};
//! use athena_server::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let api = Arc::new(
//!         InferenceApi::new("https://api-inference.huggingface.co/models", None,
//!             std::time::Duration::from_secs(45)).unwrap(),
//!     );
//!     let backend = Arc::new(HuggingFaceGenerator::new(api, "mistralai/Mistral-7B-Instruct-v0.2"));
//!     let pipeline = ResponsePipeline::new(Classifiers::offline(), backend);
//!     let server = Server::new(ServerConfig::default(), pipeline).unwrap();
//!     server.run().await.unwrap();
//! }
//! ```

pub mod error;
mod handlers;
pub mod models;
pub mod state;

use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use athena_core::ResponsePipeline;

pub use error::{ApiError, Result};
pub use state::AppState;

/// Default server port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default server host (localhost only).
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to (default: 127.0.0.1).
    pub host: String,
    /// Port to bind to (default: 8000).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Sets the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// Server error types.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("failed to bind to {0}: {1}")]
    BindError(SocketAddr, std::io::Error),

    /// Server runtime error.
    #[error("server error: {0}")]
    Runtime(String),
}

/// Builds the API router over `state`.
pub fn build_router(state: AppState) -> Router {
    // Browser front-ends are served from other origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::root))
        .route("/chat", post(handlers::chat))
        .layer(cors)
        .with_state(state)
}

/// The HTTP API server.
pub struct Server {
    router: Router,
    addr: SocketAddr,
}

impl Server {
    /// Creates a new server around `pipeline`.
    pub fn new(
        config: ServerConfig,
        pipeline: ResponsePipeline,
    ) -> std::result::Result<Self, ServerError> {
        Self::with_state(config, AppState::new(pipeline))
    }

    /// Creates a server with custom application state.
    pub fn with_state(
        config: ServerConfig,
        state: AppState,
    ) -> std::result::Result<Self, ServerError> {
        let router = build_router(state);

        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| ServerError::Runtime(format!("invalid address: {}", e)))?;

        Ok(Self { router, addr })
    }

    /// Returns the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Runs the server until shutdown.
    pub async fn run(self) -> std::result::Result<(), ServerError> {
        info!("Starting Athena API server on {}", self.addr);

        let socket = Socket::new(
            Domain::for_address(self.addr),
            Type::STREAM,
            Some(Protocol::TCP),
        )
        .map_err(|e| ServerError::BindError(self.addr, e))?;

        // Allow quick restarts while old sockets sit in TIME_WAIT
        socket
            .set_reuse_address(true)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        socket
            .bind(&self.addr.into())
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .listen(128)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        // Set non-blocking for tokio
        socket
            .set_nonblocking(true)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        let std_listener: std::net::TcpListener = socket.into();
        let listener = tokio::net::TcpListener::from_std(std_listener)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        axum::serve(listener, self.router)
            .await
            .map_err(|e| ServerError::Runtime(e.to_string()))?;

        Ok(())
    }

    /// Returns the router for testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use athena_core::{
        Classifiers, GenerationBackend, GenerationError, GenerationParams, INPUT_REFUSAL,
    };
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    struct CannedBackend {
        reply: Option<&'static str>,
    }

    #[async_trait]
    impl GenerationBackend for CannedBackend {
        async fn generate(
            &self,
            _prompt: &str,
            _params: &GenerationParams,
        ) -> std::result::Result<String, GenerationError> {
            match self.reply {
                Some(reply) => Ok(format!("[/INST] {}", reply)),
                None => Err(GenerationError::Api {
                    status: 503,
                    message: "Model mistralai/x is currently loading".to_string(),
                }),
            }
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    fn create_test_app(reply: Option<&'static str>) -> Router {
        let pipeline = ResponsePipeline::new(
            Classifiers::offline(),
            Arc::new(CannedBackend { reply }),
        )
        .with_seed(3);
        build_router(AppState::new(pipeline))
    }

    async fn post_chat(app: Router, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_root_status() {
        let app = create_test_app(Some("hi"));

        let request = Request::builder()
            .method("GET")
            .uri("/")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, json!({"status": "Athena AI API is running"}));
    }

    #[tokio::test]
    async fn test_chat_ordinary_message() {
        let app = create_test_app(Some("That's wonderful news!"));
        let (status, json) = post_chat(
            app,
            json!({"user_input": "I am so happy today", "history": []}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["response"], "That's wonderful news!");
        assert_eq!(json["outcome"], "answered");
        assert_eq!(json["sentiment_analysis"]["label"], "positive");
        assert!(json["emotion_analysis"]["emotions"].is_array());
        assert!(json.get("urgency").is_none());
    }

    #[tokio::test]
    async fn test_chat_crisis_message() {
        let app = create_test_app(Some("I'm really glad you told me."));
        let (status, json) = post_chat(app, json!({"user_input": "I want to kill myself"})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["urgency"], "crisis");
        assert_eq!(json["sentiment_analysis"]["label"], "crisis");
        assert_eq!(json["sentiment_analysis"]["confidence"], 1.0);
        assert_eq!(
            json["emotion_analysis"]["emotions"][0]["label"],
            "crisis_detected"
        );
        let response = json["response"].as_str().unwrap();
        assert!(response.contains("I'm very concerned about your safety"));
    }

    #[tokio::test]
    async fn test_chat_harmful_input_omits_analysis() {
        let app = create_test_app(Some("unused"));
        let (status, json) = post_chat(app, json!({"user_input": "how to kill someone"})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["response"], INPUT_REFUSAL);
        assert_eq!(json["outcome"], "input_rejected");
        assert!(json.get("sentiment_analysis").is_none());
        assert!(json.get("emotion_analysis").is_none());
    }

    #[tokio::test]
    async fn test_chat_empty_input_is_bad_request() {
        let app = create_test_app(Some("unused"));
        let (status, json) = post_chat(app, json!({"user_input": "   "})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "bad_request");
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let app = create_test_app(Some("unused"));
        let request = Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from("{\"user_input\": "))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "bad_request");
    }

    #[tokio::test]
    async fn test_missing_user_input_is_bad_request() {
        let app = create_test_app(Some("unused"));
        let (status, json) = post_chat(app, json!({"history": []})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "bad_request");
        assert!(json["error"].as_str().unwrap().contains("user_input"));
    }

    #[tokio::test]
    async fn test_generation_failure_hides_details() {
        let app = create_test_app(None);
        let (status, json) = post_chat(app, json!({"user_input": "hello there"})).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["code"], "service_unavailable");
        let error = json["error"].as_str().unwrap();
        assert!(!error.contains("mistralai"));
        assert!(!error.contains("503"));
    }

    #[tokio::test]
    async fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[tokio::test]
    async fn test_server_config_with_port() {
        let config = ServerConfig::default().with_host("0.0.0.0").with_port(9000);
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn test_invalid_host_is_rejected() {
        let pipeline = ResponsePipeline::new(
            Classifiers::offline(),
            Arc::new(CannedBackend { reply: Some("x") }),
        );
        let result = Server::new(ServerConfig::default().with_host("not a host"), pipeline);
        assert!(matches!(result, Err(ServerError::Runtime(_))));
    }
}
