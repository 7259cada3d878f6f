//! Athena - supportive chat service.
//!
//! Runs the HTTP API over the triage pipeline.

use std::path::PathBuf;

use anyhow::Context;
use athena_app::build_pipeline;
use athena_core::AthenaConfig;
use athena_server::{Server, ServerConfig, DEFAULT_HOST, DEFAULT_PORT};
use clap::Parser;
use directories::ProjectDirs;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Athena - supportive chat with crisis triage
#[derive(Parser, Debug)]
#[command(name = "athena", version, about)]
struct Args {
    /// Host to bind the API server to
    #[arg(long, env = "ATHENA_HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// Port to bind the API server to
    #[arg(long, env = "ATHENA_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Use local classifiers even when HF_TOKEN is set
    #[arg(long)]
    offline: bool,

    /// Mask emails, phone numbers and card numbers before processing
    #[arg(long)]
    anonymize: bool,

    /// Seed for prompt phrasing (reproducible prompts)
    #[arg(long)]
    seed: Option<u64>,

    /// JSON file of example exchanges to include in prompts
    #[arg(long)]
    exemplars: Option<PathBuf>,
}

impl Args {
    /// Applies command-line overrides on top of the environment config.
    fn apply(&self, config: &mut AthenaConfig) {
        if self.anonymize {
            config.anonymize_pii = true;
        }
        if let Some(seed) = self.seed {
            config.prompt_seed = Some(seed);
        }
        if let Some(path) = &self.exemplars {
            config.exemplars_path = Some(path.clone());
        }
    }
}

/// Get the logs directory path.
fn logs_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "athena", "Athena").map(|dirs| dirs.data_dir().join("logs"))
}

/// Initialize logging with file rotation.
fn init_logging(args: &Args) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_level = if args.debug { "debug" } else { &args.log_level };

    // Targets are matched by prefix, so this covers every athena_* crate
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("athena={},warn", log_level)));

    if let Some(log_dir) = logs_dir() {
        if std::fs::create_dir_all(&log_dir).is_ok() {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(5)
                .filename_prefix("athena")
                .filename_suffix("log")
                .build(&log_dir)
                .ok();

            if let Some(appender) = file_appender {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().with_writer(std::io::stdout))
                    .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                    .init();

                tracing::info!("Logging to {:?}", log_dir);
                return Some(guard);
            }
        }
    }

    // Fallback: console logging only
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::warn!("File logging unavailable, using console only");
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is normal
    let dotenv = dotenvy::dotenv();

    let args = Args::parse();
    let _guard = init_logging(&args);

    if let Ok(path) = dotenv {
        tracing::debug!("Loaded environment from {:?}", path);
    }

    let mut config = AthenaConfig::from_env().context("invalid configuration")?;
    args.apply(&mut config);

    let pipeline = build_pipeline(&config, args.offline).context("failed to start pipeline")?;

    let server_config = ServerConfig::default()
        .with_host(args.host.clone())
        .with_port(args.port);
    let server = Server::new(server_config, pipeline).context("failed to create API server")?;

    tracing::info!("Athena listening on http://{}", server.addr());
    server.run().await.context("API server stopped")?;

    Ok(())
}
