//! Athena - supportive chat service.
//!
//! This crate wires configuration, classifiers and the generation backend
//! into a pipeline for the `athena` binary.
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

pub mod bootstrap;

pub use bootstrap::{build_pipeline, BootstrapError, ClassifierMode};
