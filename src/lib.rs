//! # trueno-promptlab: Prompt Experiment Engine
//!
//! **Version**: 0.1.0
//!
//! trueno-promptlab runs repeatable experiments that evaluate a versioned
//! prompt template against a versioned dataset, using pluggable inference and
//! embedding models and pluggable evaluators, and hands one identity-tagged
//! result batch per run to a recorder.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Jidoka**: A run stops at the first failing record; partial batches are never recorded
//! - **Poka-Yoke safety**: Configs are validated before any inference starts
//! - **Heijunka**: Concurrent runs are levelled by a `max_concurrent_tasks` semaphore
//! - **Genchi Genbutsu**: Latency is measured by the adapter around the real call
//!
//! ## Pipeline
//!
//! ```text
//! ExperimentConfig → {template, dataset} → per record [substitute → infer → evaluate]
//!                  → ResultBatch (dataset order, one experiment_id) → ResultRecorder
//! ```
//!
//! ## Modules
//!
//! - [`template`]: placeholder discovery and substitution
//! - [`dataset`]: records and JSONL loading
//! - [`model`]: inference/embedding contracts and the blocking-backend adapter
//! - [`evaluation`]: metric resolution, column mapping, built-in evaluators
//! - [`config`]: experiment and engine configuration
//! - [`asset`]: prompt template and dataset retrieval
//! - [`experiment`]: the sequential and concurrent execution strategies
//! - [`recorder`]: result persistence

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod asset;
pub mod config;
pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod experiment;
pub mod model;
pub mod recorder;
pub mod telemetry;
pub mod template;

pub use config::{AssetRef, EngineConfig, ExperimentConfig};
pub use error::{Error, Result};
pub use experiment::{Experiment, ExperimentResultRow, ResultBatch};
