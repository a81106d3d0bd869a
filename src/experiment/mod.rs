//! Experiment execution engine
//!
//! An [`Experiment`] binds an asset store, a result recorder, an evaluator
//! registry and an [`EngineConfig`]. Each call to [`Experiment::run`] or
//! [`Experiment::run_async`] is one experiment run:
//!
//! ```text
//! ExperimentConfig ──validate──> fetch template + dataset ──> ExperimentPlan
//!                                                                  │
//!                         run_sequential / run_concurrent  <───────┘
//!                                      │
//!                                 ResultBatch ──record──> ResultRecorder
//! ```
//!
//! A run either records one complete batch, in dataset order, or fails and
//! records nothing.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use serde_json::json;
//! use trueno_promptlab::asset::MemoryAssetStore;
//! use trueno_promptlab::config::{AssetRef, ExperimentConfig};
//! use trueno_promptlab::dataset::DatasetRecord;
//! use trueno_promptlab::evaluation::EvaluationSpec;
//! use trueno_promptlab::experiment::Experiment;
//! use trueno_promptlab::model::{EmbeddingModel, InferenceModel, InferenceResult};
//! use trueno_promptlab::recorder::MemoryRecorder;
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl InferenceModel for Echo {
//!     fn invoke(&self, _system: &str, user: &str) -> anyhow::Result<InferenceResult> {
//!         Ok(InferenceResult::new(user, 1, 1, 0.1))
//!     }
//!     async fn ainvoke(&self, system: &str, user: &str) -> anyhow::Result<InferenceResult> {
//!         self.invoke(system, user)
//!     }
//! }
//!
//! impl EmbeddingModel for Echo {
//!     fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
//!         Ok(vec![text.len() as f32])
//!     }
//! }
//!
//! let store = Arc::new(MemoryAssetStore::new());
//! store.register_prompt_template("echo", 1, "", "<question>");
//! store.register_dataset_records("qs", 1, vec![DatasetRecord::new("r1", [("question", json!("hi"))])]);
//!
//! let recorder = Arc::new(MemoryRecorder::new());
//! let experiment = Experiment::new(store, Arc::clone(&recorder));
//!
//! let config = ExperimentConfig::builder(
//!     AssetRef::new("echo", 1),
//!     AssetRef::new("qs", 1),
//!     Arc::new(Echo),
//!     Arc::new(Echo),
//! )
//! .evaluation(EvaluationSpec::new("length").inference_column("response"))
//! .build();
//!
//! let batch = experiment.run(&config)?;
//! assert_eq!(batch.rows()[0].inference(), "<hi>");
//! assert_eq!(recorder.rows_for_experiment(batch.experiment_id()).len(), 1);
//! # Ok::<(), trueno_promptlab::Error>(())
//! ```

mod plan;
mod result_row;

pub use plan::ExperimentPlan;
pub use result_row::{ExperimentResultRow, ResultBatch, RunIdentity};

use std::sync::Arc;
use std::time::Instant;

use crate::asset::AssetStore;
use crate::config::{EngineConfig, ExperimentConfig};
use crate::dataset;
use crate::evaluation::{EvaluationDispatcher, EvaluatorContext, EvaluatorRegistry};
use crate::recorder::ResultRecorder;
use crate::{Error, Result};

/// Experiment runner.
pub struct Experiment<S: ?Sized, R: ?Sized> {
    store: Arc<S>,
    recorder: Arc<R>,
    registry: EvaluatorRegistry,
    engine: EngineConfig,
}

impl<S, R> Experiment<S, R>
where
    S: AssetStore + ?Sized,
    R: ResultRecorder + ?Sized,
{
    /// Create a runner with the built-in metrics and default engine config.
    #[must_use]
    pub fn new(store: Arc<S>, recorder: Arc<R>) -> Self {
        Self {
            store,
            recorder,
            registry: EvaluatorRegistry::with_builtins(),
            engine: EngineConfig::default(),
        }
    }

    /// Replace the evaluator registry.
    #[must_use]
    pub fn with_registry(mut self, registry: EvaluatorRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the engine config.
    #[must_use]
    pub fn with_engine_config(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Get the evaluator registry.
    #[must_use]
    pub const fn registry(&self) -> &EvaluatorRegistry {
        &self.registry
    }

    /// Get the engine config.
    #[must_use]
    pub const fn engine_config(&self) -> &EngineConfig {
        &self.engine
    }

    /// Get the result recorder.
    #[must_use]
    pub fn recorder(&self) -> &Arc<R> {
        &self.recorder
    }

    /// Validate the config and fetch everything a run needs.
    ///
    /// No inference or evaluation happens here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] for an invalid config or empty
    /// template, [`Error::AssetNotFound`] for unknown assets, and
    /// [`Error::Dataset`] for an empty or malformed dataset.
    pub fn prepare(&self, config: &ExperimentConfig) -> Result<ExperimentPlan> {
        config.validate(&self.registry)?;

        let context = EvaluatorContext {
            inference_model: Arc::clone(config.inference_model()),
            embedding_model: Arc::clone(config.embedding_model()),
        };
        let dispatcher =
            EvaluationDispatcher::resolve(config.evaluation(), &self.registry, &context)?;

        let template_ref = config.prompt_template();
        let template = self
            .store
            .fetch_prompt_template(&template_ref.name, template_ref.version)?;
        if template.is_empty() {
            return Err(Error::ConfigValidation(format!(
                "prompt template {template_ref} is empty"
            )));
        }

        let dataset_ref = config.dataset();
        let records = self
            .store
            .fetch_dataset(&dataset_ref.name, dataset_ref.version)?;
        if records.is_empty() {
            return Err(Error::Dataset(format!("dataset {dataset_ref} has no records")));
        }
        dataset::ensure_unique_ids(&records)?;

        Ok(ExperimentPlan::new(
            template,
            records,
            Arc::clone(config.inference_model()),
            dispatcher,
        ))
    }

    /// Run an experiment with the sequential strategy and record the batch.
    ///
    /// Blocks the calling thread for every inference call.
    ///
    /// # Errors
    ///
    /// Any preparation, record-level or recorder error; nothing is recorded
    /// unless the whole batch succeeded.
    pub fn run(&self, config: &ExperimentConfig) -> Result<ResultBatch> {
        let plan = self.prepare(config)?;
        tracing::info!(
            prompt_template = %config.prompt_template(),
            dataset = %config.dataset(),
            records = plan.record_count(),
            strategy = "sequential",
            "starting experiment"
        );

        let started = Instant::now();
        let batch = plan.run_sequential().inspect_err(|err| {
            tracing::warn!(error = %err, "experiment failed, nothing recorded");
        })?;
        self.finish(config, batch, started)
    }

    /// Run an experiment with the concurrent strategy and record the batch.
    ///
    /// At most `max_concurrent_tasks` records are in flight at once.
    ///
    /// # Errors
    ///
    /// Any preparation, record-level, task or recorder error; nothing is
    /// recorded unless the whole batch succeeded.
    pub async fn run_async(&self, config: &ExperimentConfig) -> Result<ResultBatch> {
        self.engine.validate()?;
        let plan = self.prepare(config)?;
        tracing::info!(
            prompt_template = %config.prompt_template(),
            dataset = %config.dataset(),
            records = plan.record_count(),
            strategy = "concurrent",
            max_concurrent_tasks = self.engine.max_concurrent_tasks,
            "starting experiment"
        );

        let started = Instant::now();
        let batch = plan.run_concurrent(&self.engine).await.inspect_err(|err| {
            tracing::warn!(error = %err, "experiment failed, nothing recorded");
        })?;
        self.finish(config, batch, started)
    }

    fn finish(
        &self,
        config: &ExperimentConfig,
        batch: ResultBatch,
        started: Instant,
    ) -> Result<ResultBatch> {
        self.recorder.record(config, &batch)?;
        tracing::info!(
            experiment_id = batch.experiment_id(),
            rows = batch.len(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "experiment recorded"
        );
        Ok(batch)
    }
}
