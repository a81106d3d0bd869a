//! Prepared experiment and the two execution strategies
//!
//! ## Strategies
//!
//! ```text
//! sequential:  r0: render → invoke → evaluate │ r1: render → invoke → evaluate │ ...
//!
//! concurrent:  render r0..rN (rayon, order kept)
//!              ┌ permit → ainvoke r0 → evaluate (blocking pool) → slot[0]
//!              ├ permit → ainvoke r1 → evaluate (blocking pool) → slot[1]
//!              └ ... at most `max_concurrent_tasks` permits held at once
//! ```
//!
//! Both strategies mint one [`RunIdentity`] and stop at the first error.

use std::sync::Arc;

use rayon::prelude::*;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::result_row::{ExperimentResultRow, ResultBatch, RunIdentity};
use crate::config::EngineConfig;
use crate::dataset::DatasetRecord;
use crate::evaluation::EvaluationDispatcher;
use crate::model::InferenceModel;
use crate::template::{PromptTemplate, RenderedPrompt};
use crate::{Error, Result};

/// Everything needed to execute one experiment, detached from the asset
/// store and the recorder.
pub struct ExperimentPlan {
    template: PromptTemplate,
    records: Vec<Arc<DatasetRecord>>,
    model: Arc<dyn InferenceModel>,
    dispatcher: Arc<EvaluationDispatcher>,
}

impl ExperimentPlan {
    /// Create a plan.
    #[must_use]
    pub fn new(
        template: PromptTemplate,
        records: Vec<DatasetRecord>,
        model: Arc<dyn InferenceModel>,
        dispatcher: EvaluationDispatcher,
    ) -> Self {
        Self {
            template,
            records: records.into_iter().map(Arc::new).collect(),
            model,
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Get the prompt template.
    #[must_use]
    pub const fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Number of dataset records.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Process records one at a time using the blocking inference call.
    ///
    /// # Errors
    ///
    /// Returns the first record-level error; no rows are returned.
    pub fn run_sequential(&self) -> Result<ResultBatch> {
        let identity = RunIdentity::mint();
        let mut rows = Vec::with_capacity(self.records.len());

        for record in &self.records {
            let prompt = self.template.substitute(record)?;
            let inference = self
                .model
                .invoke(&prompt.system_prompt, &prompt.user_prompt)
                .map_err(|source| Error::Inference {
                    record_id: record.id().to_string(),
                    source,
                })?;
            let outcome = self.dispatcher.evaluate(&inference.inference, record)?;

            tracing::debug!(
                experiment_id = identity.experiment_id(),
                record_id = record.id(),
                "record processed"
            );
            rows.push(ExperimentResultRow::new(
                &identity,
                record.id(),
                inference,
                outcome.to_payload()?,
            ));
        }

        Ok(ResultBatch::new(identity, rows))
    }

    /// Process records as concurrent tasks using the suspendable inference call.
    ///
    /// Prompts are rendered for every record before any inference starts.
    /// Rows are returned in dataset order regardless of completion order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] for an invalid engine config, the
    /// first rendering error by record position, or the first task failure to
    /// complete. Remaining tasks are aborted on failure.
    pub async fn run_concurrent(&self, engine: &EngineConfig) -> Result<ResultBatch> {
        engine.validate()?;
        let identity = RunIdentity::mint();

        let prompts = self.render_all()?;

        let semaphore = Arc::new(Semaphore::new(engine.max_concurrent_tasks));
        let mut tasks = JoinSet::new();

        for (index, (record, prompt)) in self.records.iter().zip(prompts).enumerate() {
            let task = RecordTask {
                record: Arc::clone(record),
                prompt,
                model: Arc::clone(&self.model),
                dispatcher: Arc::clone(&self.dispatcher),
                identity: identity.clone(),
                offload_evaluation: engine.offload_evaluation,
            };
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::TaskFailed(e.to_string()))?;
                task.run().await.map(|row| (index, row))
            });
        }

        let mut slots: Vec<Option<ExperimentResultRow>> =
            (0..self.records.len()).map(|_| None).collect();

        while let Some(joined) = tasks.join_next().await {
            let finished = joined
                .map_err(|e| Error::TaskFailed(e.to_string()))
                .and_then(|result| result);
            match finished {
                Ok((index, row)) => slots[index] = Some(row),
                Err(err) => {
                    tasks.abort_all();
                    tracing::warn!(
                        experiment_id = identity.experiment_id(),
                        error = %err,
                        "aborting concurrent run"
                    );
                    return Err(err);
                }
            }
        }

        let rows = slots
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| Error::TaskFailed("record task finished without a row".to_string()))?;

        Ok(ResultBatch::new(identity, rows))
    }

    // Rendered in parallel; errors are reported for the lowest failing index
    // so both strategies fail on the same record.
    fn render_all(&self) -> Result<Vec<RenderedPrompt>> {
        let rendered: Vec<Result<RenderedPrompt>> = self
            .records
            .par_iter()
            .map(|record| self.template.substitute(record))
            .collect();
        rendered.into_iter().collect()
    }
}

struct RecordTask {
    record: Arc<DatasetRecord>,
    prompt: RenderedPrompt,
    model: Arc<dyn InferenceModel>,
    dispatcher: Arc<EvaluationDispatcher>,
    identity: RunIdentity,
    offload_evaluation: bool,
}

impl RecordTask {
    async fn run(self) -> Result<ExperimentResultRow> {
        let inference = self
            .model
            .ainvoke(&self.prompt.system_prompt, &self.prompt.user_prompt)
            .await
            .map_err(|source| Error::Inference {
                record_id: self.record.id().to_string(),
                source,
            })?;

        let outcome = if self.offload_evaluation {
            let dispatcher = Arc::clone(&self.dispatcher);
            let record = Arc::clone(&self.record);
            let text = inference.inference.clone();
            tokio::task::spawn_blocking(move || dispatcher.evaluate(&text, &record))
                .await
                .map_err(|e| Error::TaskFailed(e.to_string()))??
        } else {
            self.dispatcher.evaluate(&inference.inference, &self.record)?
        };

        tracing::debug!(
            experiment_id = self.identity.experiment_id(),
            record_id = self.record.id(),
            "record processed"
        );
        Ok(ExperimentResultRow::new(
            &self.identity,
            self.record.id(),
            inference,
            outcome.to_payload()?,
        ))
    }
}
