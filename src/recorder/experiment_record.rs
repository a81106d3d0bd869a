//! Experiment Record - per-run summary kept alongside the result rows

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{AssetRef, ExperimentConfig};
use crate::experiment::ResultBatch;
use crate::model::ModelDescriptor;

/// Experiment Record represents one recorded experiment run.
///
/// It captures which models and asset versions produced a batch so the rows
/// can be joined back to their configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExperimentRecord {
    experiment_id: String,
    inference_model: ModelDescriptor,
    embedding_model: ModelDescriptor,
    prompt_template: AssetRef,
    dataset: AssetRef,
    metrics: Vec<String>,
    row_count: usize,
    created_at: DateTime<Utc>,
}

impl ExperimentRecord {
    /// Summarize a run from its config and batch.
    #[must_use]
    pub fn from_run(config: &ExperimentConfig, batch: &ResultBatch) -> Self {
        Self {
            experiment_id: batch.experiment_id().to_string(),
            inference_model: config.inference_model().describe(),
            embedding_model: config.embedding_model().describe(),
            prompt_template: config.prompt_template().clone(),
            dataset: config.dataset().clone(),
            metrics: config
                .evaluation()
                .iter()
                .map(|spec| spec.metric().to_string())
                .collect(),
            row_count: batch.len(),
            created_at: batch.created_at(),
        }
    }

    /// Get the experiment ID.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Get the inference model descriptor.
    #[must_use]
    pub const fn inference_model(&self) -> &ModelDescriptor {
        &self.inference_model
    }

    /// Get the embedding model descriptor.
    #[must_use]
    pub const fn embedding_model(&self) -> &ModelDescriptor {
        &self.embedding_model
    }

    /// Get the prompt template reference.
    #[must_use]
    pub const fn prompt_template(&self) -> &AssetRef {
        &self.prompt_template
    }

    /// Get the dataset reference.
    #[must_use]
    pub const fn dataset(&self) -> &AssetRef {
        &self.dataset
    }

    /// Get the evaluated metric names, in configuration order.
    #[must_use]
    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    /// Get the number of result rows.
    #[must_use]
    pub const fn row_count(&self) -> usize {
        self.row_count
    }

    /// Get the run timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
