//! Result Row - one dataset record's outcome within an experiment run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::evaluation::EvaluationOutcome;
use crate::model::InferenceResult;
use crate::Result;

/// Identity shared by every row of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunIdentity {
    experiment_id: String,
    created_at: DateTime<Utc>,
}

impl RunIdentity {
    /// Mint a fresh experiment ID and snapshot timestamp.
    #[must_use]
    pub fn mint() -> Self {
        Self {
            experiment_id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
        }
    }

    /// Get the experiment ID.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Get the run timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Result Row represents one dataset record's inference and evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperimentResultRow {
    experiment_id: String,
    dataset_record_id: String,
    inference: String,
    prompt_tokens: u64,
    completion_tokens: u64,
    latency_ms: f64,
    evaluation: String,
    created_at: DateTime<Utc>,
}

impl ExperimentResultRow {
    /// Create a row stamped with the run identity.
    #[must_use]
    pub fn new(
        identity: &RunIdentity,
        dataset_record_id: impl Into<String>,
        inference: InferenceResult,
        evaluation: String,
    ) -> Self {
        Self {
            experiment_id: identity.experiment_id.clone(),
            dataset_record_id: dataset_record_id.into(),
            inference: inference.inference,
            prompt_tokens: inference.prompt_tokens,
            completion_tokens: inference.completion_tokens,
            latency_ms: inference.latency_ms,
            evaluation,
            created_at: identity.created_at,
        }
    }

    /// Get the experiment ID.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Get the source dataset record ID.
    #[must_use]
    pub fn dataset_record_id(&self) -> &str {
        &self.dataset_record_id
    }

    /// Get the inference text.
    #[must_use]
    pub fn inference(&self) -> &str {
        &self.inference
    }

    /// Get the prompt token count.
    #[must_use]
    pub const fn prompt_tokens(&self) -> u64 {
        self.prompt_tokens
    }

    /// Get the completion token count.
    #[must_use]
    pub const fn completion_tokens(&self) -> u64 {
        self.completion_tokens
    }

    /// Get the inference latency in milliseconds.
    #[must_use]
    pub const fn latency_ms(&self) -> f64 {
        self.latency_ms
    }

    /// Get the serialized evaluation payload.
    #[must_use]
    pub fn evaluation(&self) -> &str {
        &self.evaluation
    }

    /// Decode the evaluation payload.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if the payload is malformed.
    pub fn evaluation_outcome(&self) -> Result<EvaluationOutcome> {
        EvaluationOutcome::from_payload(&self.evaluation)
    }

    /// Get the run timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Compare every field except `latency_ms` (and the run identity).
    ///
    /// Two runs of the same inputs with deterministic models produce rows
    /// that are the same outcome regardless of execution strategy.
    #[must_use]
    pub fn same_outcome(&self, other: &Self) -> bool {
        self.dataset_record_id == other.dataset_record_id
            && self.inference == other.inference
            && self.prompt_tokens == other.prompt_tokens
            && self.completion_tokens == other.completion_tokens
            && self.evaluation == other.evaluation
    }
}

/// All rows of one successful run, in dataset order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultBatch {
    experiment_id: String,
    created_at: DateTime<Utc>,
    rows: Vec<ExperimentResultRow>,
}

impl ResultBatch {
    /// Assemble a batch for a run.
    #[must_use]
    pub fn new(identity: RunIdentity, rows: Vec<ExperimentResultRow>) -> Self {
        Self {
            experiment_id: identity.experiment_id,
            created_at: identity.created_at,
            rows,
        }
    }

    /// Get the experiment ID.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Get the run timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the rows.
    #[must_use]
    pub fn rows(&self) -> &[ExperimentResultRow] {
        &self.rows
    }

    /// Consume the batch, returning its rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<ExperimentResultRow> {
        self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check whether the batch has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Compare two batches row by row, ignoring latency and run identity.
    #[must_use]
    pub fn same_outcome(&self, other: &Self) -> bool {
        self.rows.len() == other.rows.len()
            && self
                .rows
                .iter()
                .zip(&other.rows)
                .all(|(a, b)| a.same_outcome(b))
    }
}
