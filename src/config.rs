//! Experiment and engine configuration
//!
//! [`ExperimentConfig`] describes one run and is validated once before any
//! record is processed. [`EngineConfig`] holds the execution policy shared by
//! every run of an [`Experiment`](crate::experiment::Experiment).

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::evaluation::{ColumnSource, EvaluationSpec, EvaluatorRegistry};
use crate::model::{EmbeddingModel, InferenceModel};
use crate::{Error, Result};

/// Default bound on simultaneously in-flight record tasks.
pub const DEFAULT_MAX_CONCURRENT_TASKS: usize = 5;

/// Reference to a versioned asset (prompt template or dataset).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AssetRef {
    /// Asset name
    pub name: String,
    /// Asset version
    pub version: u32,
}

impl AssetRef {
    /// Create an asset reference.
    #[must_use]
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Description of one experiment run.
#[derive(Clone)]
pub struct ExperimentConfig {
    prompt_template: AssetRef,
    dataset: AssetRef,
    inference_model: Arc<dyn InferenceModel>,
    embedding_model: Arc<dyn EmbeddingModel>,
    evaluation: Vec<EvaluationSpec>,
}

impl ExperimentConfig {
    /// Create a builder with the required fields.
    #[must_use]
    pub fn builder(
        prompt_template: AssetRef,
        dataset: AssetRef,
        inference_model: Arc<dyn InferenceModel>,
        embedding_model: Arc<dyn EmbeddingModel>,
    ) -> ExperimentConfigBuilder {
        ExperimentConfigBuilder::new(prompt_template, dataset, inference_model, embedding_model)
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

    /// Get the inference model.
    #[must_use]
    pub fn inference_model(&self) -> &Arc<dyn InferenceModel> {
        &self.inference_model
    }

    /// Get the embedding model.
    #[must_use]
    pub fn embedding_model(&self) -> &Arc<dyn EmbeddingModel> {
        &self.embedding_model
    }

    /// Get the evaluation specs, in order.
    #[must_use]
    pub fn evaluation(&self) -> &[EvaluationSpec] {
        &self.evaluation
    }

    /// Validate the config against an evaluator registry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] describing the first problem found.
    pub fn validate(&self, registry: &EvaluatorRegistry) -> Result<()> {
        for (kind, asset) in [
            ("prompt template", &self.prompt_template),
            ("dataset", &self.dataset),
        ] {
            if asset.name.trim().is_empty() {
                return Err(Error::ConfigValidation(format!("{kind} name is empty")));
            }
        }

        for (index, spec) in self.evaluation.iter().enumerate() {
            if spec.metric().trim().is_empty() {
                return Err(Error::ConfigValidation(format!(
                    "evaluation #{index} has an empty metric name"
                )));
            }
            if spec.column_mapping().is_empty() && spec.bound_evaluator().is_none() {
                return Err(Error::ConfigValidation(format!(
                    "evaluation '{}' has an empty column mapping",
                    spec.metric()
                )));
            }
            for (input, source) in spec.column_mapping() {
                if input.is_empty() || matches!(source, ColumnSource::Field(f) if f.is_empty()) {
                    return Err(Error::ConfigValidation(format!(
                        "evaluation '{}' maps an empty column name",
                        spec.metric()
                    )));
                }
            }
            if spec.bound_evaluator().is_none() && !registry.contains(spec.metric()) {
                return Err(Error::ConfigValidation(format!(
                    "evaluation '{}' has no evaluator and no registered metric of that name",
                    spec.metric()
                )));
            }
        }

        Ok(())
    }
}

impl fmt::Debug for ExperimentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExperimentConfig")
            .field("prompt_template", &self.prompt_template)
            .field("dataset", &self.dataset)
            .field("inference_model", &self.inference_model.describe())
            .field("embedding_model", &self.embedding_model.describe())
            .field("evaluation", &self.evaluation)
            .finish()
    }
}

/// Builder for `ExperimentConfig`.
pub struct ExperimentConfigBuilder {
    prompt_template: AssetRef,
    dataset: AssetRef,
    inference_model: Arc<dyn InferenceModel>,
    embedding_model: Arc<dyn EmbeddingModel>,
    evaluation: Vec<EvaluationSpec>,
}

impl ExperimentConfigBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(
        prompt_template: AssetRef,
        dataset: AssetRef,
        inference_model: Arc<dyn InferenceModel>,
        embedding_model: Arc<dyn EmbeddingModel>,
    ) -> Self {
        Self {
            prompt_template,
            dataset,
            inference_model,
            embedding_model,
            evaluation: Vec::new(),
        }
    }

    /// Append an evaluation spec.
    #[must_use]
    pub fn evaluation(mut self, spec: EvaluationSpec) -> Self {
        self.evaluation.push(spec);
        self
    }

    /// Build the `ExperimentConfig`.
    #[must_use]
    pub fn build(self) -> ExperimentConfig {
        ExperimentConfig {
            prompt_template: self.prompt_template,
            dataset: self.dataset,
            inference_model: self.inference_model,
            embedding_model: self.embedding_model,
            evaluation: self.evaluation,
        }
    }
}

/// Execution policy for experiment runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Maximum number of record tasks in flight in the concurrent strategy
    pub max_concurrent_tasks: usize,
    /// Run evaluation on the blocking pool in the concurrent strategy
    pub offload_evaluation: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: DEFAULT_MAX_CONCURRENT_TASKS,
            offload_evaluation: true,
        }
    }
}

impl EngineConfig {
    /// Parse from JSON; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] on malformed input or
    /// [`Error::ConfigValidation`] if the values are invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the concurrency bound.
    #[must_use]
    pub const fn max_concurrent_tasks(mut self, max: usize) -> Self {
        self.max_concurrent_tasks = max;
        self
    }

    /// Set whether evaluation runs on the blocking pool.
    #[must_use]
    pub const fn offload_evaluation(mut self, offload: bool) -> Self {
        self.offload_evaluation = offload;
        self
    }

    /// Validate the execution policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] if `max_concurrent_tasks` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_tasks == 0 {
            return Err(Error::ConfigValidation(
                "max_concurrent_tasks must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_concurrent_tasks, 5);
        assert!(config.offload_evaluation);
    }

    #[test]
    fn test_engine_config_from_json_partial() {
        let config = EngineConfig::from_json(r#"{"max_concurrent_tasks": 2}"#).unwrap();
        assert_eq!(config.max_concurrent_tasks, 2);
        assert!(config.offload_evaluation);
    }

    #[test]
    fn test_engine_config_rejects_zero() {
        let err = EngineConfig::from_json(r#"{"max_concurrent_tasks": 0}"#).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation(_)));
    }

    #[test]
    fn test_engine_config_rejects_unknown_fields() {
        assert!(EngineConfig::from_json(r#"{"max_tasks": 2}"#).is_err());
    }

    #[test]
    fn test_asset_ref_display() {
        assert_eq!(AssetRef::new("qa", 3).to_string(), "qa@3");
    }
}
