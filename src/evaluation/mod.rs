//! Evaluation: metric resolution, column mapping and payload encoding
//!
//! ## Flow
//!
//! ```text
//! EvaluationSpec ──resolve──> BoundEvaluator ──evaluate(record, inference)──> MetricResult
//!      (metric, column_mapping,        (registry or                 (ordered, one per spec)
//!       optional evaluator)             pre-bound)
//! ```
//!
//! Results are serialized as one JSON array per record:
//! `[{"metric": "exact_match", "result": false}, ...]`, in configuration order.

pub mod builtin;
mod dispatcher;
mod registry;

pub use dispatcher::EvaluationDispatcher;
pub use registry::{EvaluatorContext, EvaluatorFactory, EvaluatorRegistry};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

/// Sentinel column value meaning "the record's inference text".
pub const INFERENCE_COLUMN: &str = "$inference";

/// Pluggable scorer.
pub trait Evaluator: Send + Sync {
    /// Score one record.
    ///
    /// # Errors
    ///
    /// Any error aborts the experiment run.
    fn evaluate(&self, inputs: &EvaluatorInputs) -> anyhow::Result<Value>;
}

impl<F> Evaluator for F
where
    F: Fn(&EvaluatorInputs) -> anyhow::Result<Value> + Send + Sync,
{
    fn evaluate(&self, inputs: &EvaluatorInputs) -> anyhow::Result<Value> {
        self(inputs)
    }
}

/// Named inputs handed to an evaluator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluatorInputs(BTreeMap<String, Value>);

impl EvaluatorInputs {
    /// Create an empty input map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an input.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    /// Get an input by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Get an input rendered as text.
    ///
    /// # Errors
    ///
    /// Fails if the evaluator was not given this input.
    pub fn text(&self, name: &str) -> anyhow::Result<String> {
        self.0
            .get(name)
            .map(crate::dataset::value_text)
            .ok_or_else(|| anyhow::anyhow!("evaluator input '{name}' is not mapped"))
    }

    /// Number of inputs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check whether there are no inputs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for EvaluatorInputs {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Where an evaluator input comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnSource {
    /// The inference text produced for the record
    Inference,
    /// A field of the dataset record
    Field(String),
}

impl From<String> for ColumnSource {
    fn from(value: String) -> Self {
        if value == INFERENCE_COLUMN {
            Self::Inference
        } else {
            Self::Field(value)
        }
    }
}

impl From<&str> for ColumnSource {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<ColumnSource> for String {
    fn from(source: ColumnSource) -> Self {
        match source {
            ColumnSource::Inference => INFERENCE_COLUMN.to_string(),
            ColumnSource::Field(name) => name,
        }
    }
}

/// One metric to compute per record.
#[derive(Clone)]
pub struct EvaluationSpec {
    metric: String,
    column_mapping: BTreeMap<String, ColumnSource>,
    evaluator: Option<Arc<dyn Evaluator>>,
}

impl EvaluationSpec {
    /// Create an evaluation entry for a metric with an empty column mapping.
    #[must_use]
    pub fn new(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            column_mapping: BTreeMap::new(),
            evaluator: None,
        }
    }

    /// Map an evaluator input to a column source.
    #[must_use]
    pub fn column(mut self, input: impl Into<String>, source: impl Into<ColumnSource>) -> Self {
        self.column_mapping.insert(input.into(), source.into());
        self
    }

    /// Map an evaluator input to the inference text.
    #[must_use]
    pub fn inference_column(self, input: impl Into<String>) -> Self {
        self.column(input, ColumnSource::Inference)
    }

    /// Bind a concrete evaluator, bypassing registry lookup.
    #[must_use]
    pub fn evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Get the metric name.
    #[must_use]
    pub fn metric(&self) -> &str {
        &self.metric
    }

    /// Get the column mapping.
    #[must_use]
    pub const fn column_mapping(&self) -> &BTreeMap<String, ColumnSource> {
        &self.column_mapping
    }

    /// Get the pre-bound evaluator, if any.
    #[must_use]
    pub fn bound_evaluator(&self) -> Option<&Arc<dyn Evaluator>> {
        self.evaluator.as_ref()
    }
}

impl fmt::Debug for EvaluationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationSpec")
            .field("metric", &self.metric)
            .field("column_mapping", &self.column_mapping)
            .field("evaluator", &self.evaluator.as_ref().map(|_| "<bound>"))
            .finish()
    }
}

/// Result of one metric for one record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricResult {
    /// Metric name
    pub metric: String,
    /// Evaluator-defined result
    pub result: Value,
}

/// Ordered metric results for one record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct EvaluationOutcome {
    results: Vec<MetricResult>,
}

impl EvaluationOutcome {
    /// Create an empty outcome.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a metric result.
    pub fn push(&mut self, metric: impl Into<String>, result: Value) {
        self.results.push(MetricResult {
            metric: metric.into(),
            result,
        });
    }

    /// Get the results in configuration order.
    #[must_use]
    pub fn results(&self) -> &[MetricResult] {
        &self.results
    }

    /// Get a metric's result by name.
    #[must_use]
    pub fn get(&self, metric: &str) -> Option<&Value> {
        self.results
            .iter()
            .find(|r| r.metric == metric)
            .map(|r| &r.result)
    }

    /// Encode as the stored evaluation payload.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if a result cannot be serialized.
    pub fn to_payload(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a stored evaluation payload.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if the payload is malformed.
    pub fn from_payload(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }
}
