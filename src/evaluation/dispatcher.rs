//! Resolves evaluation specs once per run and scores records

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::{
    ColumnSource, EvaluationOutcome, EvaluationSpec, Evaluator, EvaluatorContext,
    EvaluatorInputs, EvaluatorRegistry,
};
use crate::dataset::DatasetRecord;
use crate::{Error, Result};

struct BoundEvaluator {
    metric: String,
    column_mapping: BTreeMap<String, ColumnSource>,
    evaluator: Arc<dyn Evaluator>,
}

/// Evaluators for one experiment run, in configuration order.
pub struct EvaluationDispatcher {
    bound: Vec<BoundEvaluator>,
}

impl EvaluationDispatcher {
    /// Resolve every evaluation entry to a concrete evaluator.
    ///
    /// A pre-bound evaluator takes precedence over the registry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] for a metric that is neither
    /// pre-bound nor registered.
    pub fn resolve(
        specs: &[EvaluationSpec],
        registry: &EvaluatorRegistry,
        context: &EvaluatorContext,
    ) -> Result<Self> {
        let bound = specs
            .iter()
            .map(|spec| {
                let evaluator = match spec.bound_evaluator() {
                    Some(evaluator) => Arc::clone(evaluator),
                    None => registry.build(spec.metric(), context).ok_or_else(|| {
                        Error::ConfigValidation(format!(
                            "unknown metric '{}' (registered: {})",
                            spec.metric(),
                            registry.metrics().join(", ")
                        ))
                    })?,
                };
                Ok(BoundEvaluator {
                    metric: spec.metric().to_string(),
                    column_mapping: spec.column_mapping().clone(),
                    evaluator,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { bound })
    }

    /// Number of metrics evaluated per record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bound.len()
    }

    /// Check whether no metrics are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }

    /// Score one record's inference with every metric, in configuration order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingColumn`] for a mapped field the record lacks,
    /// or [`Error::Evaluation`] if an evaluator fails.
    pub fn evaluate(&self, inference: &str, record: &DatasetRecord) -> Result<EvaluationOutcome> {
        let mut outcome = EvaluationOutcome::new();

        for bound in &self.bound {
            let inputs = build_inputs(&bound.column_mapping, inference, record)?;
            let result =
                bound
                    .evaluator
                    .evaluate(&inputs)
                    .map_err(|source| Error::Evaluation {
                        metric: bound.metric.clone(),
                        record_id: record.id().to_string(),
                        source,
                    })?;
            outcome.push(bound.metric.clone(), result);
        }

        Ok(outcome)
    }
}

impl fmt::Debug for EvaluationDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.bound.iter().map(|b| &b.metric))
            .finish()
    }
}

fn build_inputs(
    column_mapping: &BTreeMap<String, ColumnSource>,
    inference: &str,
    record: &DatasetRecord,
) -> Result<EvaluatorInputs> {
    let mut inputs = EvaluatorInputs::new();
    for (name, source) in column_mapping {
        let value = match source {
            ColumnSource::Inference => Value::String(inference.to_string()),
            ColumnSource::Field(field) => {
                record
                    .get(field)
                    .cloned()
                    .ok_or_else(|| Error::MissingColumn {
                        column: field.clone(),
                        record_id: record.id().to_string(),
                    })?
            }
        };
        inputs.insert(name.clone(), value);
    }
    Ok(inputs)
}
