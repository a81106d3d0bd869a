//! Metric name → evaluator factory lookup

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::builtin::{Contains, ExactMatch, Length, SemanticSimilarity};
use super::Evaluator;
use crate::model::{EmbeddingModel, InferenceModel};

/// Models available to evaluator factories (LLM-as-judge, embeddings).
#[derive(Clone)]
pub struct EvaluatorContext {
    /// The experiment's inference model
    pub inference_model: Arc<dyn InferenceModel>,
    /// The experiment's embedding model
    pub embedding_model: Arc<dyn EmbeddingModel>,
}

/// Builds an evaluator for one experiment run.
pub type EvaluatorFactory = Arc<dyn Fn(&EvaluatorContext) -> Arc<dyn Evaluator> + Send + Sync>;

/// Registry of named evaluators.
#[derive(Clone, Default)]
pub struct EvaluatorRegistry {
    factories: HashMap<String, EvaluatorFactory>,
}

impl EvaluatorRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in metrics registered.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("exact_match", |_| Arc::new(ExactMatch));
        registry.register("contains", |_| Arc::new(Contains));
        registry.register("length", |_| Arc::new(Length));
        registry.register("semantic_similarity", |ctx| {
            Arc::new(SemanticSimilarity::new(Arc::clone(&ctx.embedding_model)))
        });
        registry
    }

    /// Register (or replace) a metric.
    pub fn register<F>(&mut self, metric: impl Into<String>, factory: F)
    where
        F: Fn(&EvaluatorContext) -> Arc<dyn Evaluator> + Send + Sync + 'static,
    {
        self.factories.insert(metric.into(), Arc::new(factory));
    }

    /// Check whether a metric is registered.
    #[must_use]
    pub fn contains(&self, metric: &str) -> bool {
        self.factories.contains_key(metric)
    }

    /// Build the evaluator for a metric.
    #[must_use]
    pub fn build(&self, metric: &str, context: &EvaluatorContext) -> Option<Arc<dyn Evaluator>> {
        self.factories.get(metric).map(|factory| factory(context))
    }

    /// Registered metric names, sorted.
    #[must_use]
    pub fn metrics(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for EvaluatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluatorRegistry")
            .field("metrics", &self.metrics())
            .finish()
    }
}
