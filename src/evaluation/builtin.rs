//! Built-in evaluators
//!
//! | Metric | Inputs | Result |
//! |---|---|---|
//! | `exact_match` | `actual`, `expected` | bool |
//! | `contains` | `actual`, `expected` | bool (`expected` is a substring of `actual`) |
//! | `length` | `response` | character count |
//! | `semantic_similarity` | `actual`, `expected` | cosine similarity of embeddings |

use std::sync::Arc;

use serde_json::{json, Value};

use super::{Evaluator, EvaluatorInputs};
use crate::model::EmbeddingModel;

/// Exact string equality of `actual` and `expected`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatch;

impl Evaluator for ExactMatch {
    fn evaluate(&self, inputs: &EvaluatorInputs) -> anyhow::Result<Value> {
        Ok(json!(inputs.text("actual")? == inputs.text("expected")?))
    }
}

/// `expected` occurs within `actual`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Contains;

impl Evaluator for Contains {
    fn evaluate(&self, inputs: &EvaluatorInputs) -> anyhow::Result<Value> {
        Ok(json!(inputs.text("actual")?.contains(&inputs.text("expected")?)))
    }
}

/// Character count of `response`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Length;

impl Evaluator for Length {
    fn evaluate(&self, inputs: &EvaluatorInputs) -> anyhow::Result<Value> {
        Ok(json!(inputs.text("response")?.chars().count()))
    }
}

/// Cosine similarity between embeddings of `actual` and `expected`.
pub struct SemanticSimilarity {
    embedding_model: Arc<dyn EmbeddingModel>,
}

impl SemanticSimilarity {
    /// Create the evaluator over an embedding model.
    #[must_use]
    pub fn new(embedding_model: Arc<dyn EmbeddingModel>) -> Self {
        Self { embedding_model }
    }
}

impl Evaluator for SemanticSimilarity {
    fn evaluate(&self, inputs: &EvaluatorInputs) -> anyhow::Result<Value> {
        let actual = self.embedding_model.embed(&inputs.text("actual")?)?;
        let expected = self.embedding_model.embed(&inputs.text("expected")?)?;
        Ok(json!(cosine_similarity(&actual, &expected)?))
    }
}

/// Cosine similarity of two equal-length vectors.
///
/// # Errors
///
/// Fails on a length mismatch or a zero vector.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> anyhow::Result<f64> {
    anyhow::ensure!(
        a.len() == b.len(),
        "embedding dimensions differ: {} vs {}",
        a.len(),
        b.len()
    );

    let (dot, norm_a, norm_b) = a.iter().zip(b).fold((0.0, 0.0, 0.0), |(dot, na, nb), (x, y)| {
        let (x, y) = (f64::from(*x), f64::from(*y));
        (dot + x * y, na + x * x, nb + y * y)
    });

    anyhow::ensure!(norm_a > 0.0 && norm_b > 0.0, "cannot compare a zero embedding");
    Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(pairs: &[(&str, &str)]) -> EvaluatorInputs {
        pairs.iter().map(|(k, v)| (*k, json!(v))).collect()
    }

    struct CharEmbedding;

    impl EmbeddingModel for CharEmbedding {
        fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            let mut v = vec![0.0; 26];
            for c in text.chars().filter(char::is_ascii_lowercase) {
                v[(c as u8 - b'a') as usize] += 1.0;
            }
            Ok(v)
        }
    }

    #[test]
    fn test_exact_match() {
        let eval = ExactMatch;
        assert_eq!(eval.evaluate(&inputs(&[("actual", "4"), ("expected", "4")])).unwrap(), json!(true));
        assert_eq!(eval.evaluate(&inputs(&[("actual", "4"), ("expected", "2+2?")])).unwrap(), json!(false));
        assert!(eval.evaluate(&inputs(&[("actual", "4")])).is_err());
    }

    #[test]
    fn test_contains() {
        let result = Contains
            .evaluate(&inputs(&[("actual", "the answer is 4"), ("expected", "4")]))
            .unwrap();
        assert_eq!(result, json!(true));
    }

    #[test]
    fn test_length_counts_chars() {
        let result = Length.evaluate(&inputs(&[("response", "héllo")])).unwrap();
        assert_eq!(result, json!(5));
    }

    #[test]
    fn test_semantic_similarity_identical() {
        let eval = SemanticSimilarity::new(Arc::new(CharEmbedding));
        let result = eval
            .evaluate(&inputs(&[("actual", "abc"), ("expected", "abc")]))
            .unwrap();
        assert!((result.as_f64().unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_similarity_errors() {
        assert!(cosine_similarity(&[1.0], &[1.0, 2.0]).is_err());
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]).is_err());
        let orthogonal = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!(orthogonal.abs() < f64::EPSILON);
    }
}
