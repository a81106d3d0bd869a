//! Inference and embedding model contracts
//!
//! Every backend implements [`InferenceModel`], which exposes a blocking
//! [`invoke`](InferenceModel::invoke) and a suspendable
//! [`ainvoke`](InferenceModel::ainvoke). The sequential strategy only calls
//! the former, the concurrent strategy only the latter.
//!
//! Backends that only have a blocking client implement [`BlockingModel`] and
//! wrap themselves in [`Offloaded`], which runs the blocking call on tokio's
//! blocking pool.
//!
//! Latency is measured by the adapter and must cover only the inference call.

mod offload;

pub use offload::{BlockingModel, Offloaded};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Output of one inference call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InferenceResult {
    /// Generated text
    pub inference: String,
    /// Tokens consumed by the prompt
    pub prompt_tokens: u64,
    /// Tokens produced by the completion
    pub completion_tokens: u64,
    /// Wall-clock duration of the inference call
    pub latency_ms: f64,
}

impl InferenceResult {
    /// Create an inference result.
    #[must_use]
    pub fn new(
        inference: impl Into<String>,
        prompt_tokens: u64,
        completion_tokens: u64,
        latency_ms: f64,
    ) -> Self {
        Self {
            inference: inference.into(),
            prompt_tokens,
            completion_tokens,
            latency_ms,
        }
    }
}

/// Identifies a model backend in experiment records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelDescriptor {
    /// Backend family (e.g. "ollama", "openrouter")
    pub model_type: String,
    /// Deployment or model name within the backend
    pub deployment: String,
}

impl ModelDescriptor {
    /// Create a model descriptor.
    #[must_use]
    pub fn new(model_type: impl Into<String>, deployment: impl Into<String>) -> Self {
        Self {
            model_type: model_type.into(),
            deployment: deployment.into(),
        }
    }
}

impl Default for ModelDescriptor {
    fn default() -> Self {
        Self::new("custom", "")
    }
}

/// Inference backend contract.
#[async_trait]
pub trait InferenceModel: Send + Sync {
    /// Run inference, blocking the calling thread.
    ///
    /// # Errors
    ///
    /// Returns the backend's error; the engine wraps it with the record id.
    fn invoke(&self, system_prompt: &str, user_prompt: &str) -> anyhow::Result<InferenceResult>;

    /// Run inference without blocking the executor.
    ///
    /// Must return a result structurally compatible with [`invoke`](Self::invoke)
    /// for the same prompts.
    ///
    /// # Errors
    ///
    /// Returns the backend's error; the engine wraps it with the record id.
    async fn ainvoke(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> anyhow::Result<InferenceResult>;

    /// Describe the backend for experiment records.
    fn describe(&self) -> ModelDescriptor {
        ModelDescriptor::default()
    }
}

/// Embedding backend contract, used by embedding-based evaluators.
pub trait EmbeddingModel: Send + Sync {
    /// Embed a text into a vector.
    ///
    /// # Errors
    ///
    /// Returns the backend's error.
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    /// Describe the backend for experiment records.
    fn describe(&self) -> ModelDescriptor {
        ModelDescriptor::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl InferenceModel for Echo {
        fn invoke(&self, _system: &str, user: &str) -> anyhow::Result<InferenceResult> {
            Ok(InferenceResult::new(user, 1, 1, 0.0))
        }

        async fn ainvoke(&self, system: &str, user: &str) -> anyhow::Result<InferenceResult> {
            self.invoke(system, user)
        }
    }

    #[tokio::test]
    async fn test_invoke_and_ainvoke_agree() {
        let model = Echo;
        let sync = model.invoke("s", "hello").unwrap();
        let not_sync = model.ainvoke("s", "hello").await.unwrap();
        assert_eq!(sync, not_sync);
    }

    #[test]
    fn test_default_descriptor() {
        let descriptor = Echo.describe();
        assert_eq!(descriptor.model_type, "custom");
        assert!(descriptor.deployment.is_empty());
    }
}
