//! Blocking-backend adapter
//!
//! Mirrors the "run the sync client in a thread pool" approach used by
//! backends without an async API.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use super::{InferenceModel, InferenceResult, ModelDescriptor};

/// Backend with only a blocking inference call.
pub trait BlockingModel: Send + Sync + 'static {
    /// Run inference, blocking the calling thread.
    ///
    /// # Errors
    ///
    /// Returns the backend's error.
    fn invoke(&self, system_prompt: &str, user_prompt: &str) -> anyhow::Result<InferenceResult>;

    /// Describe the backend for experiment records.
    fn describe(&self) -> ModelDescriptor {
        ModelDescriptor::default()
    }
}

/// Adapts a [`BlockingModel`] to [`InferenceModel`].
///
/// `ainvoke` runs the blocking call on tokio's blocking pool. The reported
/// latency is the blocking call's own wall-clock time, excluding time spent
/// waiting for a pool thread.
pub struct Offloaded<M> {
    inner: Arc<M>,
}

impl<M: BlockingModel> Offloaded<M> {
    /// Wrap a blocking backend.
    #[must_use]
    pub fn new(model: M) -> Self {
        Self {
            inner: Arc::new(model),
        }
    }

    /// Get the wrapped backend.
    #[must_use]
    pub fn inner(&self) -> &M {
        &self.inner
    }
}

#[async_trait]
impl<M: BlockingModel> InferenceModel for Offloaded<M> {
    fn invoke(&self, system_prompt: &str, user_prompt: &str) -> anyhow::Result<InferenceResult> {
        timed(&*self.inner, system_prompt, user_prompt)
    }

    async fn ainvoke(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> anyhow::Result<InferenceResult> {
        let model = Arc::clone(&self.inner);
        let system_prompt = system_prompt.to_string();
        let user_prompt = user_prompt.to_string();

        tokio::task::spawn_blocking(move || timed(&*model, &system_prompt, &user_prompt)).await?
    }

    fn describe(&self) -> ModelDescriptor {
        self.inner.describe()
    }
}

// Backends may report latency themselves; fill it in only when they do not.
fn timed<M: BlockingModel>(
    model: &M,
    system_prompt: &str,
    user_prompt: &str,
) -> anyhow::Result<InferenceResult> {
    let start = Instant::now();
    let mut result = model.invoke(system_prompt, user_prompt)?;
    if result.latency_ms <= 0.0 {
        result.latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Sleepy {
        delay: Duration,
    }

    impl BlockingModel for Sleepy {
        fn invoke(&self, system: &str, user: &str) -> anyhow::Result<InferenceResult> {
            std::thread::sleep(self.delay);
            Ok(InferenceResult::new(format!("{system}|{user}"), 2, 3, 0.0))
        }

        fn describe(&self) -> ModelDescriptor {
            ModelDescriptor::new("sleepy", "v1")
        }
    }

    struct Failing;

    impl BlockingModel for Failing {
        fn invoke(&self, _system: &str, _user: &str) -> anyhow::Result<InferenceResult> {
            anyhow::bail!("backend unavailable")
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_offloaded_matches_blocking() {
        let model = Offloaded::new(Sleepy {
            delay: Duration::from_millis(5),
        });
        let a = model.invoke("s", "u").unwrap();
        let b = model.ainvoke("s", "u").await.unwrap();
        assert_eq!(a.inference, b.inference);
        assert_eq!(a.prompt_tokens, b.prompt_tokens);
        assert_eq!(a.completion_tokens, b.completion_tokens);
        assert!(b.latency_ms >= 5.0);
    }

    #[tokio::test]
    async fn test_offloaded_propagates_errors() {
        let model = Offloaded::new(Failing);
        let err = model.ainvoke("s", "u").await.unwrap_err();
        assert!(err.to_string().contains("backend unavailable"));
    }

    #[test]
    fn test_offloaded_describe() {
        let model = Offloaded::new(Sleepy {
            delay: Duration::ZERO,
        });
        assert_eq!(model.describe().model_type, "sleepy");
        assert_eq!(model.inner().delay, Duration::ZERO);
    }
}
