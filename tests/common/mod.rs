//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::json;
use trueno_promptlab::asset::MemoryAssetStore;
use trueno_promptlab::config::{AssetRef, ExperimentConfig};
use trueno_promptlab::dataset::DatasetRecord;
use trueno_promptlab::evaluation::EvaluationSpec;
use trueno_promptlab::model::{EmbeddingModel, InferenceModel, InferenceResult, ModelDescriptor};

pub const TEMPLATE: &str = "qa";
pub const DATASET: &str = "questions";

type DelayFn = Box<dyn Fn(usize) -> Duration + Send + Sync>;

/// Deterministic model: answers `answer-<index>` for user prompt `Answer: <q<index>>`.
pub struct StubModel {
    delay: DelayFn,
    fail_on: Option<usize>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubModel {
    pub fn new() -> Self {
        Self {
            delay: Box::new(|_| Duration::ZERO),
            fail_on: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: impl Fn(usize) -> Duration + Send + Sync + 'static) -> Self {
        self.delay = Box::new(delay);
        self
    }

    pub fn failing_on(mut self, index: usize) -> Self {
        self.fail_on = Some(index);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn enter(&self, user_prompt: &str) -> usize {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        record_index(user_prompt)
    }

    fn exit(&self, index: usize, started: Instant) -> anyhow::Result<InferenceResult> {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.fail_on == Some(index) {
            anyhow::bail!("backend rejected record {index}");
        }
        Ok(InferenceResult::new(
            format!("answer-{index}"),
            10 + index as u64,
            1,
            started.elapsed().as_secs_f64() * 1000.0,
        ))
    }
}

#[async_trait]
impl InferenceModel for StubModel {
    fn invoke(&self, _system_prompt: &str, user_prompt: &str) -> anyhow::Result<InferenceResult> {
        let started = Instant::now();
        let index = self.enter(user_prompt);
        std::thread::sleep((self.delay)(index));
        self.exit(index, started)
    }

    async fn ainvoke(
        &self,
        _system_prompt: &str,
        user_prompt: &str,
    ) -> anyhow::Result<InferenceResult> {
        let started = Instant::now();
        let index = self.enter(user_prompt);
        tokio::time::sleep((self.delay)(index)).await;
        self.exit(index, started)
    }

    fn describe(&self) -> ModelDescriptor {
        ModelDescriptor::new("stub", "deterministic")
    }
}

/// Model returning a fixed result for every prompt.
pub struct FixedModel(pub InferenceResult);

#[async_trait]
impl InferenceModel for FixedModel {
    fn invoke(&self, _system_prompt: &str, _user_prompt: &str) -> anyhow::Result<InferenceResult> {
        Ok(self.0.clone())
    }

    async fn ainvoke(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
    ) -> anyhow::Result<InferenceResult> {
        Ok(self.0.clone())
    }
}

/// Bag-of-letters embedding.
pub struct StubEmbedding;

impl EmbeddingModel for StubEmbedding {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut v = vec![1.0; 27];
        for c in text.chars().filter(char::is_ascii_lowercase) {
            v[(c as u8 - b'a') as usize] += 1.0;
        }
        Ok(v)
    }

    fn describe(&self) -> ModelDescriptor {
        ModelDescriptor::new("stub", "letters")
    }
}

/// Parse `<index>` out of `Answer: <q<index>>`.
pub fn record_index(user_prompt: &str) -> usize {
    user_prompt
        .trim_start_matches("Answer: <q")
        .trim_end_matches('>')
        .parse()
        .unwrap_or(usize::MAX)
}

pub fn records(n: usize) -> Vec<DatasetRecord> {
    (0..n)
        .map(|i| {
            DatasetRecord::new(
                format!("r{i}"),
                [
                    ("role", json!("tutor")),
                    ("question", json!(format!("q{i}"))),
                    ("expected", json!(format!("answer-{i}"))),
                ],
            )
        })
        .collect()
}

pub fn store_with(records: Vec<DatasetRecord>) -> Arc<MemoryAssetStore> {
    let store = Arc::new(MemoryAssetStore::new());
    store.register_prompt_template(TEMPLATE, 1, "You are <role>.", "Answer: <question>");
    store.register_dataset_records(DATASET, 1, records);
    store
}

pub fn config_for(model: Arc<dyn InferenceModel>) -> ExperimentConfig {
    ExperimentConfig::builder(
        AssetRef::new(TEMPLATE, 1),
        AssetRef::new(DATASET, 1),
        model,
        Arc::new(StubEmbedding),
    )
    .evaluation(
        EvaluationSpec::new("exact_match")
            .inference_column("actual")
            .column("expected", "expected"),
    )
    .evaluation(EvaluationSpec::new("length").inference_column("response"))
    .build()
}
