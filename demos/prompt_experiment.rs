//! Prompt Experiment: template × dataset × model → recorded result batch
//!
//! This demo runs one experiment config with both execution strategies:
//! - A JSONL dataset written to the temp directory
//! - A blocking "keyword" backend adapted with `Offloaded`
//! - Built-in `exact_match`, `length` and `semantic_similarity` metrics
//!
//! Run with: RUST_LOG=debug cargo run --example prompt_experiment

use std::sync::Arc;
use std::time::{Duration, Instant};

use trueno_promptlab::asset::MemoryAssetStore;
use trueno_promptlab::config::{AssetRef, EngineConfig, ExperimentConfig};
use trueno_promptlab::evaluation::EvaluationSpec;
use trueno_promptlab::experiment::Experiment;
use trueno_promptlab::model::{
    BlockingModel, EmbeddingModel, InferenceResult, ModelDescriptor, Offloaded,
};
use trueno_promptlab::recorder::MemoryRecorder;
use trueno_promptlab::telemetry;

const DATASET: &str = r#"{"id": "q1", "topic": "capital of France", "expected": "Paris"}
{"id": "q2", "topic": "largest planet", "expected": "Jupiter"}
{"id": "q3", "topic": "boiling point of water in Celsius", "expected": "100"}
{"id": "q4", "topic": "author of Hamlet", "expected": "Shakespeare"}
{"id": "q5", "topic": "chemical symbol for gold", "expected": "Au"}
"#;

/// Pretends to be a slow HTTP backend with a fixed answer book
struct KeywordModel;

impl BlockingModel for KeywordModel {
    fn invoke(&self, system_prompt: &str, user_prompt: &str) -> anyhow::Result<InferenceResult> {
        std::thread::sleep(Duration::from_millis(150));
        let answer = [
            ("France", "Paris"),
            ("planet", "Jupiter"),
            ("water", "100"),
            ("Hamlet", "Marlowe"),
            ("gold", "Au"),
        ]
        .iter()
        .find(|(keyword, _)| user_prompt.contains(*keyword))
        .map_or("I don't know", |(_, answer)| *answer);

        let prompt_tokens = (system_prompt.split_whitespace().count()
            + user_prompt.split_whitespace().count()) as u64;
        Ok(InferenceResult::new(answer, prompt_tokens, 1, 0.0))
    }

    fn describe(&self) -> ModelDescriptor {
        ModelDescriptor::new("keyword", "local")
    }
}

/// Character-frequency embedding
struct CharEmbedding;

impl EmbeddingModel for CharEmbedding {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut vector = vec![1.0; 128];
        for byte in text.bytes().filter(u8::is_ascii) {
            vector[usize::from(byte)] += 1.0;
        }
        Ok(vector)
    }

    fn describe(&self) -> ModelDescriptor {
        ModelDescriptor::new("char-frequency", "local")
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    println!("=== trueno-promptlab: Prompt Experiment ===\n");

    // Step 1: Register assets
    let dataset_path = std::env::temp_dir().join("promptlab_demo_trivia.jsonl");
    std::fs::write(&dataset_path, DATASET)?;

    let store = Arc::new(MemoryAssetStore::new());
    store.register_prompt_template(
        "trivia",
        1,
        "You are a trivia expert. Reply in one word.",
        "Question: what is the <topic>?",
    );
    store.register_dataset_path("trivia", 1, &dataset_path);
    println!("Step 1: Registered template trivia@1 and dataset {}", dataset_path.display());

    // Step 2: Build the experiment config
    let config = ExperimentConfig::builder(
        AssetRef::new("trivia", 1),
        AssetRef::new("trivia", 1),
        Arc::new(Offloaded::new(KeywordModel)),
        Arc::new(CharEmbedding),
    )
    .evaluation(
        EvaluationSpec::new("exact_match")
            .inference_column("actual")
            .column("expected", "expected"),
    )
    .evaluation(EvaluationSpec::new("length").inference_column("response"))
    .evaluation(
        EvaluationSpec::new("semantic_similarity")
            .inference_column("actual")
            .column("expected", "expected"),
    )
    .build();
    println!("Step 2: {config:?}\n");

    let recorder = Arc::new(MemoryRecorder::new());
    let experiment = Experiment::new(Arc::clone(&store), Arc::clone(&recorder))
        .with_engine_config(EngineConfig::default().max_concurrent_tasks(3));

    // Step 3: Sequential strategy (blocks this thread on every call)
    let started = Instant::now();
    let sequential = tokio::task::block_in_place(|| experiment.run(&config))?;
    println!(
        "Step 3: Sequential run {} took {:?}",
        sequential.experiment_id(),
        started.elapsed()
    );

    // Step 4: Concurrent strategy (at most 3 calls in flight)
    let started = Instant::now();
    let concurrent = experiment.run_async(&config).await?;
    println!(
        "Step 4: Concurrent run {} took {:?}\n",
        concurrent.experiment_id(),
        started.elapsed()
    );

    println!("Same outcome: {}\n", sequential.same_outcome(&concurrent));

    // Step 5: Inspect recorded rows
    println!("=== Recorded Rows ({}) ===", concurrent.experiment_id());
    for row in recorder.rows_for_experiment(concurrent.experiment_id()) {
        println!(
            "  {:<3} {:<12} tokens={:>2}+{} latency={:>6.1}ms eval={}",
            row.dataset_record_id(),
            row.inference(),
            row.prompt_tokens(),
            row.completion_tokens(),
            row.latency_ms(),
            row.evaluation()
        );
    }

    println!("\n=== Experiments ===");
    for record in recorder.experiments() {
        println!(
            "  {} model={} template={} dataset={} rows={}",
            record.experiment_id(),
            record.inference_model().model_type,
            record.prompt_template(),
            record.dataset(),
            record.row_count()
        );
    }

    std::fs::remove_file(&dataset_path)?;
    Ok(())
}
