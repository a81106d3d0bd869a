//! Tests for error types

use std::error::Error as _;

use trueno_promptlab::Error;

#[test]
fn test_config_validation_error() {
    let error = Error::ConfigValidation("evaluation 'bleu' is unknown".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Invalid experiment config"));
    assert!(error_str.contains("bleu"));
    assert!(error_str.contains("No records were processed"));
}

#[test]
fn test_missing_variable_error() {
    let error = Error::MissingVariable {
        variable: "role".to_string(),
        record_id: "r7".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("Missing template variable 'role'"));
    assert!(error_str.contains("'r7'"));
}

#[test]
fn test_missing_column_error() {
    let error = Error::MissingColumn {
        column: "expected".to_string(),
        record_id: "r2".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("Missing column 'expected'"));
    assert!(error_str.contains("'r2'"));
}

#[test]
fn test_inference_error_keeps_source() {
    let error = Error::Inference {
        record_id: "r1".to_string(),
        source: anyhow::anyhow!("connection refused"),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("Inference failed for dataset record 'r1'"));
    assert!(error_str.contains("connection refused"));
    assert!(error.source().is_some());
}

#[test]
fn test_evaluation_error() {
    let error = Error::Evaluation {
        metric: "semantic_similarity".to_string(),
        record_id: "r4".to_string(),
        source: anyhow::anyhow!("zero vector"),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("Evaluation 'semantic_similarity' failed"));
    assert!(error_str.contains("'r4'"));
    assert!(error_str.contains("zero vector"));
}

#[test]
fn test_asset_not_found_error() {
    let error = Error::AssetNotFound {
        name: "qa".to_string(),
        version: 3,
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("Asset not found"));
    assert!(error_str.contains("qa"));
    assert!(error_str.contains("version 3"));
}

#[test]
fn test_dataset_error() {
    let error = Error::Dataset("line 3: expected value".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Dataset error"));
    assert!(error_str.contains("line 3"));
}

#[test]
fn test_recorder_error() {
    let error = Error::Recorder("experiment 'x' is already recorded".to_string());
    assert!(format!("{error}").contains("Recorder error"));
}

#[test]
fn test_task_failed_error() {
    let error = Error::TaskFailed("task panicked".to_string());
    assert!(format!("{error}").contains("Experiment task failed"));
}

#[test]
fn test_json_error_conversion() {
    let json_error = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    let error: Error = json_error.into();
    assert!(matches!(error, Error::Json(_)));
    assert!(format!("{error}").contains("JSON error"));
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "dataset.jsonl");
    let error: Error = io_error.into();
    assert!(matches!(error, Error::Io(_)));
    assert!(format!("{error}").contains("IO error"));
}

#[test]
fn test_record_error_classification() {
    let record_level = Error::MissingColumn {
        column: "c".to_string(),
        record_id: "r".to_string(),
    };
    assert!(record_level.is_record_error());
    assert!(!Error::ConfigValidation("x".to_string()).is_record_error());
    assert!(!Error::Recorder("x".to_string()).is_record_error());
}

#[test]
fn test_error_debug() {
    let error = Error::Dataset("test".to_string());
    let debug_str = format!("{error:?}");
    assert!(debug_str.contains("Dataset"));
}
