//! Error types for trueno-promptlab
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// trueno-promptlab error types
#[derive(Error, Debug)]
pub enum Error {
    /// Experiment configuration is malformed (detected before any record runs)
    #[error("Invalid experiment config: {0}\nNo records were processed; fix the config and rerun")]
    ConfigValidation(String),

    /// A template variable has no value in a dataset record
    #[error("Missing template variable '{variable}' in dataset record '{record_id}'")]
    MissingVariable {
        /// Variable referenced by the prompt template
        variable: String,
        /// Record lacking the variable
        record_id: String,
    },

    /// A column mapping names a field the dataset record does not have
    #[error("Missing column '{column}' in dataset record '{record_id}'")]
    MissingColumn {
        /// Field name from the column mapping
        column: String,
        /// Record lacking the field
        record_id: String,
    },

    /// Inference backend call failed
    #[error("Inference failed for dataset record '{record_id}': {source}")]
    Inference {
        /// Record whose inference failed
        record_id: String,
        /// Backend error
        #[source]
        source: anyhow::Error,
    },

    /// Evaluator failed
    #[error("Evaluation '{metric}' failed for dataset record '{record_id}': {source}")]
    Evaluation {
        /// Metric being evaluated
        metric: String,
        /// Record under evaluation
        record_id: String,
        /// Evaluator error
        #[source]
        source: anyhow::Error,
    },

    /// Prompt template or dataset asset does not exist
    #[error("Asset not found: {name} (version {version})")]
    AssetNotFound {
        /// Asset name
        name: String,
        /// Asset version
        version: u32,
    },

    /// Dataset could not be loaded or is malformed
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Result recorder rejected the batch
    #[error("Recorder error: {0}")]
    Recorder(String),

    /// A concurrent record task panicked or was cancelled
    #[error("Experiment task failed: {0}")]
    TaskFailed(String),

    /// JSON encoding/decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error was raised while processing a single dataset record.
    ///
    /// Record-level errors abort the whole run just like config errors; this is
    /// only a classification for callers deciding what to report.
    #[must_use]
    pub const fn is_record_error(&self) -> bool {
        matches!(
            self,
            Self::MissingVariable { .. }
                | Self::MissingColumn { .. }
                | Self::Inference { .. }
                | Self::Evaluation { .. }
        )
    }
}
