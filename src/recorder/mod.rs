//! Result recording
//!
//! The engine's only write-side dependency is [`ResultRecorder`]. It is called
//! once per successful run with the complete batch, never with a partial one.
//!
//! ## Schema Overview
//!
//! ```text
//! ExperimentRecord (1) ──< ExperimentResultRow (N)   [joined on experiment_id]
//! ```

mod experiment_record;
mod memory;

pub use experiment_record::ExperimentRecord;
pub use memory::MemoryRecorder;

use crate::config::ExperimentConfig;
use crate::experiment::ResultBatch;
use crate::Result;

/// Durable sink for experiment results.
pub trait ResultRecorder: Send + Sync {
    /// Persist a complete run.
    ///
    /// The batch is durable once this returns `Ok`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Recorder`] if the batch cannot be stored.
    fn record(&self, config: &ExperimentConfig, batch: &ResultBatch) -> Result<()>;
}
