//! In-memory result recorder using `DashMap`.
//!
//! Data is lost on process restart.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{ExperimentRecord, ResultRecorder};
use crate::config::ExperimentConfig;
use crate::experiment::{ExperimentResultRow, ResultBatch};
use crate::{Error, Result};

struct RecordedRun {
    record: ExperimentRecord,
    rows: Vec<ExperimentResultRow>,
}

/// In-memory store for recorded experiments.
///
/// ## Design
///
/// Runs are keyed by experiment ID. A batch is inserted as a unit, so readers
/// never observe a partially recorded run. Rows keep dataset order.
#[derive(Default)]
pub struct MemoryRecorder {
    runs: DashMap<String, RecordedRun>,
}

impl MemoryRecorder {
    /// Create a new empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Get the number of recorded experiments.
    #[must_use]
    pub fn experiment_count(&self) -> usize {
        self.runs.len()
    }

    /// Get the total number of recorded rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.runs.iter().map(|run| run.rows.len()).sum()
    }

    /// Get an experiment record by ID.
    #[must_use]
    pub fn get_experiment(&self, experiment_id: &str) -> Option<ExperimentRecord> {
        self.runs.get(experiment_id).map(|run| run.record.clone())
    }

    /// Get all experiment records, oldest first.
    #[must_use]
    pub fn experiments(&self) -> Vec<ExperimentRecord> {
        let mut records: Vec<ExperimentRecord> =
            self.runs.iter().map(|run| run.record.clone()).collect();
        records.sort_by_key(ExperimentRecord::created_at);
        records
    }

    /// Get the rows of one experiment, in dataset order.
    ///
    /// Returns an empty vector for an unknown experiment.
    #[must_use]
    pub fn rows_for_experiment(&self, experiment_id: &str) -> Vec<ExperimentResultRow> {
        self.runs
            .get(experiment_id)
            .map(|run| run.rows.clone())
            .unwrap_or_default()
    }

    /// Get every recorded row for one dataset record, across experiments.
    #[must_use]
    pub fn rows_for_record(&self, dataset_record_id: &str) -> Vec<ExperimentResultRow> {
        let mut rows: Vec<ExperimentResultRow> = self
            .runs
            .iter()
            .flat_map(|run| {
                run.rows
                    .iter()
                    .filter(|row| row.dataset_record_id() == dataset_record_id)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        rows.sort_by_key(ExperimentResultRow::created_at);
        rows
    }
}

impl ResultRecorder for MemoryRecorder {
    fn record(&self, config: &ExperimentConfig, batch: &ResultBatch) -> Result<()> {
        if let Some(row) = batch
            .rows()
            .iter()
            .find(|row| row.experiment_id() != batch.experiment_id())
        {
            return Err(Error::Recorder(format!(
                "row for record '{}' belongs to experiment '{}', not '{}'",
                row.dataset_record_id(),
                row.experiment_id(),
                batch.experiment_id()
            )));
        }

        match self.runs.entry(batch.experiment_id().to_string()) {
            Entry::Occupied(_) => Err(Error::Recorder(format!(
                "experiment '{}' is already recorded",
                batch.experiment_id()
            ))),
            Entry::Vacant(slot) => {
                slot.insert(RecordedRun {
                    record: ExperimentRecord::from_run(config, batch),
                    rows: batch.rows().to_vec(),
                });
                Ok(())
            }
        }
    }
}
