//! Prompt template and dataset retrieval
//!
//! The engine reads assets through the [`AssetStore`] trait. Versioning and
//! persistence are owned by the implementation; [`MemoryAssetStore`] is the
//! in-process default.
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use trueno_promptlab::asset::{AssetStore, MemoryAssetStore};
//! use trueno_promptlab::dataset::DatasetRecord;
//!
//! let store = MemoryAssetStore::new();
//! store.register_prompt_template("qa", 1, "You are <role>.", "Answer: <question>");
//! store.register_dataset_records(
//!     "questions",
//!     1,
//!     vec![DatasetRecord::new("r1", [("role", json!("tutor")), ("question", json!("2+2?"))])],
//! );
//!
//! let template = store.fetch_prompt_template("qa", 1)?;
//! assert_eq!(template.variables().len(), 2);
//! assert_eq!(store.fetch_dataset("questions", 1)?.len(), 1);
//! # Ok::<(), trueno_promptlab::Error>(())
//! ```

mod memory;

pub use memory::MemoryAssetStore;

use std::path::{Path, PathBuf};

use crate::dataset::{self, DatasetRecord};
use crate::template::PromptTemplate;
use crate::Result;

/// Read side of the asset store.
pub trait AssetStore: Send + Sync {
    /// Fetch a prompt template by name and version.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::AssetNotFound`] for an unknown asset.
    fn fetch_prompt_template(&self, name: &str, version: u32) -> Result<PromptTemplate>;

    /// Resolve the file path of a dataset version.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::AssetNotFound`] for an unknown asset.
    fn fetch_dataset_path(&self, name: &str, version: u32) -> Result<PathBuf>;

    /// Load the records stored at a dataset path.
    ///
    /// Defaults to reading a JSON Lines file.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] or [`crate::Error::Dataset`].
    fn load_dataset(&self, path: &Path) -> Result<Vec<DatasetRecord>> {
        dataset::load_jsonl(path)
    }

    /// Fetch and load a dataset version.
    ///
    /// # Errors
    ///
    /// Propagates errors of [`fetch_dataset_path`](Self::fetch_dataset_path)
    /// and [`load_dataset`](Self::load_dataset).
    fn fetch_dataset(&self, name: &str, version: u32) -> Result<Vec<DatasetRecord>> {
        let path = self.fetch_dataset_path(name, version)?;
        self.load_dataset(&path)
    }
}
