//! In-memory asset store using `DashMap`.
//!
//! Data is lost on process restart. Datasets may either point at JSONL files
//! or be held inline, addressed by a synthetic `memory://name/version` path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;

use super::AssetStore;
use crate::dataset::DatasetRecord;
use crate::template::PromptTemplate;
use crate::{Error, Result};

const MEMORY_SCHEME: &str = "memory://";

/// In-memory asset store, safe to share across threads.
pub struct MemoryAssetStore {
    templates: DashMap<(String, u32), PromptTemplate>,
    dataset_paths: DashMap<(String, u32), PathBuf>,
    inline_datasets: DashMap<PathBuf, Arc<Vec<DatasetRecord>>>,
}

impl MemoryAssetStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            templates: DashMap::new(),
            dataset_paths: DashMap::new(),
            inline_datasets: DashMap::new(),
        }
    }

    /// Register (or replace) a prompt template version.
    pub fn register_prompt_template(
        &self,
        name: impl Into<String>,
        version: u32,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) {
        self.templates.insert(
            (name.into(), version),
            PromptTemplate::new(system_prompt, user_prompt),
        );
    }

    /// Register a prompt template from its stored JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the payload is not a template asset.
    pub fn register_prompt_template_json(
        &self,
        name: impl Into<String>,
        version: u32,
        payload: &[u8],
    ) -> Result<()> {
        let template = PromptTemplate::from_asset_json(payload)?;
        self.templates.insert((name.into(), version), template);
        Ok(())
    }

    /// Register a dataset version stored as a JSONL file.
    pub fn register_dataset_path(
        &self,
        name: impl Into<String>,
        version: u32,
        path: impl Into<PathBuf>,
    ) {
        self.dataset_paths.insert((name.into(), version), path.into());
    }

    /// Register a dataset version held in memory.
    pub fn register_dataset_records(
        &self,
        name: impl Into<String>,
        version: u32,
        records: Vec<DatasetRecord>,
    ) {
        let name = name.into();
        let path = PathBuf::from(format!("{MEMORY_SCHEME}{name}/{version}"));
        self.inline_datasets.insert(path.clone(), Arc::new(records));
        self.dataset_paths.insert((name, version), path);
    }

    /// Highest registered version of a prompt template or dataset.
    #[must_use]
    pub fn latest_version(&self, name: &str) -> Option<u32> {
        let templates = self.templates.iter().map(|e| (e.key().0.clone(), e.key().1));
        let datasets = self.dataset_paths.iter().map(|e| (e.key().0.clone(), e.key().1));
        templates
            .chain(datasets)
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v)
            .max()
    }

    /// Number of registered templates and datasets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len() + self.dataset_paths.len()
    }

    /// Check whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty() && self.dataset_paths.is_empty()
    }
}

impl Default for MemoryAssetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetStore for MemoryAssetStore {
    fn fetch_prompt_template(&self, name: &str, version: u32) -> Result<PromptTemplate> {
        self.templates
            .get(&(name.to_string(), version))
            .map(|t| t.value().clone())
            .ok_or_else(|| Error::AssetNotFound {
                name: name.to_string(),
                version,
            })
    }

    fn fetch_dataset_path(&self, name: &str, version: u32) -> Result<PathBuf> {
        self.dataset_paths
            .get(&(name.to_string(), version))
            .map(|p| p.value().clone())
            .ok_or_else(|| Error::AssetNotFound {
                name: name.to_string(),
                version,
            })
    }

    fn load_dataset(&self, path: &Path) -> Result<Vec<DatasetRecord>> {
        if let Some(records) = self.inline_datasets.get(path) {
            return Ok(records.value().as_ref().clone());
        }
        crate::dataset::load_jsonl(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fetch_prompt_template() {
        let store = MemoryAssetStore::new();
        store.register_prompt_template("qa", 1, "S", "U <q>");

        let template = store.fetch_prompt_template("qa", 1).unwrap();
        assert_eq!(template.user_prompt(), "U <q>");
    }

    #[test]
    fn test_unknown_template_version() {
        let store = MemoryAssetStore::new();
        store.register_prompt_template("qa", 1, "S", "U");

        let err = store.fetch_prompt_template("qa", 2).unwrap_err();
        assert!(matches!(err, Error::AssetNotFound { version: 2, .. }));
    }

    #[test]
    fn test_inline_dataset_round_trip() {
        let store = MemoryAssetStore::new();
        let records = vec![
            DatasetRecord::new("a", [("x", json!(1))]),
            DatasetRecord::new("b", [("x", json!(2))]),
        ];
        store.register_dataset_records("ds", 3, records.clone());

        let path = store.fetch_dataset_path("ds", 3).unwrap();
        assert_eq!(path, PathBuf::from("memory://ds/3"));
        assert_eq!(store.fetch_dataset("ds", 3).unwrap(), records);
    }

    #[test]
    fn test_dataset_path_missing_file() {
        let store = MemoryAssetStore::new();
        store.register_dataset_path("ds", 1, "/nonexistent/ds.jsonl");
        assert!(matches!(store.fetch_dataset("ds", 1), Err(Error::Io(_))));
    }

    #[test]
    fn test_register_template_json() {
        let store = MemoryAssetStore::new();
        store
            .register_prompt_template_json("qa", 1, br#"{"system_prompt": "S", "user_prompt": "<q>"}"#)
            .unwrap();
        assert!(store.register_prompt_template_json("bad", 1, b"{}").is_err());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_latest_version() {
        let store = MemoryAssetStore::default();
        assert!(store.is_empty());
        store.register_prompt_template("qa", 1, "S", "U");
        store.register_prompt_template("qa", 4, "S", "U");
        store.register_prompt_template("other", 9, "S", "U");
        assert_eq!(store.latest_version("qa"), Some(4));
        assert_eq!(store.latest_version("missing"), None);
    }
}
