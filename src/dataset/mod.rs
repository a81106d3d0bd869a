//! Dataset records and JSONL loading
//!
//! A dataset is an ordered list of [`DatasetRecord`]s. Record order is the
//! order results are emitted in, for every execution strategy.
//!
//! ## File Format
//!
//! Datasets are stored as JSON Lines: one JSON object per line, each carrying
//! an `id` field (string or integer). Blank lines are skipped.
//!
//! ```text
//! {"id": "r1", "question": "2+2?", "answer": "4"}
//! {"id": "r2", "question": "3+3?", "answer": "6"}
//! ```

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Field holding the per-record identifier.
pub const ID_FIELD: &str = "id";

/// One input row of a dataset.
///
/// The `id` is extracted once at construction; `fields` still contains the
/// original `id` entry so templates and column mappings can reference it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetRecord {
    id: String,
    fields: Map<String, Value>,
}

impl DatasetRecord {
    /// Create a record from a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dataset`] if the value is not an object or lacks a
    /// string/integer `id` field.
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(fields) = value else {
            return Err(Error::Dataset(format!(
                "dataset record must be a JSON object, got: {value}"
            )));
        };

        let id = match fields.get(ID_FIELD) {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            Some(other) => {
                return Err(Error::Dataset(format!(
                    "dataset record id must be a string or number, got: {other}"
                )))
            }
            None => {
                return Err(Error::Dataset(format!(
                    "dataset record has no '{ID_FIELD}' field"
                )))
            }
        };

        Ok(Self { id, fields })
    }

    /// Create a record from an id and `(field, value)` pairs.
    ///
    /// The id is also inserted as the `id` field.
    #[must_use]
    pub fn new<I, K>(id: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let id = id.into();
        let mut map = Map::new();
        map.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        for (key, value) in fields {
            map.insert(key.into(), value);
        }
        Self { id, fields: map }
    }

    /// Get the record ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get a field value by name.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Check whether the record has a field.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Get all fields, including `id`.
    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// Render a field value as prompt/evaluator text.
///
/// Strings are used verbatim; every other JSON value uses its JSON text.
#[must_use]
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse JSON Lines text into dataset records.
///
/// # Errors
///
/// Returns [`Error::Dataset`] on malformed lines, records without an id, or
/// duplicate ids.
pub fn parse_jsonl(text: &str) -> Result<Vec<DatasetRecord>> {
    let mut records = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        if let Some(record) = parse_line(line, line_no + 1)? {
            records.push(record);
        }
    }
    ensure_unique_ids(&records)?;
    Ok(records)
}

/// Load a JSON Lines dataset file.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read, otherwise the errors of
/// [`parse_jsonl`].
pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Vec<DatasetRecord>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);

    let mut records = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        if let Some(record) = parse_line(&line?, line_no + 1)? {
            records.push(record);
        }
    }
    ensure_unique_ids(&records)?;

    tracing::debug!(path = %path.display(), records = records.len(), "loaded dataset");
    Ok(records)
}

fn parse_line(line: &str, line_no: usize) -> Result<Option<DatasetRecord>> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    let value: Value = serde_json::from_str(line)
        .map_err(|e| Error::Dataset(format!("line {line_no}: {e}")))?;
    DatasetRecord::from_json(value)
        .map(Some)
        .map_err(|e| Error::Dataset(format!("line {line_no}: {e}")))
}

/// Check that no two records share an id.
///
/// # Errors
///
/// Returns [`Error::Dataset`] naming the first duplicated id.
pub fn ensure_unique_ids(records: &[DatasetRecord]) -> Result<()> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.id()) {
            return Err(Error::Dataset(format!(
                "duplicate dataset record id '{}'",
                record.id()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_from_json_string_id() {
        let record = DatasetRecord::from_json(json!({"id": "r1", "q": "2+2?"})).unwrap();
        assert_eq!(record.id(), "r1");
        assert_eq!(record.get("q"), Some(&json!("2+2?")));
        assert!(record.contains("id"));
    }

    #[test]
    fn test_record_from_json_numeric_id() {
        let record = DatasetRecord::from_json(json!({"id": 7})).unwrap();
        assert_eq!(record.id(), "7");
    }

    #[test]
    fn test_record_without_id_rejected() {
        let err = DatasetRecord::from_json(json!({"q": "x"})).unwrap_err();
        assert!(err.to_string().contains("no 'id' field"));
    }

    #[test]
    fn test_record_non_object_rejected() {
        assert!(DatasetRecord::from_json(json!([1, 2])).is_err());
    }

    #[test]
    fn test_parse_jsonl_skips_blank_lines() {
        let text = "{\"id\": \"a\", \"x\": 1}\n\n{\"id\": \"b\", \"x\": 2}\n";
        let records = parse_jsonl(text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id(), "a");
        assert_eq!(records[1].id(), "b");
    }

    #[test]
    fn test_parse_jsonl_reports_line() {
        let err = parse_jsonl("{\"id\": \"a\"}\nnot json\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_jsonl_duplicate_ids() {
        let err = parse_jsonl("{\"id\": \"a\"}\n{\"id\": \"a\"}\n").unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_load_jsonl_missing_file() {
        let err = load_jsonl("/nonexistent/dataset.jsonl").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_value_text() {
        assert_eq!(value_text(&json!("tutor")), "tutor");
        assert_eq!(value_text(&json!(3)), "3");
        assert_eq!(value_text(&json!(true)), "true");
    }
}
