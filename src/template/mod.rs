//! Prompt templates and variable substitution
//!
//! A template is a system prompt and a user prompt containing placeholders
//! of the form `<name>`. The variable set is always derived from the two
//! prompt strings, never stored on its own.
//!
//! ## Substitution
//!
//! ```rust
//! use serde_json::json;
//! use trueno_promptlab::dataset::DatasetRecord;
//! use trueno_promptlab::template::PromptTemplate;
//!
//! let template = PromptTemplate::new("You are <role>.", "Answer: <question>");
//! let record = DatasetRecord::new("r1", [("role", json!("tutor")), ("question", json!("2+2?"))]);
//!
//! let rendered = template.substitute(&record)?;
//! assert_eq!(rendered.system_prompt, "You are <tutor>.");
//! assert_eq!(rendered.user_prompt, "Answer: <2+2?>");
//! # Ok::<(), trueno_promptlab::Error>(())
//! ```
//!
//! Values keep the `<`/`>` delimiters around them. Replacement is a single
//! pass, so a value that itself looks like a placeholder is never expanded.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::dataset::{value_text, DatasetRecord};
use crate::{Error, Result};

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"<([A-Za-z_][A-Za-z0-9_]*)>").expect("placeholder pattern is valid")
    })
}

/// Stored form of a prompt template asset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptTemplateAsset {
    /// System prompt text
    pub system_prompt: String,
    /// User prompt text
    pub user_prompt: String,
}

/// Prompt template with its derived variable set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "PromptTemplateAsset", into = "PromptTemplateAsset")]
pub struct PromptTemplate {
    system_prompt: String,
    user_prompt: String,
    variables: BTreeSet<String>,
}

/// System and user prompts after substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    /// Substituted system prompt
    pub system_prompt: String,
    /// Substituted user prompt
    pub user_prompt: String,
}

impl PromptTemplate {
    /// Create a template, deriving its variables from both prompts.
    #[must_use]
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        let system_prompt = system_prompt.into();
        let user_prompt = user_prompt.into();
        let variables = placeholders(&system_prompt)
            .chain(placeholders(&user_prompt))
            .map(str::to_string)
            .collect();
        Self {
            system_prompt,
            user_prompt,
            variables,
        }
    }

    /// Parse a stored template asset (`{"system_prompt": .., "user_prompt": ..}`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the payload is not a valid template asset.
    pub fn from_asset_json(payload: &[u8]) -> Result<Self> {
        let asset: PromptTemplateAsset = serde_json::from_slice(payload)?;
        Ok(asset.into())
    }

    /// Get the system prompt text.
    #[must_use]
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Get the user prompt text.
    #[must_use]
    pub fn user_prompt(&self) -> &str {
        &self.user_prompt
    }

    /// Get the variable names referenced by either prompt.
    #[must_use]
    pub const fn variables(&self) -> &BTreeSet<String> {
        &self.variables
    }

    /// Check whether both prompts are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.system_prompt.is_empty() && self.user_prompt.is_empty()
    }

    /// Bind a dataset record's values into both prompts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingVariable`] naming the first (in name order)
    /// variable the record does not provide.
    pub fn substitute(&self, record: &DatasetRecord) -> Result<RenderedPrompt> {
        if let Some(missing) = self.variables.iter().find(|v| !record.contains(v)) {
            return Err(Error::MissingVariable {
                variable: missing.clone(),
                record_id: record.id().to_string(),
            });
        }

        Ok(RenderedPrompt {
            system_prompt: self.render(&self.system_prompt, record),
            user_prompt: self.render(&self.user_prompt, record),
        })
    }

    fn render(&self, text: &str, record: &DatasetRecord) -> String {
        let rendered: Cow<'_, str> =
            placeholder_regex().replace_all(text, |caps: &Captures<'_>| {
                let name = &caps[1];
                match record.get(name) {
                    Some(value) if self.variables.contains(name) => {
                        format!("<{}>", value_text(value))
                    }
                    _ => caps[0].to_string(),
                }
            });
        rendered.into_owned()
    }
}

impl From<PromptTemplateAsset> for PromptTemplate {
    fn from(asset: PromptTemplateAsset) -> Self {
        Self::new(asset.system_prompt, asset.user_prompt)
    }
}

impl From<PromptTemplate> for PromptTemplateAsset {
    fn from(template: PromptTemplate) -> Self {
        Self {
            system_prompt: template.system_prompt,
            user_prompt: template.user_prompt,
        }
    }
}

fn placeholders(text: &str) -> impl Iterator<Item = &str> {
    placeholder_regex()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> DatasetRecord {
        DatasetRecord::new(
            "r1",
            [
                ("role", json!("tutor")),
                ("question", json!("2+2?")),
                ("count", json!(3)),
            ],
        )
    }

    #[test]
    fn test_variables_derived_from_both_prompts() {
        let template = PromptTemplate::new("You are <role>.", "Answer: <question> <role>");
        let vars: Vec<&str> = template.variables().iter().map(String::as_str).collect();
        assert_eq!(vars, vec!["question", "role"]);
    }

    #[test]
    fn test_no_placeholders() {
        let template = PromptTemplate::new("plain", "text with a < b > c");
        assert!(template.variables().is_empty());
        let rendered = template.substitute(&record()).unwrap();
        assert_eq!(rendered.user_prompt, "text with a < b > c");
    }

    #[test]
    fn test_substitute_wraps_values_in_delimiters() {
        let template = PromptTemplate::new("You are <role>.", "Answer: <question>");
        let rendered = template.substitute(&record()).unwrap();
        assert_eq!(rendered.system_prompt, "You are <tutor>.");
        assert_eq!(rendered.user_prompt, "Answer: <2+2?>");
    }

    #[test]
    fn test_substitute_every_occurrence() {
        let template = PromptTemplate::new("", "<count> and <count>");
        let rendered = template.substitute(&record()).unwrap();
        assert_eq!(rendered.user_prompt, "<3> and <3>");
    }

    #[test]
    fn test_missing_variable() {
        let template = PromptTemplate::new("<persona>", "<question>");
        let err = template.substitute(&record()).unwrap_err();
        match err {
            Error::MissingVariable {
                variable,
                record_id,
            } => {
                assert_eq!(variable, "persona");
                assert_eq!(record_id, "r1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_inserted_values_not_rescanned() {
        let template = PromptTemplate::new("", "<a> <b>");
        let record = DatasetRecord::new("x", [("a", json!("<b>")), ("b", json!("B"))]);
        let rendered = template.substitute(&record).unwrap();
        assert_eq!(rendered.user_prompt, "<<b>> <B>");
    }

    #[test]
    fn test_from_asset_json() {
        let payload = br#"{"system_prompt": "S <x>", "user_prompt": "U"}"#;
        let template = PromptTemplate::from_asset_json(payload).unwrap();
        assert_eq!(template.system_prompt(), "S <x>");
        assert!(template.variables().contains("x"));
    }

    #[test]
    fn test_serde_rederives_variables() {
        let template = PromptTemplate::new("<a>", "<b>");
        let json = serde_json::to_string(&template).unwrap();
        assert!(!json.contains("variables"));
        let back: PromptTemplate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, template);
    }
}
