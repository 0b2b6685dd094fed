//! Model registry - maps user-facing model codes to provider model ids

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Provider model used for any code the registry does not know
pub const DEFAULT_PROVIDER_MODEL: &str = "gpt-4o";

/// One selectable model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelEntry {
    /// Short code used in callback payloads and sessions
    pub code: String,
    /// Label shown in the model menu
    pub display_name: String,
    /// Identifier sent to the completion API
    pub provider_model: String,
}

/// Registry of selectable models
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    entries: Vec<ModelEntry>,
    fallback: String,
}

impl ModelRegistry {
    /// Create a registry with the built-in models
    pub fn new() -> Self {
        Self {
            entries: Self::default_entries(),
            fallback: DEFAULT_PROVIDER_MODEL.to_string(),
        }
    }

    /// Replace provider ids for the given codes. Unknown codes are ignored.
    pub fn with_overrides(mut self, overrides: &HashMap<String, String>) -> Self {
        for entry in &mut self.entries {
            if let Some(model) = overrides.get(&entry.code) {
                if !model.trim().is_empty() {
                    entry.provider_model = model.clone();
                }
            }
        }
        self
    }

    /// All entries in menu order
    pub fn entries(&self) -> &[ModelEntry] {
        &self.entries
    }

    /// Look up an entry by code
    pub fn get(&self, code: &str) -> Option<&ModelEntry> {
        self.entries.iter().find(|entry| entry.code == code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    /// Provider model id for a code. Never fails: unknown codes get the fallback.
    pub fn resolve(&self, code: &str) -> &str {
        self.get(code)
            .map(|entry| entry.provider_model.as_str())
            .unwrap_or(&self.fallback)
    }

    /// Menu label for a code, or the raw code when unknown
    pub fn display_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.get(code)
            .map(|entry| entry.display_name.as_str())
            .unwrap_or(code)
    }

    /// Provider id used for unrecognized codes
    pub fn fallback_model(&self) -> &str {
        &self.fallback
    }

    fn default_entries() -> Vec<ModelEntry> {
        let yaml = include_str!("models.yaml");
        serde_yaml::from_str(yaml).expect("Failed to parse built-in model table")
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
