//! Capability schema registry: category → compiled JSON Schema.

use dashmap::DashMap;
use jsonschema::{Draft, JSONSchema};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("schema for category {0:?} already registered")]
    AlreadyRegistered(String),
    #[error("invalid JSON schema for category {category:?}: {reason}")]
    InvalidSchema { category: String, reason: String },
}

struct Entry {
    schema: JSONSchema,
    original: Value,
}

/// Holds one compiled schema per capability category. Registration is
/// strict by default: a duplicate category is rejected. Non-strict mode
/// allows replacement, for hot-reload scenarios.
pub struct CapabilityRegistry {
    entries: DashMap<String, Entry>,
    strict: bool,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            strict: true,
        }
    }

    pub fn non_strict() -> Self {
        Self {
            entries: DashMap::new(),
            strict: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Categories currently registered, in unspecified order.
    pub fn categories(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }

    pub fn register(&self, category: impl Into<String>, schema: Value) -> Result<(), RegistryError> {
        let category = category.into();
        if self.strict && self.entries.contains_key(&category) {
            return Err(RegistryError::AlreadyRegistered(category));
        }
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema)
            .map_err(|e| RegistryError::InvalidSchema {
                category: category.clone(),
                reason: e.to_string(),
            })?;
        self.entries.insert(
            category,
            Entry {
                schema: compiled,
                original: schema,
            },
        );
        Ok(())
    }

    /// Validate `instance` against the registered schema for `category`.
    /// Returns `None` when no schema is registered for that category —
    /// the caller decides whether that's an error (only when the registry
    /// as a whole is non-empty, per the manifest pipeline's rule).
    pub fn validate(&self, category: &str, instance: &Value) -> Option<Result<(), Vec<String>>> {
        let entry = self.entries.get(category)?;
        let result = entry.schema.validate(instance);
        Some(match result {
            Ok(()) => Ok(()),
            Err(errors) => Err(errors.map(|e| e.to_string()).collect()),
        })
    }

    pub fn original_schema(&self, category: &str) -> Option<Value> {
        self.entries.get(category).map(|e| e.original.clone())
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
