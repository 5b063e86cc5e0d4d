//! Admin Session - Explicit access to the remote admin collaborator
//!
//! Concrete steps receive a session when they are built instead of looking
//! one up globally, so they can be tested against an in-memory registry.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Lookups a step may perform while validating or refreshing its view
pub trait AdminSession {
    /// Whether an entity of `kind` named `name` already exists
    fn entity_exists(&self, kind: &str, name: &str) -> Result<bool>;

    /// Names of every entity of `kind`
    fn list_entities(&self, kind: &str) -> Result<Vec<String>>;
}

/// Entity names grouped by kind, e.g. `{ "jms-connection": ["orders"] }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InMemorySession {
    entities: BTreeMap<String, BTreeSet<String>>,
}

impl InMemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a registry from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read entity registry: {}", path.display()))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse entity registry: {}", path.display()))
    }

    pub fn insert(&mut self, kind: impl Into<String>, name: impl Into<String>) {
        self.entities
            .entry(kind.into())
            .or_default()
            .insert(name.into());
    }

    pub fn with_entity(mut self, kind: impl Into<String>, name: impl Into<String>) -> Self {
        self.insert(kind, name);
        self
    }
}

impl AdminSession for InMemorySession {
    fn entity_exists(&self, kind: &str, name: &str) -> Result<bool> {
        Ok(self
            .entities
            .get(kind)
            .is_some_and(|names| names.contains(name)))
    }

    fn list_entities(&self, kind: &str) -> Result<Vec<String>> {
        Ok(self
            .entities
            .get(kind)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default())
    }
}
