//! Keyword data passed alongside every send.

use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// A keyword argument a receiver needed was not supplied by the producer.
#[derive(Debug, Error)]
#[error("missing keyword argument '{name}'")]
pub struct MissingArgument {
    pub name: String,
}

/// Named event data, kept sorted by name so iteration is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Kwargs {
    values: BTreeMap<String, Value>,
}

impl Kwargs {
    pub fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Like [`Kwargs::get`], but a missing argument is an error receivers can `?`.
    pub fn require(&self, name: &str) -> Result<&Value, MissingArgument> {
        self.values.get(name).ok_or_else(|| MissingArgument {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
