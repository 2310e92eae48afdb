//! Backing data sources.
//!
//! A field bound to a path reads and writes through a [`DataSource`] instead of
//! holding a local value. Persistence is the source's business; the pipeline
//! only forwards committed values.

use crate::error::{BindError, Result};
use crate::value::Value;
use std::collections::HashMap;

pub trait DataSource {
    /// `Ok(None)` when nothing is stored under `path`.
    fn read(&self, path: &str) -> Result<Option<Value>>;

    fn write(&mut self, path: &str, value: Value) -> Result<()>;
}

/// Map-backed source, also handy in tests.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    values: HashMap<String, Value>,
    read_only: Vec<String>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: impl Into<String>, value: Value) -> Self {
        self.values.insert(path.into(), value);
        self
    }

    /// Writes to `path` fail with [`BindError::Source`].
    pub fn lock(mut self, path: impl Into<String>) -> Self {
        self.read_only.push(path.into());
        self
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.values.get(path)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl DataSource for InMemorySource {
    fn read(&self, path: &str) -> Result<Option<Value>> {
        Ok(self.values.get(path).cloned())
    }

    fn write(&mut self, path: &str, value: Value) -> Result<()> {
        if self.read_only.iter().any(|p| p == path) {
            return Err(BindError::Source(format!("{} is read-only", path)));
        }
        self.values.insert(path.to_string(), value);
        Ok(())
    }
}
