// src/config.rs
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ConfigError;

/// Nested key/value configuration queried by `:`-separated paths,
/// e.g. `hubblestack:returner:logstash`.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    root: Value,
}

impl ConfigStore {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    /// Load the store from a YAML or JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        load_file(path).map(Self::new)
    }

    /// Look up a value; `null` counts as absent.
    ///
    /// A literal top-level key (the deprecated flat layout) wins over the
    /// nested walk.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let flat = self.root.as_object().and_then(|m| m.get(key));
        let nested = || {
            key.split(crate::KEY_DELIMITER)
                .try_fold(&self.root, |node, part| node.as_object()?.get(part))
        };
        flat.filter(|v| !v.is_null())
            .or_else(nested)
            .filter(|v| !v.is_null())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }
}

/// Read a YAML (or JSON) file into any deserializable shape.
pub fn load_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
