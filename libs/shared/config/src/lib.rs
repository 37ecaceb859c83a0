// [libs/shared/config/src/lib.rs]
//! Process-wide mutable configuration. A single `ConfigStore` is built once
//! at startup from a TOML file and shared (behind an `Arc`) with every
//! component that needs `get`/`set`/`save` — the scheduler, the strategy
//! engines, the adapter layer's integration toggles.
//!
//! Keys are dotted paths (`"octopus_agile.region"`) over a flat map; this
//! keeps `get`/`set` O(1) and sidesteps re-deriving a typed struct for every
//! config surface listed in spec.md §6.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config key not found: {0}")]
    NotFound(String),
    #[error("config value at {key} could not be decoded: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write config file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Default values for every key the control plane consumes (§6). Anything
/// absent from the on-disk file falls back to these at `get` time rather
/// than at load time, so an old config file never needs migrating just to
/// pick up a newly introduced key.
fn defaults() -> BTreeMap<String, serde_json::Value> {
    use serde_json::json;
    BTreeMap::from([
        ("octopus_agile.enabled".to_string(), json!(false)),
        ("octopus_agile.region".to_string(), json!("H")),
        ("energy_optimization.enabled".to_string(), json!(false)),
        ("energy_optimization.price_threshold".to_string(), json!(15.0)),
        ("network_discovery.enabled".to_string(), json!(false)),
        ("network_discovery.networks".to_string(), json!([])),
        ("network_discovery.auto_add".to_string(), json!(false)),
        ("network_discovery.scan_interval_hours".to_string(), json!(24)),
        ("cloud.enabled".to_string(), json!(false)),
        ("cloud.push_interval_minutes".to_string(), json!(15)),
        ("solopool_enabled".to_string(), json!(true)),
        ("braiins_enabled".to_string(), json!(false)),
        ("braiins_api_token".to_string(), json!("")),
        ("supportxmr_enabled".to_string(), json!(false)),
    ])
}

pub struct ConfigStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, serde_json::Value>>,
}

impl ConfigStore {
    /// Loads `path` if it exists, otherwise starts from built-in defaults.
    /// Either way the file is not written until `save()` is called.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let mut values = defaults();

        if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
            let parsed: toml::Value = toml::from_str(&raw)?;
            flatten_into(&parsed, "", &mut values);
            info!(path = %path.display(), "config loaded from disk");
        } else {
            warn!(path = %path.display(), "config file absent, starting from built-in defaults");
        }

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    /// Reads a raw JSON value by dotted key.
    pub fn get_raw(&self, key: &str) -> Option<serde_json::Value> {
        self.values.read().unwrap().get(key).cloned()
    }

    /// Reads and decodes a typed value, falling back to `default` if the key
    /// is absent (it never is, given `defaults()`, but callers may query
    /// keys this process doesn't know about yet).
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.get_raw(key) {
            Some(v) => serde_json::from_value(v).unwrap_or(default),
            None => default,
        }
    }

    pub fn get_required<T: DeserializeOwned>(&self, key: &str) -> Result<T, ConfigError> {
        let raw = self
            .get_raw(key)
            .ok_or_else(|| ConfigError::NotFound(key.to_string()))?;
        serde_json::from_value(raw).map_err(|source| ConfigError::Decode {
            key: key.to_string(),
            source,
        })
    }

    /// Sets a key in memory. Does not touch disk — call `save()` to persist.
    pub fn set<T: Serialize>(&self, key: &str, value: T) -> Result<(), ConfigError> {
        let json = serde_json::to_value(value).map_err(|source| ConfigError::Decode {
            key: key.to_string(),
            source,
        })?;
        self.values.write().unwrap().insert(key.to_string(), json);
        Ok(())
    }

    /// Persists the in-memory map back to the TOML file, rebuilding nested
    /// tables from the flat dotted keys.
    pub fn save(&self) -> Result<(), ConfigError> {
        let values = self.values.read().unwrap();
        let nested = unflatten(&values);
        let rendered = toml::to_string_pretty(&nested)?;
        std::fs::write(&self.path, rendered).map_err(|source| ConfigError::Write {
            path: self.path.display().to_string(),
            source,
        })?;
        info!(path = %self.path.display(), "config saved");
        Ok(())
    }
}

fn flatten_into(value: &toml::Value, prefix: &str, out: &mut BTreeMap<String, serde_json::Value>) {
    match value {
        toml::Value::Table(table) => {
            for (k, v) in table {
                let key = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{prefix}.{k}")
                };
                flatten_into(v, &key, out);
            }
        }
        other => {
            if let Ok(json) = toml_to_json(other) {
                out.insert(prefix.to_string(), json);
            }
        }
    }
}

fn toml_to_json(value: &toml::Value) -> Result<serde_json::Value, toml::ser::Error> {
    // toml and serde_json agree on scalar/array/table shapes closely enough
    // that round-tripping through a string is the simplest faithful bridge.
    let s = toml::to_string(&toml::Value::try_from(
        [("v", value.clone())].into_iter().collect::<toml::Table>(),
    )?)?;
    let wrapper: toml::Value = toml::from_str(&s).unwrap();
    Ok(toml_value_to_json(wrapper.get("v").unwrap()))
}

fn toml_value_to_json(value: &toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s.clone()),
        toml::Value::Integer(i) => serde_json::Value::Number((*i).into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        toml::Value::Boolean(b) => serde_json::Value::Bool(*b),
        toml::Value::Datetime(d) => serde_json::Value::String(d.to_string()),
        toml::Value::Array(a) => serde_json::Value::Array(a.iter().map(toml_value_to_json).collect()),
        toml::Value::Table(t) => serde_json::Value::Object(
            t.iter().map(|(k, v)| (k.clone(), toml_value_to_json(v))).collect(),
        ),
    }
}

fn unflatten(values: &BTreeMap<String, serde_json::Value>) -> toml::Value {
    let mut root = toml::value::Table::new();
    for (key, value) in values {
        let parts: Vec<&str> = key.split('.').collect();
        insert_path(&mut root, &parts, value.clone());
    }
    toml::Value::Table(root)
}

fn insert_path(table: &mut toml::value::Table, parts: &[&str], value: serde_json::Value) {
    if parts.len() == 1 {
        if let Some(tv) = json_to_toml_value(value) {
            table.insert(parts[0].to_string(), tv);
        }
        return;
    }
    let entry = table
        .entry(parts[0].to_string())
        .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));
    if let toml::Value::Table(sub) = entry {
        insert_path(sub, &parts[1..], value);
    }
}

fn json_to_toml_value(value: serde_json::Value) -> Option<toml::Value> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(b) => Some(toml::Value::Boolean(b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(toml::Value::Integer(i))
            } else {
                n.as_f64().map(toml::Value::Float)
            }
        }
        serde_json::Value::String(s) => Some(toml::Value::String(s)),
        serde_json::Value::Array(a) => Some(toml::Value::Array(
            a.into_iter().filter_map(json_to_toml_value).collect(),
        )),
        serde_json::Value::Object(o) => {
            let mut t = toml::value::Table::new();
            for (k, v) in o {
                if let Some(tv) = json_to_toml_value(v) {
                    t.insert(k, tv);
                }
            }
            Some(toml::Value::Table(t))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_are_visible_without_a_file() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::load(dir.path().join("fleet.toml")).unwrap();
        assert_eq!(store.get::<String>("octopus_agile.region", "X".into()), "H");
        assert!(!store.get::<bool>("octopus_agile.enabled", true));
    }

    #[test]
    fn set_then_save_then_reload_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fleet.toml");
        let store = ConfigStore::load(&path).unwrap();
        store.set("octopus_agile.enabled", true).unwrap();
        store.set("octopus_agile.region", "C").unwrap();
        store.save().unwrap();

        let reloaded = ConfigStore::load(&path).unwrap();
        assert!(reloaded.get::<bool>("octopus_agile.enabled", false));
        assert_eq!(reloaded.get::<String>("octopus_agile.region", "".into()), "C");
    }
}
