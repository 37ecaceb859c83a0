// [libs/infra/store/src/repositories/decode.rs]
//! Small helpers shared by every repository: libsql rows only carry SQLite's
//! native types, so timestamps and opaque blobs are stored as TEXT and
//! decoded here consistently rather than ad-hoc in each repository.

use crate::errors::StoreError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub fn parse_ts(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Decode(format!("bad timestamp {raw:?}: {e}")))
}

pub fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

pub fn parse_json_map<T: DeserializeOwned + Default>(raw: &str) -> T {
    serde_json::from_str(raw).unwrap_or_default()
}

pub fn parse_json_value(raw: Option<String>) -> Option<Value> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
}

pub fn to_json_string<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

/// Stores a plain (non-newtype) enum as its serde snake_case string, e.g.
/// `StrategyType::RoundRobin` -> `round_robin`. Not used for `MinerFamily`
/// (see `MinerFamily::as_db_str`) or `TargetMode` (see `TargetMode::to_db_str`),
/// both of which need a storage form that diverges from their wire form.
pub fn enum_to_db<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

pub fn enum_from_db<T: DeserializeOwned>(raw: &str) -> Result<T, StoreError> {
    serde_json::from_value(Value::String(raw.to_string()))
        .map_err(|e| StoreError::Decode(format!("bad enum value {raw:?}: {e}")))
}
