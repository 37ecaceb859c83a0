// [libs/domain/models/src/event.rs]
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Info,
    Warning,
    Error,
    Alert,
    Success,
}

/// An entry in the operator-facing, append-only event trail (§3). Bounded by
/// the 30-day purge job and by an explicit clear; distinct from the
/// `tracing` process log (see `SPEC_FULL.md` §1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    pub source: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
}
