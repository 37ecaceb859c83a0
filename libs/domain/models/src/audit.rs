// [libs/domain/models/src/audit.rs]
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A before/after change record for anything that mutates declared intent
/// (strategy edits, config sets, band edits). Append-only (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<i64>,
    pub resource_name: Option<String>,
    pub changes: Option<serde_json::Value>,
    pub status: String,
    pub error_message: Option<String>,
}
