// [libs/infra/store/src/repositories/audit.rs]
use super::decode::{fmt_ts, parse_json_value, parse_ts};
use crate::errors::StoreError;
use crate::Store;
use fleet_models::AuditLog;
use libsql::params;
use tracing::instrument;

pub struct AuditRepository {
    store: Store,
}

impl AuditRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Convenience wrapper over `insert` for the common case of a mutation
    /// recorded at the moment it happens, rather than replayed from a
    /// fully-constructed `AuditLog`.
    #[instrument(skip(self, changes))]
    pub async fn log_audit(
        &self,
        actor: &str,
        action: &str,
        resource_type: &str,
        resource_id: Option<i64>,
        resource_name: Option<&str>,
        changes: Option<serde_json::Value>,
        status: &str,
        error_message: Option<&str>,
    ) -> Result<i64, StoreError> {
        self.insert(&AuditLog {
            id: 0,
            timestamp: chrono::Utc::now(),
            actor: actor.to_string(),
            action: action.to_string(),
            resource_type: resource_type.to_string(),
            resource_id,
            resource_name: resource_name.map(str::to_string),
            changes,
            status: status.to_string(),
            error_message: error_message.map(str::to_string),
        })
        .await
    }

    #[instrument(skip(self, log))]
    pub async fn insert(&self, log: &AuditLog) -> Result<i64, StoreError> {
        let conn = self.store.connection()?;
        conn.execute(
            "INSERT INTO audit_log (timestamp, actor, action, resource_type, resource_id, \
             resource_name, changes, status, error_message) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                fmt_ts(log.timestamp),
                log.actor.clone(),
                log.action.clone(),
                log.resource_type.clone(),
                log.resource_id,
                log.resource_name.clone(),
                log.changes.as_ref().map(|v| v.to_string()),
                log.status.clone(),
                log.error_message.clone(),
            ],
        )
        .await?;
        Ok(conn.last_insert_rowid())
    }

    #[instrument(skip(self))]
    pub async fn recent(&self, limit: i64) -> Result<Vec<AuditLog>, StoreError> {
        let conn = self.store.connection()?;
        let mut rows = conn
            .query(
                "SELECT id, timestamp, actor, action, resource_type, resource_id, \
                 resource_name, changes, status, error_message FROM audit_log \
                 ORDER BY timestamp DESC LIMIT ?1",
                params![limit],
            )
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            let timestamp: String = row.get(1)?;
            let changes: Option<String> = row.get(7)?;
            out.push(AuditLog {
                id: row.get(0)?,
                timestamp: parse_ts(&timestamp)?,
                actor: row.get(2)?,
                action: row.get(3)?,
                resource_type: row.get(4)?,
                resource_id: row.get(5)?,
                resource_name: row.get(6)?,
                changes: parse_json_value(changes),
                status: row.get(8)?,
                error_message: row.get(9)?,
            });
        }
        Ok(out)
    }
}
