// [libs/infra/store/src/repositories/event.rs]
use super::decode::{enum_from_db, enum_to_db, parse_json_value, parse_ts};
use crate::errors::StoreError;
use crate::Store;
use chrono::{DateTime, Utc};
use fleet_models::{Event, EventType};
use libsql::params;
use tracing::instrument;

pub struct EventRepository {
    store: Store,
}

impl EventRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    const COLUMNS: &'static str = "id, timestamp, event_type, source, message, data";

    fn from_row(row: &libsql::Row) -> Result<Event, StoreError> {
        let timestamp: String = row.get(1)?;
        let event_type: String = row.get(2)?;
        let data: Option<String> = row.get(5)?;
        Ok(Event {
            id: row.get(0)?,
            timestamp: parse_ts(&timestamp)?,
            event_type: enum_from_db::<EventType>(&event_type)?,
            source: row.get(3)?,
            message: row.get(4)?,
            data: parse_json_value(data),
        })
    }

    #[instrument(skip(self, event))]
    pub async fn insert(&self, event: &Event) -> Result<i64, StoreError> {
        let conn = self.store.connection()?;
        conn.execute(
            "INSERT INTO events (timestamp, event_type, source, message, data) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                super::decode::fmt_ts(event.timestamp),
                enum_to_db(&event.event_type),
                event.source.clone(),
                event.message.clone(),
                event.data.as_ref().map(|v| v.to_string()),
            ],
        )
        .await?;
        Ok(conn.last_insert_rowid())
    }

    #[instrument(skip(self))]
    pub async fn recent(&self, limit: i64) -> Result<Vec<Event>, StoreError> {
        let conn = self.store.connection()?;
        let sql = format!(
            "SELECT {} FROM events ORDER BY timestamp DESC LIMIT ?1",
            Self::COLUMNS
        );
        let mut rows = conn.query(&sql, params![limit]).await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::from_row(&row)?);
        }
        Ok(out)
    }

    #[instrument(skip(self))]
    pub async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let conn = self.store.connection()?;
        conn.execute(
            "DELETE FROM events WHERE timestamp < ?1",
            params![super::decode::fmt_ts(cutoff)],
        )
        .await
        .map_err(StoreError::from)
    }

    /// Operator-triggered full wipe of the event trail — distinct from the
    /// rolling 30-day purge job.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<u64, StoreError> {
        let conn = self.store.connection()?;
        conn.execute("DELETE FROM events", ()).await.map_err(StoreError::from)
    }
}
