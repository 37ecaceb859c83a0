// [libs/infra/store/src/repositories/pool_health.rs]
use super::decode::{fmt_ts, parse_ts};
use crate::errors::StoreError;
use crate::Store;
use chrono::{DateTime, Utc};
use fleet_models::PoolHealth;
use libsql::params;
use tracing::instrument;

pub struct PoolHealthRepository {
    store: Store,
}

impl PoolHealthRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    const COLUMNS: &'static str = "pool_id, timestamp, is_reachable, response_time_ms, \
        reject_rate, shares_accepted, shares_rejected, health_score, luck_percentage, error_message";

    fn from_row(row: &libsql::Row) -> Result<PoolHealth, StoreError> {
        let timestamp: String = row.get(1)?;
        let response_time_ms: Option<i64> = row.get(3)?;
        Ok(PoolHealth {
            pool_id: row.get(0)?,
            timestamp: parse_ts(&timestamp)?,
            is_reachable: row.get::<i64>(2)? != 0,
            response_time_ms: response_time_ms.map(|v| v as u64),
            reject_rate: row.get(4)?,
            shares_accepted: row.get(5)?,
            shares_rejected: row.get(6)?,
            health_score: row.get::<i64>(7)? as u8,
            luck_percentage: row.get(8)?,
            error_message: row.get(9)?,
        })
    }

    #[instrument(skip(self, health))]
    pub async fn insert(&self, health: &PoolHealth) -> Result<(), StoreError> {
        let conn = self.store.connection()?;
        conn.execute(
            "INSERT INTO pool_health (pool_id, timestamp, is_reachable, response_time_ms, \
             reject_rate, shares_accepted, shares_rejected, health_score, luck_percentage, \
             error_message) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                health.pool_id,
                fmt_ts(health.timestamp),
                health.is_reachable as i64,
                health.response_time_ms.map(|v| v as i64),
                health.reject_rate,
                health.shares_accepted,
                health.shares_rejected,
                health.health_score as i64,
                health.luck_percentage,
                health.error_message.clone(),
            ],
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn recent_for_pool(&self, pool_id: i64, limit: i64) -> Result<Vec<PoolHealth>, StoreError> {
        let conn = self.store.connection()?;
        let sql = format!(
            "SELECT {} FROM pool_health WHERE pool_id = ?1 ORDER BY timestamp DESC LIMIT ?2",
            Self::COLUMNS
        );
        let mut rows = conn.query(&sql, params![pool_id, limit]).await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::from_row(&row)?);
        }
        Ok(out)
    }

    #[instrument(skip(self))]
    pub async fn recent_since(&self, pool_id: i64, since: DateTime<Utc>) -> Result<Vec<PoolHealth>, StoreError> {
        let conn = self.store.connection()?;
        let sql = format!(
            "SELECT {} FROM pool_health WHERE pool_id = ?1 AND timestamp >= ?2 ORDER BY timestamp",
            Self::COLUMNS
        );
        let mut rows = conn.query(&sql, params![pool_id, fmt_ts(since)]).await?;
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
            "DELETE FROM pool_health WHERE timestamp < ?1",
            params![fmt_ts(cutoff)],
        )
        .await
        .map_err(StoreError::from)
    }
}
