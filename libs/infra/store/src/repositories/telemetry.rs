// [libs/infra/store/src/repositories/telemetry.rs]
use super::decode::{enum_from_db, enum_to_db, fmt_ts, parse_json_map, parse_ts};
use crate::errors::StoreError;
use crate::Store;
use fleet_models::{HashrateUnit, Telemetry};
use libsql::params;
use tracing::instrument;

pub struct TelemetryRepository {
    store: Store,
}

impl TelemetryRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    const COLUMNS: &'static str =
        "id, miner_id, timestamp, hashrate, hashrate_unit, temperature, power_watts, \
         shares_accepted, shares_rejected, pool_in_use, data";

    fn from_row(row: &libsql::Row) -> Result<Telemetry, StoreError> {
        let ts: String = row.get(2)?;
        let unit_raw: String = row.get(4)?;
        let data_raw: String = row.get(10)?;
        Ok(Telemetry {
            id: row.get(0)?,
            miner_id: row.get(1)?,
            timestamp: parse_ts(&ts)?,
            hashrate: row.get(3)?,
            hashrate_unit: enum_from_db::<HashrateUnit>(&unit_raw)?,
            temperature: row.get(5)?,
            power_watts: row.get(6)?,
            shares_accepted: row.get(7)?,
            shares_rejected: row.get(8)?,
            pool_in_use: row.get(9)?,
            data: parse_json_map(&data_raw),
        })
    }

    #[instrument(skip(self, telemetry))]
    pub async fn insert(&self, telemetry: &Telemetry) -> Result<i64, StoreError> {
        if !telemetry.is_valid() {
            return Err(StoreError::Decode(
                "refusing to store GH/s telemetry with negative hashrate".into(),
            ));
        }
        let conn = self.store.connection()?;
        conn.execute(
            "INSERT INTO telemetry (miner_id, timestamp, hashrate, hashrate_unit, temperature, \
             power_watts, shares_accepted, shares_rejected, pool_in_use, data) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                telemetry.miner_id,
                fmt_ts(telemetry.timestamp),
                telemetry.hashrate,
                enum_to_db(&telemetry.hashrate_unit),
                telemetry.temperature,
                telemetry.power_watts,
                telemetry.shares_accepted,
                telemetry.shares_rejected,
                telemetry.pool_in_use.clone(),
                super::decode::to_json_string(&telemetry.data),
            ],
        )
        .await?;
        Ok(conn.last_insert_rowid())
    }

    #[instrument(skip(self))]
    pub async fn latest_for_miner(&self, miner_id: i64) -> Result<Option<Telemetry>, StoreError> {
        let conn = self.store.connection()?;
        let sql = format!(
            "SELECT {} FROM telemetry WHERE miner_id = ?1 ORDER BY timestamp DESC LIMIT 1",
            Self::COLUMNS
        );
        let mut rows = conn.query(&sql, params![miner_id]).await?;
        rows.next().await?.map(|r| Self::from_row(&r)).transpose()
    }

    /// Used by the pool-strategy engine to look at a miner's last N polls'
    /// reported pool (§4.6) without loading its entire 30-day history.
    #[instrument(skip(self))]
    pub async fn recent_for_pool(&self, miner_id: i64, limit: i64) -> Result<Vec<Telemetry>, StoreError> {
        let conn = self.store.connection()?;
        let sql = format!(
            "SELECT {} FROM telemetry WHERE miner_id = ?1 ORDER BY timestamp DESC LIMIT ?2",
            Self::COLUMNS
        );
        let mut rows = conn.query(&sql, params![miner_id, limit]).await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::from_row(&row)?);
        }
        Ok(out)
    }

    #[instrument(skip(self))]
    pub async fn purge_older_than(&self, cutoff: chrono::DateTime<chrono::Utc>) -> Result<u64, StoreError> {
        let conn = self.store.connection()?;
        conn.execute("DELETE FROM telemetry WHERE timestamp < ?1", params![fmt_ts(cutoff)])
            .await
            .map_err(StoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::HashMap;

    fn row(miner_id: i64, timestamp: chrono::DateTime<chrono::Utc>) -> Telemetry {
        Telemetry {
            id: 0,
            miner_id,
            timestamp,
            hashrate: 100.0,
            hashrate_unit: HashrateUnit::GhPerSec,
            temperature: Some(55.0),
            power_watts: Some(20.0),
            shares_accepted: Some(10),
            shares_rejected: Some(0),
            pool_in_use: None,
            data: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn purge_removes_only_rows_older_than_the_cutoff() {
        let store = Store::connect(":memory:", None).await.unwrap();
        let repo = TelemetryRepository::new(store);

        let now = chrono::Utc::now();
        repo.insert(&row(1, now - Duration::days(40))).await.unwrap();
        repo.insert(&row(1, now - Duration::days(31))).await.unwrap();
        repo.insert(&row(1, now - Duration::days(1))).await.unwrap();

        let deleted = repo.purge_older_than(now - Duration::days(30)).await.unwrap();
        assert_eq!(deleted, 2);

        let remaining = repo.recent_for_pool(1, 10).await.unwrap();
        assert_eq!(remaining.len(), 1);
    }
}
