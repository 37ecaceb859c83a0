// [libs/infra/store/src/repositories/miner.rs]
use super::decode::{fmt_ts, parse_json_map, parse_ts, to_json_string};
use crate::errors::StoreError;
use crate::retry::with_retry;
use crate::Store;
use fleet_models::{Miner, MinerFamily};
use libsql::params;
use std::time::Duration;
use tracing::instrument;

pub struct MinerRepository {
    store: Store,
}

impl MinerRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    fn from_row(row: &libsql::Row) -> Result<Miner, StoreError> {
        let family_raw: String = row.get(2)?;
        let family = MinerFamily::from_db_str(&family_raw)
            .ok_or_else(|| StoreError::Decode(format!("unknown miner family {family_raw:?}")))?;
        let port: Option<i64> = row.get(4)?;
        let last_mode_change: Option<String> = row.get(10)?;
        let config_raw: String = row.get(9)?;
        Ok(Miner {
            id: row.get(0)?,
            name: row.get(1)?,
            family,
            host: row.get(3)?,
            port: port.map(|p| p as u16),
            current_mode: row.get(5)?,
            firmware_version: row.get(6)?,
            manual_power_watts: row.get(7)?,
            enabled: row.get::<i64>(8)? != 0,
            config: parse_json_map(&config_raw),
            last_mode_change: last_mode_change.map(|s| parse_ts(&s)).transpose()?,
        })
    }

    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<Miner>, StoreError> {
        let conn = self.store.connection()?;
        let mut rows = conn
            .query(
                "SELECT id, name, family, host, port, current_mode, firmware_version, \
                 manual_power_watts, enabled, config, last_mode_change FROM miners ORDER BY id",
                (),
            )
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::from_row(&row)?);
        }
        Ok(out)
    }

    #[instrument(skip(self))]
    pub async fn list_enabled(&self) -> Result<Vec<Miner>, StoreError> {
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .filter(|m| m.enabled)
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Miner, StoreError> {
        let conn = self.store.connection()?;
        let mut rows = conn
            .query(
                "SELECT id, name, family, host, port, current_mode, firmware_version, \
                 manual_power_watts, enabled, config, last_mode_change FROM miners WHERE id = ?1",
                params![id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Self::from_row(&row),
            None => Err(StoreError::NotFound(format!("miner {id}"))),
        }
    }

    #[instrument(skip(self, miner))]
    pub async fn create(&self, miner: &Miner) -> Result<i64, StoreError> {
        let conn = self.store.connection()?;
        conn.execute(
            "INSERT INTO miners (name, family, host, port, current_mode, firmware_version, \
             manual_power_watts, enabled, config, last_mode_change) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                miner.name.clone(),
                miner.family.as_db_str(),
                miner.host.clone(),
                miner.port.map(|p| p as i64),
                miner.current_mode.clone(),
                miner.firmware_version.clone(),
                miner.manual_power_watts,
                miner.enabled as i64,
                to_json_string(&miner.config),
                miner.last_mode_change.map(fmt_ts),
            ],
        )
        .await?;
        Ok(conn.last_insert_rowid())
    }

    #[instrument(skip(self, miner))]
    pub async fn update(&self, miner: &Miner) -> Result<(), StoreError> {
        let conn = self.store.connection()?;
        let step = Duration::from_millis(20);
        with_retry(step, || async {
            conn.execute(
                "UPDATE miners SET name = ?2, family = ?3, host = ?4, port = ?5, \
                 current_mode = ?6, firmware_version = ?7, manual_power_watts = ?8, \
                 enabled = ?9, config = ?10, last_mode_change = ?11 WHERE id = ?1",
                params![
                    miner.id,
                    miner.name.clone(),
                    miner.family.as_db_str(),
                    miner.host.clone(),
                    miner.port.map(|p| p as i64),
                    miner.current_mode.clone(),
                    miner.firmware_version.clone(),
                    miner.manual_power_watts,
                    miner.enabled as i64,
                    to_json_string(&miner.config),
                    miner.last_mode_change.map(fmt_ts),
                ],
            )
            .await
            .map_err(StoreError::from)
        })
        .await?;
        Ok(())
    }

    /// Written by the mode-setting adapters and by the Agile Solo strategy
    /// (never both for a miner enrolled in the strategy — §4.5).
    #[instrument(skip(self))]
    pub async fn set_current_mode(&self, id: i64, mode: &str, at: chrono::DateTime<chrono::Utc>) -> Result<(), StoreError> {
        let conn = self.store.connection()?;
        conn.execute(
            "UPDATE miners SET current_mode = ?2, last_mode_change = ?3 WHERE id = ?1",
            params![id, mode, fmt_ts(at)],
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn set_firmware(&self, id: i64, firmware_version: &str) -> Result<(), StoreError> {
        let conn = self.store.connection()?;
        conn.execute(
            "UPDATE miners SET firmware_version = ?2 WHERE id = ?1",
            params![id, firmware_version],
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.store.connection()?;
        conn.execute("DELETE FROM miners WHERE id = ?1", params![id]).await?;
        Ok(())
    }
}
