// [libs/infra/store/src/repositories/agile_strategy.rs]
use super::decode::{fmt_ts, parse_json_map, parse_ts, to_json_string};
use crate::errors::StoreError;
use crate::Store;
use fleet_models::{AgileStrategy, AgileStrategyBand, TargetMode};
use libsql::params;
use tracing::instrument;

pub struct AgileStrategyRepository {
    store: Store,
}

impl AgileStrategyRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    fn strategy_from_row(row: &libsql::Row) -> Result<AgileStrategy, StoreError> {
        let current_price_band: Option<String> = row.get(2)?;
        let last_action_time: Option<String> = row.get(4)?;
        let state_data: String = row.get(6)?;
        Ok(AgileStrategy {
            id: row.get(0)?,
            enabled: row.get::<i64>(1)? != 0,
            current_price_band,
            hysteresis_counter: row.get::<i64>(3)? as i32,
            last_action_time: last_action_time.map(|s| parse_ts(&s)).transpose()?,
            last_price_checked: row.get(5)?,
            state_data: parse_json_map(&state_data),
        })
    }

    fn band_from_row(row: &libsql::Row) -> Result<AgileStrategyBand, StoreError> {
        let avalon: String = row.get(6)?;
        let bitaxe: String = row.get(7)?;
        let nerdqaxe: String = row.get(8)?;
        Ok(AgileStrategyBand {
            id: row.get(0)?,
            strategy_id: row.get(1)?,
            sort_order: row.get::<i64>(2)? as i32,
            min_price: row.get(3)?,
            max_price: row.get(4)?,
            target_coin: row.get(5)?,
            avalon_nano_mode: TargetMode::from_db_str(&avalon),
            bitaxe_mode: TargetMode::from_db_str(&bitaxe),
            nerdqaxe_mode: TargetMode::from_db_str(&nerdqaxe),
        })
    }

    /// The singleton row is seeded by the schema migration with id=1,
    /// disabled; this just reads it back.
    #[instrument(skip(self))]
    pub async fn get_singleton(&self) -> Result<AgileStrategy, StoreError> {
        let conn = self.store.connection()?;
        let mut rows = conn
            .query(
                "SELECT id, enabled, current_price_band, hysteresis_counter, \
                 last_action_time, last_price_checked, state_data FROM agile_strategy WHERE id = 1",
                (),
            )
            .await?;
        match rows.next().await? {
            Some(row) => Self::strategy_from_row(&row),
            None => {
                conn.execute("INSERT INTO agile_strategy (id, enabled) VALUES (1, 0)", ())
                    .await?;
                self.get_singleton_inner(&conn).await
            }
        }
    }

    async fn get_singleton_inner(&self, conn: &libsql::Connection) -> Result<AgileStrategy, StoreError> {
        let mut rows = conn
            .query(
                "SELECT id, enabled, current_price_band, hysteresis_counter, \
                 last_action_time, last_price_checked, state_data FROM agile_strategy WHERE id = 1",
                (),
            )
            .await?;
        match rows.next().await? {
            Some(row) => Self::strategy_from_row(&row),
            None => Err(StoreError::NotFound("agile_strategy singleton".into())),
        }
    }

    #[instrument(skip(self, strategy))]
    pub async fn save(&self, strategy: &AgileStrategy) -> Result<(), StoreError> {
        let conn = self.store.connection()?;
        conn.execute(
            "UPDATE agile_strategy SET enabled = ?2, current_price_band = ?3, \
             hysteresis_counter = ?4, last_action_time = ?5, last_price_checked = ?6, \
             state_data = ?7 WHERE id = 1",
            params![
                strategy.id,
                strategy.enabled as i64,
                strategy.current_price_band.clone(),
                strategy.hysteresis_counter as i64,
                strategy.last_action_time.map(fmt_ts),
                strategy.last_price_checked,
                to_json_string(&strategy.state_data),
            ],
        )
        .await?;
        Ok(())
    }

    /// Used by the operator-facing disable path: records the reason in the
    /// audit log and flips `enabled` in one call so the two can't drift.
    #[instrument(skip(self))]
    pub async fn disable(&self) -> Result<(), StoreError> {
        let conn = self.store.connection()?;
        conn.execute("UPDATE agile_strategy SET enabled = 0 WHERE id = 1", ())
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_bands(&self) -> Result<Vec<AgileStrategyBand>, StoreError> {
        let conn = self.store.connection()?;
        let mut rows = conn
            .query(
                "SELECT id, strategy_id, sort_order, min_price, max_price, target_coin, \
                 avalon_nano_mode, bitaxe_mode, nerdqaxe_mode FROM agile_strategy_bands \
                 WHERE strategy_id = 1 ORDER BY sort_order",
                (),
            )
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::band_from_row(&row)?);
        }
        Ok(out)
    }

    #[instrument(skip(self, band))]
    pub async fn upsert_band(&self, band: &AgileStrategyBand) -> Result<(), StoreError> {
        let conn = self.store.connection()?;
        conn.execute(
            "INSERT INTO agile_strategy_bands \
             (strategy_id, sort_order, min_price, max_price, target_coin, \
              avalon_nano_mode, bitaxe_mode, nerdqaxe_mode) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
             ON CONFLICT (strategy_id, sort_order) DO UPDATE SET \
             min_price = excluded.min_price, max_price = excluded.max_price, \
             target_coin = excluded.target_coin, avalon_nano_mode = excluded.avalon_nano_mode, \
             bitaxe_mode = excluded.bitaxe_mode, nerdqaxe_mode = excluded.nerdqaxe_mode",
            params![
                band.strategy_id,
                band.sort_order as i64,
                band.min_price,
                band.max_price,
                band.target_coin.clone(),
                band.avalon_nano_mode.to_db_str(),
                band.bitaxe_mode.to_db_str(),
                band.nerdqaxe_mode.to_db_str(),
            ],
        )
        .await?;
        Ok(())
    }

    /// Seeds the default OFF/low/medium/high band ladder on first run, only
    /// when no bands exist yet — never overwrites an operator's edits.
    #[instrument(skip(self))]
    pub async fn ensure_default_bands(&self) -> Result<(), StoreError> {
        if !self.list_bands().await?.is_empty() {
            return Ok(());
        }
        // sort_order ascending == price descending: 0 is OFF (most
        // expensive, price >= 30p), 3 is the cheapest band.
        let defaults: [(i32, Option<f64>, Option<f64>, &str, &str, &str, &str); 4] = [
            (0, Some(30.0), None, fleet_models::strategy::OFF_COIN, "sleep", "off", "off"),
            (1, Some(22.0), Some(30.0), "BCH", "low", "low", "low"),
            (2, Some(12.0), Some(22.0), "BCH", "normal", "normal", "normal"),
            (3, None, Some(12.0), "BCH", "high", "high", "high"),
        ];
        for (sort_order, min_price, max_price, coin, avalon, bitaxe, nerdqaxe) in defaults {
            self.upsert_band(&AgileStrategyBand {
                id: 0,
                strategy_id: 1,
                sort_order,
                min_price,
                max_price,
                target_coin: coin.to_string(),
                avalon_nano_mode: TargetMode::from_db_str(avalon),
                bitaxe_mode: TargetMode::from_db_str(bitaxe),
                nerdqaxe_mode: TargetMode::from_db_str(nerdqaxe),
            })
            .await?;
        }
        Ok(())
    }

    /// Re-derives the covering band for `price` from the full band list —
    /// the strategy never trusts its own stored `current_price_band` for
    /// this lookup (§4.5).
    pub fn get_band_for_price(bands: &[AgileStrategyBand], price: f64) -> Option<&AgileStrategyBand> {
        bands.iter().find(|b| b.covers(price))
    }

    #[instrument(skip(self))]
    pub async fn list_enrolled_miner_ids(&self) -> Result<Vec<i64>, StoreError> {
        let conn = self.store.connection()?;
        let mut rows = conn
            .query(
                "SELECT miner_id FROM miner_strategy WHERE strategy_enabled = 1",
                (),
            )
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(row.get(0)?);
        }
        Ok(out)
    }

    #[instrument(skip(self))]
    pub async fn is_enrolled(&self, miner_id: i64) -> Result<bool, StoreError> {
        let conn = self.store.connection()?;
        let mut rows = conn
            .query(
                "SELECT strategy_enabled FROM miner_strategy WHERE miner_id = ?1",
                params![miner_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)? != 0),
            None => Ok(false),
        }
    }

    #[instrument(skip(self))]
    pub async fn set_enrolled(&self, miner_id: i64, enrolled: bool) -> Result<(), StoreError> {
        let conn = self.store.connection()?;
        conn.execute(
            "INSERT INTO miner_strategy (miner_id, strategy_enabled) VALUES (?1, ?2) \
             ON CONFLICT (miner_id) DO UPDATE SET strategy_enabled = excluded.strategy_enabled",
            params![miner_id, enrolled as i64],
        )
        .await?;
        Ok(())
    }
}
