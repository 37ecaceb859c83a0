// [libs/infra/store/src/repositories/pool_strategy.rs]
use super::decode::{enum_from_db, enum_to_db, fmt_ts, parse_ts};
use crate::errors::StoreError;
use crate::Store;
use fleet_models::{PoolStrategy, StrategyType};
use libsql::params;
use tracing::instrument;

pub struct PoolStrategyRepository {
    store: Store,
}

impl PoolStrategyRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    const COLUMNS: &'static str = "id, name, strategy_type, enabled, pool_ids, miner_ids, \
        config, current_pool_index, last_switch";

    fn from_row(row: &libsql::Row) -> Result<PoolStrategy, StoreError> {
        let strategy_type: String = row.get(2)?;
        let pool_ids: String = row.get(4)?;
        let miner_ids: String = row.get(5)?;
        let config: String = row.get(6)?;
        let last_switch: Option<String> = row.get(8)?;
        Ok(PoolStrategy {
            id: row.get(0)?,
            name: row.get(1)?,
            strategy_type: enum_from_db::<StrategyType>(&strategy_type)?,
            enabled: row.get::<i64>(3)? != 0,
            pool_ids: serde_json::from_str(&pool_ids).unwrap_or_default(),
            miner_ids: serde_json::from_str(&miner_ids).unwrap_or_default(),
            config: serde_json::from_str(&config).unwrap_or(serde_json::Value::Null),
            current_pool_index: row.get::<i64>(7)? as i32,
            last_switch: last_switch.map(|s| parse_ts(&s)).transpose()?,
        })
    }

    #[instrument(skip(self))]
    pub async fn list_enabled(&self) -> Result<Vec<PoolStrategy>, StoreError> {
        let conn = self.store.connection()?;
        let sql = format!(
            "SELECT {} FROM pool_strategies WHERE enabled = 1 ORDER BY id",
            Self::COLUMNS
        );
        let mut rows = conn.query(&sql, ()).await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::from_row(&row)?);
        }
        Ok(out)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<PoolStrategy, StoreError> {
        let conn = self.store.connection()?;
        let sql = format!("SELECT {} FROM pool_strategies WHERE id = ?1", Self::COLUMNS);
        let mut rows = conn.query(&sql, params![id]).await?;
        match rows.next().await? {
            Some(row) => Self::from_row(&row),
            None => Err(StoreError::NotFound(format!("pool strategy {id}"))),
        }
    }

    #[instrument(skip(self, strategy))]
    pub async fn save(&self, strategy: &PoolStrategy) -> Result<(), StoreError> {
        let conn = self.store.connection()?;
        if strategy.id == 0 {
            conn.execute(
                "INSERT INTO pool_strategies (name, strategy_type, enabled, pool_ids, \
                 miner_ids, config, current_pool_index, last_switch) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    strategy.name.clone(),
                    enum_to_db(&strategy.strategy_type),
                    strategy.enabled as i64,
                    serde_json::to_string(&strategy.pool_ids).unwrap_or_else(|_| "[]".into()),
                    serde_json::to_string(&strategy.miner_ids).unwrap_or_else(|_| "[]".into()),
                    strategy.config.to_string(),
                    strategy.current_pool_index as i64,
                    strategy.last_switch.map(fmt_ts),
                ],
            )
            .await?;
        } else {
            conn.execute(
                "UPDATE pool_strategies SET name = ?2, strategy_type = ?3, enabled = ?4, \
                 pool_ids = ?5, miner_ids = ?6, config = ?7, current_pool_index = ?8, \
                 last_switch = ?9 WHERE id = ?1",
                params![
                    strategy.id,
                    strategy.name.clone(),
                    enum_to_db(&strategy.strategy_type),
                    strategy.enabled as i64,
                    serde_json::to_string(&strategy.pool_ids).unwrap_or_else(|_| "[]".into()),
                    serde_json::to_string(&strategy.miner_ids).unwrap_or_else(|_| "[]".into()),
                    strategy.config.to_string(),
                    strategy.current_pool_index as i64,
                    strategy.last_switch.map(fmt_ts),
                ],
            )
            .await?;
        }
        Ok(())
    }
}
