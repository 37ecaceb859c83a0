// [libs/infra/store/src/repositories/pool_slot.rs]
use super::decode::{fmt_ts, parse_ts};
use crate::errors::StoreError;
use crate::Store;
use fleet_models::MinerPoolSlot;
use libsql::params;
use tracing::instrument;

pub struct PoolSlotRepository {
    store: Store,
}

impl PoolSlotRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    fn from_row(row: &libsql::Row) -> Result<MinerPoolSlot, StoreError> {
        let last_seen: String = row.get(6)?;
        Ok(MinerPoolSlot {
            miner_id: row.get(0)?,
            slot_number: row.get::<i64>(1)? as i32,
            pool_id: row.get(2)?,
            pool_url: row.get(3)?,
            pool_port: row.get::<i64>(4)? as u16,
            pool_user: row.get(5)?,
            is_active: row.get::<i64>(7)? != 0,
            last_seen: parse_ts(&last_seen)?,
        })
    }

    const COLUMNS: &'static str =
        "miner_id, slot_number, pool_id, pool_url, pool_port, pool_user, last_seen, is_active";

    #[instrument(skip(self))]
    pub async fn list_for_miner(&self, miner_id: i64) -> Result<Vec<MinerPoolSlot>, StoreError> {
        let conn = self.store.connection()?;
        let sql = format!(
            "SELECT {} FROM miner_pool_slots WHERE miner_id = ?1 ORDER BY slot_number",
            Self::COLUMNS
        );
        let mut rows = conn.query(&sql, params![miner_id]).await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::from_row(&row)?);
        }
        Ok(out)
    }

    #[instrument(skip(self))]
    pub async fn find_slot_by_pool(&self, miner_id: i64, pool_id: i64) -> Result<Option<MinerPoolSlot>, StoreError> {
        Ok(self
            .list_for_miner(miner_id)
            .await?
            .into_iter()
            .find(|s| s.pool_id == Some(pool_id)))
    }

    /// Rewrites the fixed-slot table for one miner in a single pass: the
    /// device is the source of truth for what its slots hold (§4.1), so a
    /// sync replaces, it never merges.
    #[instrument(skip(self, slots))]
    pub async fn upsert_slots(&self, miner_id: i64, slots: &[MinerPoolSlot]) -> Result<(), StoreError> {
        let conn = self.store.connection()?;
        for slot in slots {
            conn.execute(
                "INSERT INTO miner_pool_slots \
                 (miner_id, slot_number, pool_id, pool_url, pool_port, pool_user, is_active, last_seen) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
                 ON CONFLICT (miner_id, slot_number) DO UPDATE SET \
                 pool_id = excluded.pool_id, pool_url = excluded.pool_url, \
                 pool_port = excluded.pool_port, pool_user = excluded.pool_user, \
                 is_active = excluded.is_active, last_seen = excluded.last_seen",
                params![
                    miner_id,
                    slot.slot_number as i64,
                    slot.pool_id,
                    slot.pool_url.clone(),
                    slot.pool_port as i64,
                    slot.pool_user.clone(),
                    slot.is_active as i64,
                    fmt_ts(slot.last_seen),
                ],
            )
            .await?;
        }
        Ok(())
    }
}
