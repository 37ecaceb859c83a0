// [libs/infra/store/src/repositories/tracking.rs]
use super::decode::{fmt_ts, parse_ts};
use crate::errors::StoreError;
use crate::Store;
use chrono::{DateTime, Utc};
use fleet_models::{BlockFound, HighDiffShare};
use libsql::params;
use tracing::{instrument, warn};

pub struct TrackingRepository {
    store: Store,
}

impl TrackingRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    const SHARE_COLUMNS: &'static str = "id, miner_id, coin, pool_name, difficulty, \
        network_difficulty, hashrate, mode, was_block_solve, timestamp";

    fn share_from_row(row: &libsql::Row) -> Result<HighDiffShare, StoreError> {
        let timestamp: String = row.get(9)?;
        Ok(HighDiffShare {
            id: row.get(0)?,
            miner_id: row.get(1)?,
            coin: row.get(2)?,
            pool_name: row.get(3)?,
            difficulty: row.get(4)?,
            network_difficulty: row.get(5)?,
            hashrate: row.get(6)?,
            mode: row.get(7)?,
            was_block_solve: row.get::<i64>(8)? != 0,
            timestamp: parse_ts(&timestamp)?,
        })
    }

    /// Inserts the share, flags a block solve when the difficulty invariant
    /// says it met the network target (§8 invariant 4), then trims the
    /// per-miner table back down to the top 30 by difficulty (§3).
    #[instrument(skip(self, share))]
    pub async fn insert_high_diff_share(&self, share: &HighDiffShare) -> Result<i64, StoreError> {
        let was_block_solve = share.was_block_solve || share.expected_block_solve();
        if share.was_block_solve && !share.expected_block_solve() {
            warn!(miner_id = share.miner_id, "block solve flagged without a difficulty reading that backs it up");
        }
        let conn = self.store.connection()?;
        conn.execute(
            "INSERT INTO high_diff_shares (miner_id, coin, pool_name, difficulty, \
             network_difficulty, hashrate, mode, was_block_solve, timestamp) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                share.miner_id,
                share.coin.clone(),
                share.pool_name.clone(),
                share.difficulty,
                share.network_difficulty,
                share.hashrate,
                share.mode.clone(),
                was_block_solve as i64,
                fmt_ts(share.timestamp),
            ],
        )
        .await?;
        let id = conn.last_insert_rowid();
        conn.execute(
            "DELETE FROM high_diff_shares WHERE miner_id = ?1 AND id NOT IN ( \
             SELECT id FROM high_diff_shares WHERE miner_id = ?1 ORDER BY difficulty DESC LIMIT 30)",
            params![share.miner_id],
        )
        .await?;
        Ok(id)
    }

    #[instrument(skip(self))]
    pub async fn best_share_for_miner(&self, miner_id: i64) -> Result<Option<HighDiffShare>, StoreError> {
        let conn = self.store.connection()?;
        let sql = format!(
            "SELECT {} FROM high_diff_shares WHERE miner_id = ?1 ORDER BY difficulty DESC LIMIT 1",
            Self::SHARE_COLUMNS
        );
        let mut rows = conn.query(&sql, params![miner_id]).await?;
        rows.next().await?.map(|r| Self::share_from_row(&r)).transpose()
    }

    #[instrument(skip(self))]
    pub async fn purge_shares_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let conn = self.store.connection()?;
        conn.execute(
            "DELETE FROM high_diff_shares WHERE timestamp < ?1",
            params![fmt_ts(cutoff)],
        )
        .await
        .map_err(StoreError::from)
    }

    #[instrument(skip(self, block))]
    pub async fn insert_block_found(&self, block: &BlockFound) -> Result<i64, StoreError> {
        let conn = self.store.connection()?;
        conn.execute(
            "INSERT INTO blocks_found (miner_id, coin, pool_name, difficulty, \
             network_difficulty, timestamp) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                block.miner_id,
                block.coin.clone(),
                block.pool_name.clone(),
                block.difficulty,
                block.network_difficulty,
                fmt_ts(block.timestamp),
            ],
        )
        .await?;
        Ok(conn.last_insert_rowid())
    }

    #[instrument(skip(self))]
    pub async fn list_blocks_found(&self) -> Result<Vec<BlockFound>, StoreError> {
        let conn = self.store.connection()?;
        let mut rows = conn
            .query(
                "SELECT id, miner_id, coin, pool_name, difficulty, network_difficulty, timestamp \
                 FROM blocks_found ORDER BY timestamp DESC",
                (),
            )
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            let timestamp: String = row.get(6)?;
            out.push(BlockFound {
                id: row.get(0)?,
                miner_id: row.get(1)?,
                coin: row.get(2)?,
                pool_name: row.get(3)?,
                difficulty: row.get(4)?,
                network_difficulty: row.get(5)?,
                timestamp: parse_ts(&timestamp)?,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;

    fn share(miner_id: i64, difficulty: f64) -> HighDiffShare {
        HighDiffShare {
            id: 0,
            miner_id,
            coin: "bitcoin".into(),
            pool_name: "demo-pool".into(),
            difficulty,
            network_difficulty: Some(difficulty * 1_000.0),
            hashrate: 100.0,
            mode: None,
            was_block_solve: false,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn keeps_only_the_top_thirty_shares_per_miner() {
        let store = Store::connect(":memory:", None).await.unwrap();
        let repo = TrackingRepository::new(store);

        for i in 0..40 {
            repo.insert_high_diff_share(&share(1, i as f64)).await.unwrap();
        }

        let best = repo.best_share_for_miner(1).await.unwrap().unwrap();
        assert_eq!(best.difficulty, 39.0);

        let conn = repo.store.connection().unwrap();
        let mut rows = conn
            .query("SELECT COUNT(*) FROM high_diff_shares WHERE miner_id = 1", ())
            .await
            .unwrap();
        let count: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(count, 30);
    }

    #[tokio::test]
    async fn a_second_miners_shares_are_trimmed_independently() {
        let store = Store::connect(":memory:", None).await.unwrap();
        let repo = TrackingRepository::new(store);

        for i in 0..35 {
            repo.insert_high_diff_share(&share(1, i as f64)).await.unwrap();
        }
        repo.insert_high_diff_share(&share(2, 5.0)).await.unwrap();

        let conn = repo.store.connection().unwrap();
        let mut rows = conn
            .query("SELECT COUNT(*) FROM high_diff_shares WHERE miner_id = 2", ())
            .await
            .unwrap();
        let count: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(count, 1);
    }
}
