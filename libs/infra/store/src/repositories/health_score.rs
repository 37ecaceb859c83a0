// [libs/infra/store/src/repositories/health_score.rs]
use super::decode::{fmt_ts, parse_ts};
use crate::errors::StoreError;
use crate::Store;
use fleet_models::HealthScore;
use libsql::params;
use tracing::instrument;

pub struct HealthScoreRepository {
    store: Store,
}

impl HealthScoreRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    #[instrument(skip(self, score))]
    pub async fn insert(&self, score: &HealthScore) -> Result<(), StoreError> {
        let conn = self.store.connection()?;
        conn.execute(
            "INSERT INTO health_scores (miner_id, timestamp, overall_score, sub_scores) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                score.miner_id,
                fmt_ts(score.timestamp),
                score.overall_score as i64,
                serde_json::to_string(&score.sub_scores).unwrap_or_else(|_| "{}".into()),
            ],
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn latest_for_miner(&self, miner_id: i64) -> Result<Option<HealthScore>, StoreError> {
        let conn = self.store.connection()?;
        let mut rows = conn
            .query(
                "SELECT miner_id, timestamp, overall_score, sub_scores FROM health_scores \
                 WHERE miner_id = ?1 ORDER BY timestamp DESC LIMIT 1",
                params![miner_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => {
                let timestamp: String = row.get(1)?;
                let sub_scores: String = row.get(3)?;
                Ok(Some(HealthScore {
                    miner_id: row.get(0)?,
                    timestamp: parse_ts(&timestamp)?,
                    overall_score: row.get::<i64>(2)? as u8,
                    sub_scores: serde_json::from_str(&sub_scores).unwrap_or_default(),
                }))
            }
            None => Ok(None),
        }
    }
}
