// [apps/controller/src/scheduler/health_score.rs]
//! Hourly per-miner composite health score (§4.10). A lighter-weight sibling
//! of the pool-health composite score: reachability, hashrate presence, and
//! temperature each contribute a sub-score, rolled into one `overall_score`.

use crate::app_state::AppState;
use fleet_models::HealthScore;
use fleet_store::repositories::{HealthScoreRepository, MinerRepository, TelemetryRepository};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

const WARM_CELSIUS: f64 = 70.0;
const HOT_CELSIUS: f64 = 85.0;

#[instrument(skip(state))]
pub async fn tick(state: Arc<AppState>) -> anyhow::Result<()> {
    let miner_repo = MinerRepository::new(state.store.clone());
    let telemetry_repo = TelemetryRepository::new(state.store.clone());
    let health_repo = HealthScoreRepository::new(state.store.clone());
    let adapters = state.adapters.read().await.clone();

    for miner in miner_repo.list_enabled().await? {
        let online = match adapters.get(&miner.id) {
            Some(adapter) => adapter.is_online().await.unwrap_or(false),
            None => false,
        };
        let latest = telemetry_repo.latest_for_miner(miner.id).await?;

        let mut sub_scores = HashMap::new();
        sub_scores.insert("reachability".to_string(), if online { 100u8 } else { 0u8 });

        let hashrate_score = latest.as_ref().map_or(0, |t| if t.hashrate > 0.0 { 100 } else { 0 });
        sub_scores.insert("hashrate".to_string(), hashrate_score);

        let temperature_score = latest.as_ref().and_then(|t| t.temperature).map_or(100, |temp| {
            if temp < WARM_CELSIUS {
                100
            } else if temp < HOT_CELSIUS {
                60
            } else {
                20
            }
        });
        sub_scores.insert("temperature".to_string(), temperature_score);

        let overall_score = (sub_scores.values().map(|v| *v as u32).sum::<u32>() / sub_scores.len() as u32) as u8;

        health_repo
            .insert(&HealthScore {
                miner_id: miner.id,
                timestamp: chrono::Utc::now(),
                overall_score,
                sub_scores,
            })
            .await?;
    }
    Ok(())
}
