// [apps/controller/src/scheduler/telemetry.rs]
//! Telemetry ingest (§4.3): poll every enabled miner, persist a row on
//! success, feed ASIC session-best shares into the high-difficulty-share
//! tracker (§4.11), and emit a warning event on failure.

use crate::app_state::AppState;
use crate::tracking;
use fleet_fetchers::BlockExplorerClient;
use fleet_models::{Event, EventType, MinerFamily, Telemetry};
use fleet_store::repositories::{
    AgileStrategyRepository, EventRepository, MinerRepository, PoolRepository, TelemetryRepository, TrackingRepository,
};
use fleet_store::retry::with_retry;
use std::sync::Arc;
use std::time::Duration;
use tracing::{instrument, warn};

#[instrument(skip(state))]
pub async fn tick(state: Arc<AppState>) -> anyhow::Result<()> {
    let miner_repo = MinerRepository::new(state.store.clone());
    let telemetry_repo = TelemetryRepository::new(state.store.clone());
    let event_repo = EventRepository::new(state.store.clone());
    let agile_repo = AgileStrategyRepository::new(state.store.clone());
    let tracking_repo = TrackingRepository::new(state.store.clone());
    let pool_repo = PoolRepository::new(state.store.clone());
    let explorer = BlockExplorerClient::new();

    let miners = miner_repo.list_enabled().await?;
    let enrolled = agile_repo.list_enrolled_miner_ids().await?;
    let adapters = state.adapters.read().await.clone();

    for miner in miners {
        let Some(adapter) = adapters.get(&miner.id).cloned() else { continue };
        let timeout = Duration::from_secs(if miner.family == MinerFamily::NMMiner { 1 } else { 10 });

        match tokio::time::timeout(timeout, adapter.get_telemetry()).await {
            Ok(Ok(raw)) => {
                let telemetry = Telemetry {
                    id: 0,
                    miner_id: miner.id,
                    timestamp: raw.timestamp,
                    hashrate: raw.hashrate,
                    hashrate_unit: raw.hashrate_unit,
                    temperature: raw.temperature,
                    power_watts: raw.power_watts,
                    shares_accepted: raw.shares_accepted,
                    shares_rejected: raw.shares_rejected,
                    pool_in_use: raw.pool_in_use.clone(),
                    data: raw.data.clone(),
                };

                if telemetry.is_valid() {
                    let repo = &telemetry_repo;
                    let row = &telemetry;
                    with_retry(Duration::from_millis(50), || async { repo.insert(row).await }).await?;
                } else {
                    warn!(miner_id = miner.id, "telemetry row failed validation, dropping");
                }

                if let Some(detected) = &raw.detected_mode {
                    if !enrolled.contains(&miner.id) {
                        miner_repo.set_current_mode(miner.id, detected, raw.timestamp).await?;
                    }
                }
                if let Some(firmware) = &raw.firmware_version {
                    if miner.firmware_version.as_deref() != Some(firmware.as_str()) {
                        miner_repo.set_firmware(miner.id, firmware).await?;
                    }
                }

                if let Some(best_share) = &raw.best_share {
                    let coin = raw.data.get("coin").and_then(|v| v.as_str()).unwrap_or("BTC").to_string();
                    let pool_name = raw.pool_in_use.clone().unwrap_or_default();
                    if let Err(e) = tracking::record_share(
                        &tracking_repo,
                        &pool_repo,
                        &explorer,
                        miner.id,
                        &coin,
                        &pool_name,
                        best_share,
                        raw.hashrate,
                        raw.detected_mode.clone(),
                    )
                    .await
                    {
                        warn!(miner_id = miner.id, error = %e, "failed to record high-diff share");
                    }
                }
            }
            Ok(Err(e)) => {
                warn!(miner_id = miner.id, error = %e, "telemetry poll failed");
                event_repo
                    .insert(&Event {
                        id: 0,
                        timestamp: chrono::Utc::now(),
                        event_type: EventType::Warning,
                        source: format!("telemetry:{}", miner.name),
                        message: format!("telemetry poll failed: {e}"),
                        data: None,
                    })
                    .await?;
            }
            Err(_) => {
                warn!(miner_id = miner.id, "telemetry poll timed out");
            }
        }

        if !miner.family.is_passive() {
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
    }

    Ok(())
}
