// [apps/controller/src/scheduler/pool_slot.rs]
//! Pool-slot sync (§4.10, 15 min, fixed-slot family only): asks every
//! fixed-slot device what's actually sitting in its pool slots and
//! rewrites `miner_pool_slots` to match, resolving each slot's `pool_id`
//! against the registered pool list by normalised host:port.

use crate::app_state::AppState;
use fleet_models::MinerPoolSlot;
use fleet_store::repositories::{MinerRepository, PoolRepository, PoolSlotRepository};
use std::sync::Arc;
use tracing::{instrument, warn};

#[instrument(skip(state))]
pub async fn tick(state: Arc<AppState>) -> anyhow::Result<()> {
    let miner_repo = MinerRepository::new(state.store.clone());
    let pool_repo = PoolRepository::new(state.store.clone());
    let slot_repo = PoolSlotRepository::new(state.store.clone());
    let adapters = state.adapters.read().await.clone();
    let pools = pool_repo.list_all().await?;

    for miner in miner_repo.list_enabled().await? {
        if !miner.family.is_fixed_slot() {
            continue;
        }
        let Some(adapter) = adapters.get(&miner.id) else { continue };

        let reported = match adapter.list_pool_slots().await {
            Ok(slots) => slots,
            Err(e) => {
                warn!(miner_id = miner.id, error = %e, "pool-slot sync failed");
                continue;
            }
        };

        let now = chrono::Utc::now();
        let rows: Vec<MinerPoolSlot> = reported
            .into_iter()
            .map(|slot| {
                let pool_id = pools
                    .iter()
                    .find(|p| p.host_port() == (slot.pool_url.clone(), slot.pool_port))
                    .map(|p| p.id);
                MinerPoolSlot {
                    miner_id: miner.id,
                    slot_number: slot.slot_number,
                    pool_id,
                    pool_url: slot.pool_url,
                    pool_port: slot.pool_port,
                    pool_user: slot.pool_user,
                    is_active: slot.is_active,
                    last_seen: now,
                }
            })
            .collect();

        if !rows.is_empty() {
            slot_repo.upsert_slots(miner.id, &rows).await?;
        }
    }

    Ok(())
}
