// [apps/controller/src/scheduler/energy.rs]
//! Energy-price ingest (§4.9) and the simple energy-optimisation toggle
//! (§6 `energy_optimization.*`) — a single price threshold, distinct from
//! the Agile Solo band ladder, that only ever moves non-enrolled miners
//! between a "low" and "normal" mode.

use crate::app_state::AppState;
use fleet_fetchers::TariffClient;
use fleet_models::EnergyPrice;
use fleet_store::repositories::{AgileStrategyRepository, EnergyPriceRepository, MinerRepository};
use std::sync::Arc;
use tracing::{instrument, warn};

fn region_char(state: &AppState) -> char {
    let region: String = state.config.get("octopus_agile.region", "H".to_string());
    region.chars().next().unwrap_or('H')
}

#[instrument(skip(state))]
pub async fn refresh(state: Arc<AppState>) -> anyhow::Result<()> {
    let repo = EnergyPriceRepository::new(state.store.clone());
    let client = TariffClient::new();
    let region = region_char(&state);

    match client.fetch_slots(region).await {
        Ok(slots) => {
            for slot in slots {
                let price = EnergyPrice::new(region.to_string(), slot.valid_from, slot.price_pence);
                repo.upsert(&price).await?;
            }
        }
        // Missing future tariff data is not an error (§4.9) — the upstream
        // simply hasn't published the next slots yet.
        Err(e) => warn!(error = %e, "energy tariff fetch failed, keeping existing slots"),
    }
    Ok(())
}

#[instrument(skip(state))]
pub async fn optimise(state: Arc<AppState>) -> anyhow::Result<()> {
    apply_optimisation(&state).await
}

#[instrument(skip(state))]
pub async fn reconcile_optimisation(state: Arc<AppState>) -> anyhow::Result<()> {
    apply_optimisation(&state).await
}

async fn apply_optimisation(state: &AppState) -> anyhow::Result<()> {
    if !state.config.get("energy_optimization.enabled", false) {
        return Ok(());
    }
    let threshold: f64 = state.config.get("energy_optimization.price_threshold", 15.0);

    let price_repo = EnergyPriceRepository::new(state.store.clone());
    let region: String = state.config.get("octopus_agile.region", "H".to_string());
    let Some(current) = price_repo.get_current_price(&region).await? else {
        return Ok(());
    };

    let agile_repo = AgileStrategyRepository::new(state.store.clone());
    let enrolled = agile_repo.list_enrolled_miner_ids().await?;
    let target_mode = if current.price_pence > threshold { "low" } else { "normal" };

    let miner_repo = MinerRepository::new(state.store.clone());
    let adapters = state.adapters.read().await.clone();
    for miner in miner_repo.list_enabled().await? {
        if enrolled.contains(&miner.id) {
            continue; // Agile Solo owns this miner's mode
        }
        let Some(adapter) = adapters.get(&miner.id) else { continue };
        if let Ok(Some(current_mode)) = adapter.get_mode().await {
            if current_mode == target_mode {
                continue;
            }
        }
        if let Err(e) = adapter.set_mode(target_mode).await {
            warn!(miner_id = miner.id, error = %e, "energy optimisation mode switch failed");
        }
    }
    Ok(())
}
