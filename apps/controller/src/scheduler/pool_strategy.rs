// [apps/controller/src/scheduler/pool_strategy.rs]
//! Pool-strategy execution + reconciliation (§4.6, §4.10) — round-robin,
//! load-balance, and pro-mode, delegated to `fleet_strategy::PoolStrategyEngine`.

use crate::app_state::AppState;
use fleet_strategy::PoolStrategyEngine;
use std::sync::Arc;
use tracing::instrument;

#[instrument(skip(state))]
pub async fn tick(state: Arc<AppState>) -> anyhow::Result<()> {
    let engine = PoolStrategyEngine::new(state.store.clone());
    let adapters = state.adapters.read().await.clone();
    let region: String = state.config.get("octopus_agile.region", "H".to_string());
    engine.run_tick(&adapters, &region).await?;
    Ok(())
}

#[instrument(skip(state))]
pub async fn reconcile(state: Arc<AppState>) -> anyhow::Result<()> {
    let engine = PoolStrategyEngine::new(state.store.clone());
    let adapters = state.adapters.read().await.clone();
    engine.run_reconciliation(&adapters).await?;
    Ok(())
}
