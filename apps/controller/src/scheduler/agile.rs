// [apps/controller/src/scheduler/agile.rs]
//! Agile Solo execution + reconciliation (§4.5, §4.10). Both delegate
//! straight to `fleet_strategy::AgileEngine`; this module only supplies the
//! region and the live adapter table and respects the `octopus_agile.enabled`
//! toggle (§6).

use crate::app_state::AppState;
use fleet_config::ConfigStore;
use fleet_strategy::AgileEngine;
use std::sync::Arc;
use tracing::instrument;

fn region(config: &ConfigStore) -> String {
    config.get("octopus_agile.region", "H".to_string())
}

#[instrument(skip(state))]
pub async fn tick(state: Arc<AppState>) -> anyhow::Result<()> {
    if !state.config.get("octopus_agile.enabled", false) {
        return Ok(());
    }
    let engine = AgileEngine::new(state.store.clone());
    let adapters = state.adapters.read().await.clone();
    engine.run_tick(&region(&state.config), &adapters).await?;
    Ok(())
}

#[instrument(skip(state))]
pub async fn reconcile(state: Arc<AppState>) -> anyhow::Result<()> {
    if !state.config.get("octopus_agile.enabled", false) {
        return Ok(());
    }
    let engine = AgileEngine::new(state.store.clone());
    let adapters = state.adapters.read().await.clone();
    engine.run_reconciliation(&region(&state.config), &adapters).await?;
    Ok(())
}
