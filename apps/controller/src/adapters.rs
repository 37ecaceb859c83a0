// [apps/controller/src/adapters.rs]
//! Builds the per-miner adapter dispatch table from the current miner list
//! (§4.1, §9: "dispatch table is built at process start from the miner
//! list") and rebuilds the passive-family IP registry alongside it.

use crate::app_state::AppState;
use fleet_adapters::build_adapter;
use fleet_models::MinerFamily;
use fleet_store::repositories::MinerRepository;
use std::collections::HashMap;
use std::net::IpAddr;
use std::str::FromStr;
use tracing::{instrument, warn};

/// Re-reads the enabled miner list and replaces both the adapter table and
/// the passive registry. Called once at startup and again on the
/// scheduler's `adapter-table-refresh` job (§4.10) so a miner added,
/// edited, or disabled later is picked up without a process restart.
#[instrument(skip(state))]
pub async fn refresh(state: &AppState) -> anyhow::Result<()> {
    let repo = MinerRepository::new(state.store.clone());
    let miners = repo.list_enabled().await?;

    let mut table = HashMap::with_capacity(miners.len());
    let mut passive_entries = Vec::new();

    for miner in &miners {
        let adapter = build_adapter(miner, &state.passive_cache);
        if miner.family == MinerFamily::NMMiner {
            match IpAddr::from_str(&miner.host) {
                Ok(ip) => passive_entries.push((ip, miner.id)),
                Err(_) => warn!(miner_id = miner.id, host = %miner.host, "nmminer host is not a bare IP, cannot register"),
            }
        }
        table.insert(miner.id, adapter);
    }

    state.passive_registry.rebuild(passive_entries).await;
    *state.adapters.write().await = table;
    Ok(())
}
