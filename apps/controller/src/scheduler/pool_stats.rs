// [apps/controller/src/scheduler/pool_stats.rs]
//! Pool-stats refresh (§1, §6, §4.4): feeds `PoolStatsClient`'s optional
//! solopool/braiins/supportxmr integrations into the pool's stored network
//! difficulty, supplementing the pool-health monitor's TCP-probe-only view
//! with pool-side numbers a reachability probe can't see. Each integration
//! is independently toggled; a pool only ever matches one (solopool keys
//! off the pool's name as its coin subdomain, braiins/supportxmr key off
//! the pool's configured username/wallet address).

use crate::app_state::AppState;
use fleet_fetchers::{PoolStats, PoolStatsClient};
use fleet_store::repositories::PoolRepository;
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[instrument(skip(state))]
pub async fn tick(state: Arc<AppState>) -> anyhow::Result<()> {
    let solopool_enabled: bool = state.config.get("solopool_enabled", true);
    let braiins_enabled: bool = state.config.get("braiins_enabled", false);
    let supportxmr_enabled: bool = state.config.get("supportxmr_enabled", false);

    if !solopool_enabled && !braiins_enabled && !supportxmr_enabled {
        return Ok(());
    }

    let braiins_api_token: String = state.config.get("braiins_api_token", String::new());
    let client = PoolStatsClient::new(if braiins_api_token.is_empty() { None } else { Some(braiins_api_token) });

    let pool_repo = PoolRepository::new(state.store.clone());
    for pool in pool_repo.list_enabled().await? {
        let result = if solopool_enabled {
            client.fetch_solopool(&pool.name).await
        } else if braiins_enabled {
            client.fetch_braiins(&pool.user).await
        } else if supportxmr_enabled {
            client.fetch_supportxmr(&pool.user).await
        } else {
            continue;
        };

        match result {
            Ok(PoolStats { network_difficulty: Some(diff), pool_hashrate, miners_connected, .. }) => {
                pool_repo.update_network_difficulty(pool.id, diff).await?;
                info!(pool = %pool.name, network_difficulty = diff, ?pool_hashrate, ?miners_connected, "pool stats refreshed");
            }
            Ok(stats) => {
                info!(pool = %pool.name, ?stats, "pool stats refreshed (no network difficulty reported)");
            }
            Err(e) => {
                warn!(pool = %pool.name, error = %e, "pool stats fetch failed");
                pool_repo.mark_stale(pool.id).await?;
            }
        }
    }
    Ok(())
}
