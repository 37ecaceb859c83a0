// [apps/controller/src/tracking.rs]
//! High-difficulty-share and block tracker (§4.11). Lives in the
//! controller, not `fleet-strategy`, because it needs both a fetcher
//! (network difficulty) and the store directly — putting it in the domain
//! strategy crate would pull `fleet-fetchers` into a crate that otherwise
//! depends only on `fleet-models`/`fleet-store`.

use fleet_fetchers::BlockExplorerClient;
use fleet_models::{BlockFound, HighDiffShare};
use fleet_store::repositories::{PoolRepository, TrackingRepository};
use fleet_store::StoreError;
use tracing::{info, instrument};

/// Accepts the unit suffixes (`k`/`M`/`G`/`T`) cgminer-family firmware
/// reports session-best difficulty in (§4.11).
pub fn parse_difficulty(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let (number, multiplier) = match raw.chars().last() {
        Some('k') | Some('K') => (&raw[..raw.len() - 1], 1e3),
        Some('M') => (&raw[..raw.len() - 1], 1e6),
        Some('G') => (&raw[..raw.len() - 1], 1e9),
        Some('T') => (&raw[..raw.len() - 1], 1e12),
        _ => (raw, 1.0),
    };
    number.trim().parse::<f64>().ok().map(|n| n * multiplier)
}

/// Records a session-best share if it strictly improves on the miner's
/// previous best, and a block-found row alongside it when the share met or
/// beat the coin's current network difficulty.
#[instrument(skip(tracking, pools, explorer))]
#[allow(clippy::too_many_arguments)]
pub async fn record_share(
    tracking: &TrackingRepository,
    pools: &PoolRepository,
    explorer: &BlockExplorerClient,
    miner_id: i64,
    coin: &str,
    pool_name: &str,
    raw_difficulty: &str,
    hashrate: f64,
    mode: Option<String>,
) -> Result<(), StoreError> {
    let Some(difficulty) = parse_difficulty(raw_difficulty) else {
        return Ok(());
    };

    let previous_best = tracking.best_share_for_miner(miner_id).await?;
    if previous_best.map_or(false, |p| difficulty <= p.difficulty) {
        return Ok(());
    }

    let network_difficulty = explorer.fetch_network_difficulty(coin).await.ok().flatten();
    let was_block_solve = network_difficulty.map_or(false, |n| difficulty >= n);

    let share = HighDiffShare {
        id: 0,
        miner_id,
        coin: coin.to_string(),
        pool_name: pool_name.to_string(),
        difficulty,
        network_difficulty,
        hashrate,
        mode,
        was_block_solve,
        timestamp: chrono::Utc::now(),
    };
    tracking.insert_high_diff_share(&share).await?;
    info!(miner_id, difficulty, "new best share recorded");

    if let Ok(existing_pools) = pools.list_all().await {
        if let Some(pool) = existing_pools.iter().find(|p| p.name == pool_name) {
            let _ = pools.update_best_share(pool.id, difficulty).await;
        }
    }

    if was_block_solve {
        if let Some(network_difficulty) = network_difficulty {
            tracking
                .insert_block_found(&BlockFound {
                    id: 0,
                    miner_id,
                    coin: coin.to_string(),
                    pool_name: pool_name.to_string(),
                    difficulty,
                    network_difficulty,
                    timestamp: chrono::Utc::now(),
                })
                .await?;
            info!(miner_id, coin, "block solve recorded");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_suffixed_values() {
        assert_eq!(parse_difficulty("1234"), Some(1234.0));
        assert_eq!(parse_difficulty("1.5k"), Some(1500.0));
        assert_eq!(parse_difficulty("2.5M"), Some(2_500_000.0));
        assert_eq!(parse_difficulty("3G"), Some(3e9));
        assert_eq!(parse_difficulty("1T"), Some(1e12));
        assert_eq!(parse_difficulty(""), None);
        assert_eq!(parse_difficulty("garbage"), None);
    }
}
