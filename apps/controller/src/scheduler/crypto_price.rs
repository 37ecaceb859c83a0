// [apps/controller/src/scheduler/crypto_price.rs]
//! Crypto spot-price cache warm (§4.10) and the cloud push stub (§6
//! `cloud.*`, off by default).

use crate::app_state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

const COINS: &[&str] = &["bitcoin", "bitcoin-cash", "monero"];
const CACHE_TTL: Duration = Duration::from_secs(10 * 60);

#[instrument(skip(state))]
pub async fn tick(state: Arc<AppState>) -> anyhow::Result<()> {
    let client = &state.crypto_price_client;
    let result = state
        .crypto_price_cache
        .get_or_fetch("gbp".to_string(), CACHE_TTL, || client.fetch_prices_gbp(COINS))
        .await;
    if let Err(e) = result {
        warn!(error = %e, "crypto price refresh failed");
    }
    Ok(())
}

/// Pushes fleet summary state to the operator's cloud endpoint when
/// `cloud.enabled` is set (§6). No cloud backend is named in the data
/// model, so this is a log-only stand-in until a concrete endpoint exists —
/// wiring a real push belongs at the operator's integration point, not
/// invented here.
#[instrument(skip(state))]
pub async fn cloud_push(state: Arc<AppState>) -> anyhow::Result<()> {
    if !state.config.get("cloud.enabled", false) {
        return Ok(());
    }
    info!("cloud push tick (no cloud endpoint configured)");
    Ok(())
}
