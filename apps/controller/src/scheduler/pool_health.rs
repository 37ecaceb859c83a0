// [apps/controller/src/scheduler/pool_health.rs]
//! Pool-health monitor (§4.4): TCP-probe reachability/RTT, aggregate
//! reject-rate and recent-failure counts, compute a composite score, append
//! a row, and flag a failover condition as an `Event` when one of the three
//! thresholds trips — the rule/strategy layer (automation `pool_failure`
//! triggers, pool-strategy reconciliation) is what actually acts on it.

use crate::app_state::AppState;
use chrono::{Duration as ChronoDuration, Utc};
use fleet_models::{Event, EventType, Pool, PoolHealth};
use fleet_store::repositories::{EventRepository, PoolHealthRepository, PoolRepository, TelemetryRepository};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::instrument;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[instrument(skip(state))]
pub async fn tick(state: Arc<AppState>) -> anyhow::Result<()> {
    let pool_repo = PoolRepository::new(state.store.clone());
    let health_repo = PoolHealthRepository::new(state.store.clone());
    let telemetry_repo = TelemetryRepository::new(state.store.clone());
    let event_repo = EventRepository::new(state.store.clone());

    let miner_repo = fleet_store::repositories::MinerRepository::new(state.store.clone());
    let enabled_miners = miner_repo.list_enabled().await?;

    for pool in pool_repo.list_enabled().await? {
        let (is_reachable, response_time_ms, error_message) = probe(&pool).await;
        let (shares_accepted, shares_rejected, reject_rate) =
            reject_rate_last_24h(&telemetry_repo, &enabled_miners, &pool).await?;

        let recent_failures = health_repo
            .recent_since(pool.id, Utc::now() - ChronoDuration::hours(1))
            .await?
            .iter()
            .filter(|h| !h.is_reachable)
            .count();

        let health_score = composite_score(is_reachable, response_time_ms, reject_rate, recent_failures);

        let row = PoolHealth {
            pool_id: pool.id,
            timestamp: Utc::now(),
            is_reachable,
            response_time_ms,
            reject_rate,
            shares_accepted,
            shares_rejected,
            health_score,
            luck_percentage: None,
            error_message,
        };
        health_repo.insert(&row).await?;

        if failover_condition(&health_repo, &pool, is_reachable, health_score, reject_rate).await? {
            event_repo
                .insert(&Event {
                    id: 0,
                    timestamp: Utc::now(),
                    event_type: EventType::Alert,
                    source: format!("pool-health:{}", pool.name),
                    message: format!("pool {} tripped a failover condition (score {health_score}, reject rate {reject_rate:.1}%)", pool.name),
                    data: None,
                })
                .await?;
        }
    }
    Ok(())
}

async fn probe(pool: &Pool) -> (bool, Option<u64>, Option<String>) {
    let started = std::time::Instant::now();
    let addr = format!("{}:{}", pool.host, pool.port);
    match tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect(&addr)).await {
        Ok(Ok(_stream)) => (true, Some(started.elapsed().as_millis() as u64), None),
        Ok(Err(e)) => (false, None, Some(e.to_string())),
        Err(_) => (false, None, Some("connection timed out".to_string())),
    }
}

async fn reject_rate_last_24h(
    telemetry_repo: &TelemetryRepository,
    enabled_miners: &[fleet_models::Miner],
    pool: &Pool,
) -> anyhow::Result<(i64, i64, f64)> {
    let cutoff = Utc::now() - ChronoDuration::hours(24);
    let normalized = pool.normalized_url();

    // `recent_for_pool` on the telemetry repository is keyed by miner, not
    // pool — walk every miner's recent rows and keep the ones whose
    // observed `pool_in_use` matches this pool's normalised host:port.
    let mut accepted = 0i64;
    let mut rejected = 0i64;
    for miner in enabled_miners {
        for row in telemetry_repo.recent_for_pool(miner.id, 500).await? {
            if row.timestamp < cutoff {
                continue;
            }
            let Some(observed) = &row.pool_in_use else { continue };
            if fleet_models::pool::normalize_pool_url(observed) != normalized {
                continue;
            }
            accepted += row.shares_accepted.unwrap_or(0);
            rejected += row.shares_rejected.unwrap_or(0);
        }
    }

    let total = accepted + rejected;
    let reject_rate = if total > 0 { rejected as f64 / total as f64 * 100.0 } else { 0.0 };
    Ok((accepted, rejected, reject_rate))
}

fn composite_score(is_reachable: bool, response_time_ms: Option<u64>, reject_rate: f64, recent_failures: usize) -> u8 {
    let reachability = if is_reachable { 40 } else { 0 };
    let response = match response_time_ms {
        Some(ms) if ms < 50 => 30,
        Some(ms) if ms < 150 => 20,
        Some(ms) if ms < 300 => 10,
        _ => 0,
    };
    let reject = if reject_rate < 1.0 {
        30
    } else if reject_rate < 3.0 {
        20
    } else if reject_rate < 5.0 {
        10
    } else {
        0
    };
    let penalty = recent_failures as i32 * 10;
    (reachability + response + reject - penalty).clamp(0, 100) as u8
}

async fn failover_condition(
    health_repo: &PoolHealthRepository,
    pool: &Pool,
    is_reachable: bool,
    health_score: u8,
    reject_rate: f64,
) -> anyhow::Result<bool> {
    // `recent[0]` is the row `tick` just inserted this cycle, so "2
    // consecutive" / "3 consecutive" below really means "this sample plus
    // its 1/2 immediate predecessors", not 2/3 *prior* samples.
    let recent = health_repo.recent_for_pool(pool.id, 3).await?;

    let reachability_fails = !is_reachable && recent.len() >= 2 && recent.iter().take(2).all(|h| !h.is_reachable);
    let health_low = health_score < 30 && recent.len() >= 3 && recent.iter().take(3).all(|h| h.health_score < 30);
    let reject_high = reject_rate > 10.0 && recent.len() >= 3 && recent.iter().take(3).all(|h| h.reject_rate > 10.0);

    Ok(reachability_fails || health_low || reject_high)
}
