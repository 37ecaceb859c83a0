// [apps/controller/src/scheduler/purge.rs]
//! Retention sweeps (§4.10): telemetry (6h cadence, 30-day retention),
//! events (24h cadence, 30-day retention), energy prices (weekly, 60-day
//! retention), and the monthly DB optimise/vacuum pass — which also folds
//! in the two retention sweeps §4.10 doesn't give their own row (the
//! high-diff-share 180-day purge and the pool-health 30-day purge), since
//! neither needs a cadence tighter than the monthly maintenance window.
//! `daily_aggregation` seeds `daily_aggregates`, a lightweight per-miner
//! rollup for long-term trend display that doesn't need per-sample detail.

use crate::app_state::AppState;
use chrono::{Duration as ChronoDuration, Utc};
use fleet_store::repositories::{EnergyPriceRepository, EventRepository, MinerRepository, PoolHealthRepository, TelemetryRepository, TrackingRepository};
use libsql::params;
use std::sync::Arc;
use tracing::{info, instrument};

const TELEMETRY_RETENTION_DAYS: i64 = 30;
const EVENT_RETENTION_DAYS: i64 = 30;
const ENERGY_PRICE_RETENTION_DAYS: i64 = 60;
const SHARE_RETENTION_DAYS: i64 = 180;
const POOL_HEALTH_RETENTION_DAYS: i64 = 30;

#[instrument(skip(state))]
pub async fn telemetry(state: Arc<AppState>) -> anyhow::Result<()> {
    let repo = TelemetryRepository::new(state.store.clone());
    let deleted = repo.purge_older_than(Utc::now() - ChronoDuration::days(TELEMETRY_RETENTION_DAYS)).await?;
    info!(deleted, "telemetry purge complete");
    Ok(())
}

#[instrument(skip(state))]
pub async fn events(state: Arc<AppState>) -> anyhow::Result<()> {
    let repo = EventRepository::new(state.store.clone());
    let deleted = repo.purge_older_than(Utc::now() - ChronoDuration::days(EVENT_RETENTION_DAYS)).await?;
    info!(deleted, "event purge complete");
    Ok(())
}

#[instrument(skip(state))]
pub async fn energy_prices(state: Arc<AppState>) -> anyhow::Result<()> {
    let repo = EnergyPriceRepository::new(state.store.clone());
    let deleted = repo.purge_older_than(Utc::now() - ChronoDuration::days(ENERGY_PRICE_RETENTION_DAYS)).await?;
    info!(deleted, "energy price purge complete");
    Ok(())
}

#[instrument(skip(state))]
pub async fn optimise(state: Arc<AppState>) -> anyhow::Result<()> {
    let tracking = TrackingRepository::new(state.store.clone());
    let deleted_shares = tracking.purge_shares_older_than(Utc::now() - ChronoDuration::days(SHARE_RETENTION_DAYS)).await?;

    let pool_health = PoolHealthRepository::new(state.store.clone());
    let deleted_health = pool_health.purge_older_than(Utc::now() - ChronoDuration::days(POOL_HEALTH_RETENTION_DAYS)).await?;

    let conn = state.store.connection()?;
    conn.execute("VACUUM", ()).await?;

    info!(deleted_shares, deleted_health, "monthly db optimise complete");
    Ok(())
}

/// Rolls yesterday's telemetry into one row per miner in `daily_aggregates`
/// (§4.10 "seeds long-term analytics tables"). Telemetry keeps no
/// date-range query beyond a row-count window, so this reads the most
/// recent rows and keeps only the ones that actually fall in yesterday's
/// UTC day — adequate for a nightly job, not a substitute for per-sample
/// history.
#[instrument(skip(state))]
pub async fn daily_aggregation(state: Arc<AppState>) -> anyhow::Result<()> {
    let miner_repo = MinerRepository::new(state.store.clone());
    let telemetry_repo = TelemetryRepository::new(state.store.clone());

    let day_start = (Utc::now() - ChronoDuration::days(1)).date_naive();
    let window_start = day_start.and_hms_opt(0, 0, 0).unwrap().and_utc();
    let window_end = window_start + ChronoDuration::days(1);
    let day_label = day_start.to_string();

    let conn = state.store.connection()?;

    for miner in miner_repo.list_all().await? {
        let rows: Vec<_> = telemetry_repo
            .recent_for_pool(miner.id, 2000)
            .await?
            .into_iter()
            .filter(|t| t.timestamp >= window_start && t.timestamp < window_end)
            .collect();
        if rows.is_empty() {
            continue;
        }

        let avg_hashrate = rows.iter().map(|t| t.hashrate).sum::<f64>() / rows.len() as f64;
        let temps: Vec<f64> = rows.iter().filter_map(|t| t.temperature).collect();
        let avg_temperature = if temps.is_empty() { None } else { Some(temps.iter().sum::<f64>() / temps.len() as f64) };
        let total_accepted: i64 = rows.iter().filter_map(|t| t.shares_accepted).sum();
        let total_rejected: i64 = rows.iter().filter_map(|t| t.shares_rejected).sum();

        conn.execute(
            "INSERT INTO daily_aggregates \
             (miner_id, day, avg_hashrate, avg_temperature, total_shares_accepted, total_shares_rejected) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT (miner_id, day) DO UPDATE SET \
             avg_hashrate = excluded.avg_hashrate, avg_temperature = excluded.avg_temperature, \
             total_shares_accepted = excluded.total_shares_accepted, total_shares_rejected = excluded.total_shares_rejected",
            params![miner.id, day_label.clone(), avg_hashrate, avg_temperature, total_accepted, total_rejected],
        )
        .await?;
    }

    info!(day = %day_label, "daily aggregation complete");
    Ok(())
}
