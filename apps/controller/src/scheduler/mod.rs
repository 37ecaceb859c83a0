// [apps/controller/src/scheduler/mod.rs]
//! Every periodic job named in §4.10, each its own `tokio::spawn` loop on a
//! `tokio::time::interval` — one task per concern, interval-gated,
//! cooperatively cancelled on shutdown. Grounded on the teacher's
//! `ChronosPacemaker::ignite_pacemaker_loop` task-per-job pattern.
//!
//! `tokio::time::interval`'s first tick completes immediately, so every job
//! below also gets the "fire once at startup" behaviour §4.10 calls out for
//! energy prices, crypto prices, pool slots, and Agile Solo.

mod adapter_refresh;
mod agile;
mod automation;
mod crypto_price;
mod energy;
mod health_score;
mod pool_health;
mod pool_slot;
mod pool_stats;
mod pool_strategy;
mod purge;
mod telemetry;

use crate::app_state::AppState;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

pub async fn run(state: Arc<AppState>, shutdown: Arc<AtomicBool>) {
    let mut handles = Vec::new();

    macro_rules! spawn_job {
        ($name:literal, $period_secs:expr, $job:expr) => {
            handles.push(spawn_job($name, Duration::from_secs($period_secs), state.clone(), shutdown.clone(), $job));
        };
    }

    spawn_job!("adapter-table-refresh", 15 * MINUTE, adapter_refresh::tick);
    spawn_job!("telemetry-ingest", 60, telemetry::tick);
    spawn_job!("automation-evaluate", 60, automation::tick);
    spawn_job!("automation-reconcile", 5 * MINUTE, automation::reconcile);
    spawn_job!("alert-checks", 5 * MINUTE, automation::alert_checks);
    spawn_job!("health-score-record", HOUR, health_score::tick);
    spawn_job!("energy-price-refresh", 30 * MINUTE, energy::refresh);
    spawn_job!("energy-optimisation", 30 * MINUTE, energy::optimise);
    spawn_job!("energy-optimisation-reconcile", 5 * MINUTE, energy::reconcile_optimisation);
    spawn_job!("crypto-price-refresh", 10 * MINUTE, crypto_price::tick);
    spawn_job!("pool-health-monitor", 5 * MINUTE, pool_health::tick);
    spawn_job!("pool-stats-refresh", 5 * MINUTE, pool_stats::tick);
    spawn_job!("pool-strategy-execute", 5 * MINUTE, pool_strategy::tick);
    spawn_job!("pool-strategy-reconcile", 5 * MINUTE, pool_strategy::reconcile);
    spawn_job!("pool-slot-sync", 15 * MINUTE, pool_slot::tick);
    spawn_job!("agile-solo-execute", 30 * MINUTE, agile::tick);
    spawn_job!("agile-solo-reconcile", 5 * MINUTE, agile::reconcile);
    spawn_job!("telemetry-purge", 6 * HOUR, purge::telemetry);
    spawn_job!("event-purge", DAY, purge::events);
    spawn_job!("daily-aggregation", DAY, purge::daily_aggregation);
    spawn_job!("energy-price-purge", 7 * DAY, purge::energy_prices);
    spawn_job!("db-optimise", 30 * DAY, purge::optimise);
    spawn_job!("cloud-push", 15 * MINUTE, crypto_price::cloud_push);

    while !shutdown.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    info!("scheduler shutting down");
    for handle in handles {
        handle.abort();
    }
}

fn spawn_job<F, Fut>(
    name: &'static str,
    period: Duration,
    state: Arc<AppState>,
    shutdown: Arc<AtomicBool>,
    job: F,
) -> tokio::task::JoinHandle<()>
where
    F: Fn(Arc<AppState>) -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            if shutdown.load(Ordering::SeqCst) {
                break;
            }
            if let Err(e) = job(state.clone()).await {
                warn!(job = name, error = %e, "scheduled job failed");
            }
        }
    })
}
