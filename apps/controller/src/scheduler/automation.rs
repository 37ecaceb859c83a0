// [apps/controller/src/scheduler/automation.rs]
//! Automation-rule evaluation + reconciliation (§4.7, §4.10), plus the
//! default offline/overheat alert sweep that §4.10 calls out separately
//! ("alert checks ... throttled per (miner, alert_type) by cooldown").

use crate::app_state::AppState;
use fleet_models::{Event, EventType};
use fleet_store::repositories::{EventRepository, MinerRepository, TelemetryRepository};
use fleet_strategy::AutomationEngine;
use std::sync::Arc;
use tracing::instrument;

const ALERT_COOLDOWN_MINUTES: i64 = 60;
const OFFLINE_AFTER_MINUTES: i64 = 10;
const OVERHEAT_CELSIUS: f64 = 85.0;

#[instrument(skip(state))]
pub async fn tick(state: Arc<AppState>) -> anyhow::Result<()> {
    let engine = AutomationEngine::new(state.store.clone());
    let adapters = state.adapters.read().await.clone();
    let region: String = state.config.get("octopus_agile.region", "H".to_string());
    engine.run_tick(&region, &adapters).await?;
    Ok(())
}

#[instrument(skip(state))]
pub async fn reconcile(state: Arc<AppState>) -> anyhow::Result<()> {
    let engine = AutomationEngine::new(state.store.clone());
    let adapters = state.adapters.read().await.clone();
    let region: String = state.config.get("octopus_agile.region", "H".to_string());
    engine.run_reconciliation(&region, &adapters).await?;
    Ok(())
}

/// Rule-driven `send_alert`/`log_event` actions are already re-evaluated
/// every minute by `tick` above; this sweep covers the two conditions the
/// rule engine doesn't watch on its own — a miner going silent, or running
/// hot — each throttled to one alert per (miner, alert_type) per cooldown.
#[instrument(skip(state))]
pub async fn alert_checks(state: Arc<AppState>) -> anyhow::Result<()> {
    let miner_repo = MinerRepository::new(state.store.clone());
    let telemetry_repo = TelemetryRepository::new(state.store.clone());
    let event_repo = EventRepository::new(state.store.clone());

    let now = chrono::Utc::now();
    let recent_events = event_repo.recent(500).await?;

    for miner in miner_repo.list_enabled().await? {
        let latest = telemetry_repo.latest_for_miner(miner.id).await?;

        let offline = latest.as_ref().map_or(true, |t| (now - t.timestamp).num_minutes() > OFFLINE_AFTER_MINUTES);
        if offline {
            maybe_alert(
                &event_repo,
                &recent_events,
                &miner.name,
                "offline",
                now,
                format!("{} has reported no telemetry for over {OFFLINE_AFTER_MINUTES} minutes", miner.name),
            )
            .await?;
        }

        if let Some(temp) = latest.as_ref().and_then(|t| t.temperature) {
            if temp >= OVERHEAT_CELSIUS {
                maybe_alert(
                    &event_repo,
                    &recent_events,
                    &miner.name,
                    "overheat",
                    now,
                    format!("{} is running at {temp:.1}\u{b0}C", miner.name),
                )
                .await?;
            }
        }
    }
    Ok(())
}

async fn maybe_alert(
    event_repo: &EventRepository,
    recent: &[Event],
    miner_name: &str,
    alert_type: &str,
    now: chrono::DateTime<chrono::Utc>,
    message: String,
) -> anyhow::Result<()> {
    let source = format!("alert:{miner_name}:{alert_type}");
    let throttled = recent.iter().any(|e| e.source == source && (now - e.timestamp).num_minutes() < ALERT_COOLDOWN_MINUTES);
    if throttled {
        return Ok(());
    }
    event_repo
        .insert(&Event {
            id: 0,
            timestamp: now,
            event_type: EventType::Alert,
            source,
            message,
            data: None,
        })
        .await?;
    Ok(())
}
