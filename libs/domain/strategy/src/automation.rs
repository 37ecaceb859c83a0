// [libs/domain/strategy/src/automation.rs]
//! The generic trigger/action automation-rule engine (§4.7).

use crate::errors::StrategyError;
use chrono::{NaiveTime, Utc};
use fleet_models::{ActionType, AutomationRule, EventType, MinerAdapter, MinerFamily, PoolTarget, TriggerType};
use fleet_store::repositories::{AutomationRuleRepository, EnergyPriceRepository, EventRepository, MinerRepository, PoolRepository, TelemetryRepository};
use fleet_store::Store;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone)]
pub struct RuleOutcome {
    pub rule_id: i64,
    pub triggered: bool,
    pub action_applied: bool,
    pub error: Option<String>,
}

pub struct AutomationEngine {
    store: Store,
}

impl AutomationEngine {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    #[instrument(skip(self, adapters))]
    pub async fn run_tick(
        &self,
        region: &str,
        adapters: &HashMap<i64, Arc<dyn MinerAdapter>>,
    ) -> Result<Vec<RuleOutcome>, StrategyError> {
        let repo = AutomationRuleRepository::new(self.store.clone());
        let mut outcomes = Vec::new();
        for rule in repo.list_enabled_ordered().await? {
            outcomes.push(self.evaluate_rule(rule, region, adapters).await?);
        }
        Ok(outcomes)
    }

    async fn evaluate_rule(
        &self,
        mut rule: AutomationRule,
        region: &str,
        adapters: &HashMap<i64, Arc<dyn MinerAdapter>>,
    ) -> Result<RuleOutcome, StrategyError> {
        let (fired, fire_key) = match self.evaluate_trigger(&rule, region).await {
            Ok(v) => v,
            Err(e) => {
                warn!(rule_id = rule.id, error = %e, "automation: trigger evaluation failed");
                return Ok(RuleOutcome { rule_id: rule.id, triggered: false, action_applied: false, error: Some(e.to_string()) });
            }
        };

        if !fired {
            return Ok(RuleOutcome { rule_id: rule.id, triggered: false, action_applied: false, error: None });
        }

        if let Some(key) = &fire_key {
            if rule.last_execution_context.get("fire_key").and_then(|v| v.as_str()) == Some(key.as_str()) {
                // Already acted on this period (price_threshold's per-slot idempotency).
                return Ok(RuleOutcome { rule_id: rule.id, triggered: true, action_applied: false, error: None });
            }
        }

        let result = self.apply_action(&rule, adapters).await;
        let (applied, error) = match result {
            Ok(()) => (true, None),
            Err(e) => (false, Some(e.to_string())),
        };

        let mut context = rule.last_execution_context.clone();
        if let Some(key) = fire_key {
            context.insert("fire_key".to_string(), serde_json::Value::String(key));
        }
        let repo = AutomationRuleRepository::new(self.store.clone());
        repo.record_execution(rule.id, Utc::now(), &context).await?;
        rule.last_execution_context = context;

        Ok(RuleOutcome { rule_id: rule.id, triggered: true, action_applied: applied, error })
    }

    /// Returns `(fired, fire_key)`. `fire_key`, when present, is compared
    /// against `last_execution_context["fire_key"]` by the caller to avoid
    /// re-firing within the same period (only `price_threshold` uses this —
    /// §4.7).
    async fn evaluate_trigger(&self, rule: &AutomationRule, region: &str) -> Result<(bool, Option<String>), StrategyError> {
        match rule.trigger_type {
            TriggerType::PriceThreshold => {
                let cfg = &rule.trigger_config;
                let condition = cfg.get("condition").and_then(|v| v.as_str()).unwrap_or("below");
                let value = cfg.get("value").and_then(|v| v.as_f64()).unwrap_or(0.0);
                let value2 = cfg.get("value2").and_then(|v| v.as_f64());
                let region = cfg.get("region").and_then(|v| v.as_str()).unwrap_or(region);

                let energy_repo = EnergyPriceRepository::new(self.store.clone());
                let Some(price) = energy_repo.get_current_price(region).await? else {
                    return Ok((false, None));
                };
                let p = price.price_pence;
                let fired = match condition {
                    "below" => p < value,
                    "above" => p > value,
                    "between" => value2.map(|v2| p >= value && p <= v2).unwrap_or(false),
                    "outside" => value2.map(|v2| p < value || p > v2).unwrap_or(false),
                    _ => false,
                };
                Ok((fired, Some(price.valid_from.to_rfc3339())))
            }
            TriggerType::TimeWindow => {
                let cfg = &rule.trigger_config;
                let start = cfg.get("start").and_then(|v| v.as_str()).unwrap_or("00:00");
                let end = cfg.get("end").and_then(|v| v.as_str()).unwrap_or("23:59");
                let (Ok(start), Ok(end)) = (
                    NaiveTime::parse_from_str(start, "%H:%M"),
                    NaiveTime::parse_from_str(end, "%H:%M"),
                ) else {
                    return Ok((false, None));
                };
                let now = Utc::now().time();
                let fired = if start <= end {
                    now >= start && now <= end
                } else {
                    // Overnight window, e.g. 22:00–06:00.
                    now >= start || now <= end
                };
                Ok((fired, None))
            }
            TriggerType::MinerOffline => {
                let Some(miner_id) = rule.trigger_config.get("miner_id").and_then(|v| v.as_i64()) else {
                    return Ok((false, None));
                };
                let minutes = rule.trigger_config.get("minutes").and_then(|v| v.as_i64()).unwrap_or(10);
                let telemetry_repo = TelemetryRepository::new(self.store.clone());
                let latest = telemetry_repo.latest_for_miner(miner_id).await?;
                let fired = match latest {
                    Some(t) => Utc::now() - t.timestamp > chrono::Duration::minutes(minutes),
                    None => true,
                };
                Ok((fired, None))
            }
            TriggerType::MinerOverheat => {
                let Some(miner_id) = rule.trigger_config.get("miner_id").and_then(|v| v.as_i64()) else {
                    return Ok((false, None));
                };
                let threshold = rule.trigger_config.get("threshold_c").and_then(|v| v.as_f64()).unwrap_or(80.0);
                let telemetry_repo = TelemetryRepository::new(self.store.clone());
                let fired = telemetry_repo
                    .latest_for_miner(miner_id)
                    .await?
                    .and_then(|t| t.temperature)
                    .map(|temp| temp > threshold)
                    .unwrap_or(false);
                Ok((fired, None))
            }
            TriggerType::PoolFailure => {
                let Some(miner_id) = rule.trigger_config.get("miner_id").and_then(|v| v.as_i64()) else {
                    return Ok((false, None));
                };
                let telemetry_repo = TelemetryRepository::new(self.store.clone());
                let fired = telemetry_repo
                    .latest_for_miner(miner_id)
                    .await?
                    .map(|t| t.pool_in_use.is_none())
                    .unwrap_or(false);
                Ok((fired, None))
            }
        }
    }

    async fn apply_action(
        &self,
        rule: &AutomationRule,
        adapters: &HashMap<i64, Arc<dyn MinerAdapter>>,
    ) -> Result<(), StrategyError> {
        match rule.action_type {
            ActionType::ApplyMode => {
                let Some(mode) = rule.action_config.get("mode").and_then(|v| v.as_str()) else {
                    return Ok(());
                };
                let target = rule.action_config.get("miner_id").and_then(|v| v.as_str()).unwrap_or_default();
                let miner_repo = MinerRepository::new(self.store.clone());
                let miner_ids: Vec<i64> = if let Some(family_name) = target.strip_prefix("type:") {
                    let family = parse_family(family_name);
                    let mut ids = Vec::new();
                    for m in miner_repo.list_enabled().await? {
                        if Some(m.family) == family {
                            ids.push(m.id);
                        }
                    }
                    ids
                } else {
                    target.parse::<i64>().into_iter().collect()
                };
                for miner_id in miner_ids {
                    if let Some(adapter) = adapters.get(&miner_id) {
                        if adapter.set_mode(mode).await.is_ok() {
                            let _ = miner_repo.set_current_mode(miner_id, mode, Utc::now()).await;
                        }
                    }
                }
                Ok(())
            }
            ActionType::SwitchPool => {
                let Some(miner_id) = rule.action_config.get("miner_id").and_then(|v| v.as_i64()) else {
                    return Ok(());
                };
                let Some(pool_id) = rule.action_config.get("pool_id").and_then(|v| v.as_i64()) else {
                    return Ok(());
                };
                let pool_repo = PoolRepository::new(self.store.clone());
                let pool = pool_repo.get(pool_id).await?;
                if let Some(adapter) = adapters.get(&miner_id) {
                    adapter
                        .switch_pool(&PoolTarget {
                            host: pool.host,
                            port: pool.port,
                            user: pool.user,
                            password: pool.password,
                        })
                        .await?;
                }
                Ok(())
            }
            ActionType::SendAlert => {
                let message = rule.action_config.get("message").and_then(|v| v.as_str()).unwrap_or("automation alert");
                info!(rule_id = rule.id, message, "automation: alert raised");
                EventRepository::new(self.store.clone())
                    .insert(&fleet_models::Event {
                        id: 0,
                        timestamp: Utc::now(),
                        event_type: EventType::Alert,
                        source: format!("automation:{}", rule.name),
                        message: message.to_string(),
                        data: None,
                    })
                    .await?;
                Ok(())
            }
            ActionType::LogEvent => {
                let message = rule.action_config.get("message").and_then(|v| v.as_str()).unwrap_or("");
                EventRepository::new(self.store.clone())
                    .insert(&fleet_models::Event {
                        id: 0,
                        timestamp: Utc::now(),
                        event_type: EventType::Info,
                        source: format!("automation:{}", rule.name),
                        message: message.to_string(),
                        data: None,
                    })
                    .await?;
                Ok(())
            }
        }
    }

    /// §4.7 reconciliation: for every currently-triggered `apply_mode` or
    /// `switch_pool` rule, observe actual state and re-apply on drift.
    #[instrument(skip(self, adapters))]
    pub async fn run_reconciliation(
        &self,
        region: &str,
        adapters: &HashMap<i64, Arc<dyn MinerAdapter>>,
    ) -> Result<usize, StrategyError> {
        let repo = AutomationRuleRepository::new(self.store.clone());
        let mut reconciled = 0;
        for rule in repo.list_enabled_ordered().await? {
            if !matches!(rule.action_type, ActionType::ApplyMode | ActionType::SwitchPool) {
                continue;
            }
            let (fired, _) = self.evaluate_trigger(&rule, region).await?;
            if !fired {
                continue;
            }
            if self.apply_action(&rule, adapters).await.is_ok() {
                reconciled += 1;
            }
        }
        Ok(reconciled)
    }
}

fn parse_family(name: &str) -> Option<MinerFamily> {
    MinerFamily::from_db_str(name)
}
