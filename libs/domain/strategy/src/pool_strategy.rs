// [libs/domain/strategy/src/pool_strategy.rs]
//! The generic pool-reassignment engine (§4.6): round-robin, load-balance,
//! and pro-mode, sharing one execution contract — compute a target, attempt
//! switches, persist only if at least one miner succeeded.

use crate::errors::StrategyError;
use chrono::{Duration, Utc};
use fleet_models::{Miner, MinerAdapter, Pool, PoolStrategy, PoolTarget, StrategyType};
use fleet_store::repositories::{MinerRepository, PoolHealthRepository, PoolRepository, PoolStrategyRepository};
use fleet_store::Store;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Default)]
pub struct StrategyTickOutcome {
    pub strategy_id: i64,
    pub switched_miner_ids: Vec<i64>,
    pub failed_miner_ids: Vec<i64>,
    pub state_persisted: bool,
}

pub struct PoolStrategyEngine {
    store: Store,
}

impl PoolStrategyEngine {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    async fn target_miners(&self, strategy: &PoolStrategy) -> Result<Vec<Miner>, StrategyError> {
        let miner_repo = MinerRepository::new(self.store.clone());
        if strategy.miner_ids.is_empty() {
            Ok(miner_repo.list_enabled().await?)
        } else {
            let mut out = Vec::new();
            for id in &strategy.miner_ids {
                if let Ok(m) = miner_repo.get(*id).await {
                    if m.enabled {
                        out.push(m);
                    }
                }
            }
            Ok(out)
        }
    }

    async fn switch_all(
        &self,
        miners: &[Miner],
        pool: &Pool,
        adapters: &HashMap<i64, Arc<dyn MinerAdapter>>,
    ) -> (Vec<i64>, Vec<i64>) {
        let target = PoolTarget {
            host: pool.host.clone(),
            port: pool.port,
            user: pool.user.clone(),
            password: pool.password.clone(),
        };
        let mut ok = Vec::new();
        let mut failed = Vec::new();
        for miner in miners {
            match adapters.get(&miner.id) {
                Some(adapter) => match adapter.switch_pool(&target).await {
                    Ok(()) => ok.push(miner.id),
                    Err(e) => {
                        warn!(miner_id = miner.id, error = %e, "pool strategy: switch failed");
                        failed.push(miner.id);
                    }
                },
                None => failed.push(miner.id),
            }
        }
        (ok, failed)
    }

    #[instrument(skip(self, adapters, region))]
    pub async fn run_tick(
        &self,
        adapters: &HashMap<i64, Arc<dyn MinerAdapter>>,
        region: &str,
    ) -> Result<Vec<StrategyTickOutcome>, StrategyError> {
        let repo = PoolStrategyRepository::new(self.store.clone());
        let mut outcomes = Vec::new();
        for strategy in repo.list_enabled().await? {
            let outcome = match strategy.strategy_type {
                StrategyType::RoundRobin => self.run_round_robin(strategy, adapters).await?,
                StrategyType::LoadBalance => self.run_load_balance(strategy, adapters).await?,
                StrategyType::ProMode => self.run_pro_mode(strategy, adapters, region).await?,
            };
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    async fn run_round_robin(
        &self,
        mut strategy: PoolStrategy,
        adapters: &HashMap<i64, Arc<dyn MinerAdapter>>,
    ) -> Result<StrategyTickOutcome, StrategyError> {
        let interval_minutes = strategy
            .config
            .get("interval_minutes")
            .and_then(|v| v.as_i64())
            .unwrap_or(60);
        if let Some(last) = strategy.last_switch {
            if Utc::now() - last < Duration::minutes(interval_minutes) {
                return Ok(StrategyTickOutcome { strategy_id: strategy.id, ..Default::default() });
            }
        }
        if strategy.pool_ids.is_empty() {
            return Ok(StrategyTickOutcome { strategy_id: strategy.id, ..Default::default() });
        }

        let pool_repo = PoolRepository::new(self.store.clone());
        let len = strategy.pool_ids.len() as i32;
        let mut next_index = strategy.current_pool_index;
        let mut target_pool = None;
        for _ in 0..len {
            next_index = (next_index + 1).rem_euclid(len);
            let candidate_id = strategy.pool_ids[next_index as usize];
            if let Ok(pool) = pool_repo.get(candidate_id).await {
                if pool.enabled {
                    target_pool = Some(pool);
                    break;
                }
            }
        }
        let Some(pool) = target_pool else {
            return Ok(StrategyTickOutcome { strategy_id: strategy.id, ..Default::default() });
        };

        let miners = self.target_miners(&strategy).await?;
        let (switched, failed) = self.switch_all(&miners, &pool, adapters).await;

        let state_persisted = !switched.is_empty();
        if state_persisted {
            strategy.current_pool_index = next_index;
            strategy.last_switch = Some(Utc::now());
            PoolStrategyRepository::new(self.store.clone()).save(&strategy).await?;
            info!(strategy_id = strategy.id, pool_id = pool.id, "round-robin: switched pool");
        }

        Ok(StrategyTickOutcome {
            strategy_id: strategy.id,
            switched_miner_ids: switched,
            failed_miner_ids: failed,
            state_persisted,
        })
    }

    async fn run_load_balance(
        &self,
        strategy: PoolStrategy,
        adapters: &HashMap<i64, Arc<dyn MinerAdapter>>,
    ) -> Result<StrategyTickOutcome, StrategyError> {
        let rebalance_minutes = strategy
            .config
            .get("rebalance_interval_minutes")
            .and_then(|v| v.as_i64())
            .unwrap_or(60);
        if let Some(last) = strategy.last_switch {
            if Utc::now() - last < Duration::minutes(rebalance_minutes) {
                return Ok(StrategyTickOutcome { strategy_id: strategy.id, ..Default::default() });
            }
        }

        let health_weight = strategy.config.get("health_weight").and_then(|v| v.as_f64()).unwrap_or(0.5);
        let latency_weight = strategy.config.get("latency_weight").and_then(|v| v.as_f64()).unwrap_or(0.3);
        let reject_weight = strategy.config.get("reject_weight").and_then(|v| v.as_f64()).unwrap_or(0.2);
        let min_health_threshold =
            strategy.config.get("min_health_threshold").and_then(|v| v.as_f64()).unwrap_or(30.0);

        let pool_repo = PoolRepository::new(self.store.clone());
        let health_repo = PoolHealthRepository::new(self.store.clone());

        let mut scored = Vec::new();
        for pool_id in &strategy.pool_ids {
            let Ok(pool) = pool_repo.get(*pool_id).await else { continue };
            if !pool.enabled {
                continue;
            }
            let recent = health_repo.recent_for_pool(*pool_id, 10).await?;
            if recent.is_empty() {
                continue;
            }
            let n = recent.len() as f64;
            let avg_health = recent.iter().map(|h| h.health_score as f64).sum::<f64>() / n;
            if avg_health < min_health_threshold {
                continue;
            }
            let avg_latency_ms =
                recent.iter().filter_map(|h| h.response_time_ms).map(|v| v as f64).sum::<f64>() / n;
            let latency_score = (1.0 - (avg_latency_ms / 1000.0)).clamp(0.0, 1.0) * 100.0;
            let avg_reject = recent.iter().map(|h| h.reject_rate).sum::<f64>() / n;
            let reject_score = (1.0 - avg_reject).clamp(0.0, 1.0) * 100.0;
            let score = avg_health * health_weight
                + latency_score * latency_weight
                + reject_score * reject_weight
                + pool.priority as f64 * 2.0;
            scored.push((pool, score));
        }

        if scored.is_empty() {
            return Ok(StrategyTickOutcome { strategy_id: strategy.id, ..Default::default() });
        }

        let total_score: f64 = scored.iter().map(|(_, s)| s).sum();
        let mut miners = self.target_miners(&strategy).await?;
        miners.shuffle(&mut rand::thread_rng());

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        let total_miners = miners.len();
        let mut assignment: Vec<(Pool, Vec<Miner>)> = Vec::new();
        let mut assigned = 0usize;
        for (i, (pool, score)) in scored.iter().enumerate() {
            let share = if total_score > 0.0 {
                ((score / total_score) * total_miners as f64).round() as usize
            } else {
                0
            };
            let take = if i == scored.len() - 1 { total_miners - assigned } else { share.min(total_miners - assigned) };
            let slice: Vec<Miner> = miners.drain(0..take.min(miners.len())).collect();
            assigned += slice.len();
            assignment.push((pool.clone(), slice));
        }
        // Any remainder (rounding) goes to the top-scoring pool.
        if !miners.is_empty() {
            if let Some((_, top)) = assignment.first_mut() {
                top.append(&mut miners);
            }
        }

        let mut switched = Vec::new();
        let mut failed = Vec::new();
        for (pool, group) in &assignment {
            let (ok, bad) = self.switch_all(group, pool, adapters).await;
            switched.extend(ok);
            failed.extend(bad);
        }

        let state_persisted = !switched.is_empty();
        if state_persisted {
            let mut strategy = strategy;
            strategy.last_switch = Some(Utc::now());
            PoolStrategyRepository::new(self.store.clone()).save(&strategy).await?;
            info!(strategy_id = strategy.id, "load-balance: rebalanced pool assignment");
        }

        Ok(StrategyTickOutcome { strategy_id: strategy.id, switched_miner_ids: switched, failed_miner_ids: failed, state_persisted })
    }

    async fn run_pro_mode(
        &self,
        mut strategy: PoolStrategy,
        adapters: &HashMap<i64, Arc<dyn MinerAdapter>>,
        region: &str,
    ) -> Result<StrategyTickOutcome, StrategyError> {
        let threshold = strategy.config.get("price_threshold").and_then(|v| v.as_f64());
        let low_pool_id = strategy.config.get("low_mode_pool_id").and_then(|v| v.as_i64());
        let high_pool_id = strategy.config.get("high_mode_pool_id").and_then(|v| v.as_i64());
        let dwell_hours = strategy.config.get("dwell_hours").and_then(|v| v.as_i64()).unwrap_or(1);

        let (Some(threshold), Some(low_pool_id), Some(high_pool_id)) = (threshold, low_pool_id, high_pool_id) else {
            return Ok(StrategyTickOutcome { strategy_id: strategy.id, ..Default::default() });
        };

        if let Some(last) = strategy.last_switch {
            if Utc::now() - last < Duration::hours(dwell_hours) {
                return Ok(StrategyTickOutcome { strategy_id: strategy.id, ..Default::default() });
            }
        }

        let energy_repo = fleet_store::repositories::EnergyPriceRepository::new(self.store.clone());
        let Some(price) = energy_repo.get_current_price(region).await? else {
            return Ok(StrategyTickOutcome { strategy_id: strategy.id, ..Default::default() });
        };

        let current_mode = strategy.config.get("current_mode").and_then(|v| v.as_str()).map(str::to_string);
        let (new_mode, target_pool_id) = if price.price_pence >= threshold + 0.5 {
            ("low", low_pool_id)
        } else if price.price_pence <= threshold - 0.5 {
            ("high", high_pool_id)
        } else {
            return Ok(StrategyTickOutcome { strategy_id: strategy.id, ..Default::default() });
        };

        if current_mode.as_deref() == Some(new_mode) {
            return Ok(StrategyTickOutcome { strategy_id: strategy.id, ..Default::default() });
        }

        let pool_repo = PoolRepository::new(self.store.clone());
        let Ok(pool) = pool_repo.get(target_pool_id).await else {
            return Ok(StrategyTickOutcome { strategy_id: strategy.id, ..Default::default() });
        };
        let miners = self.target_miners(&strategy).await?;
        let (switched, failed) = self.switch_all(&miners, &pool, adapters).await;

        let state_persisted = !switched.is_empty();
        if state_persisted {
            if let serde_json::Value::Object(ref mut map) = strategy.config {
                map.insert("current_mode".to_string(), serde_json::Value::String(new_mode.to_string()));
            }
            strategy.last_switch = Some(Utc::now());
            PoolStrategyRepository::new(self.store.clone()).save(&strategy).await?;
            info!(strategy_id = strategy.id, new_mode, "pro-mode: switched");
        }

        Ok(StrategyTickOutcome { strategy_id: strategy.id, switched_miner_ids: switched, failed_miner_ids: failed, state_persisted })
    }

    /// §4.8: for each active strategy with a single well-defined expected
    /// pool (round-robin: current index; pro-mode: `config.current_mode`;
    /// load-balance has no single expected pool and is skipped), compare
    /// each miner's observed pool against the expected one and retry the
    /// switch up to twice, 2 s apart, on drift.
    #[instrument(skip(self, adapters))]
    pub async fn run_reconciliation(
        &self,
        adapters: &HashMap<i64, Arc<dyn MinerAdapter>>,
    ) -> Result<usize, StrategyError> {
        let repo = PoolStrategyRepository::new(self.store.clone());
        let pool_repo = PoolRepository::new(self.store.clone());
        let mut reconciled = 0;

        for strategy in repo.list_enabled().await? {
            let expected_pool = match strategy.strategy_type {
                StrategyType::RoundRobin => match strategy.pool_ids.get(strategy.current_pool_index as usize) {
                    Some(id) => pool_repo.get(*id).await.ok(),
                    None => None,
                },
                StrategyType::ProMode => {
                    let mode = strategy.config.get("current_mode").and_then(|v| v.as_str());
                    let pool_id = match mode {
                        Some("low") => strategy.config.get("low_mode_pool_id").and_then(|v| v.as_i64()),
                        Some("high") => strategy.config.get("high_mode_pool_id").and_then(|v| v.as_i64()),
                        _ => None,
                    };
                    match pool_id {
                        Some(id) => pool_repo.get(id).await.ok(),
                        None => None,
                    }
                }
                StrategyType::LoadBalance => None,
            };
            let Some(expected_pool) = expected_pool else { continue };

            for miner in self.target_miners(&strategy).await? {
                let Some(adapter) = adapters.get(&miner.id) else { continue };
                let observed = adapter.get_telemetry().await.ok().and_then(|t| t.pool_in_use);
                let drifted = match &observed {
                    Some(url) => fleet_models::pool::normalize_pool_url(url) != expected_pool.normalized_url(),
                    None => false,
                };
                if !drifted {
                    continue;
                }
                let target = PoolTarget {
                    host: expected_pool.host.clone(),
                    port: expected_pool.port,
                    user: expected_pool.user.clone(),
                    password: expected_pool.password.clone(),
                };
                for attempt in 0..2 {
                    if adapter.switch_pool(&target).await.is_ok() {
                        reconciled += 1;
                        break;
                    }
                    if attempt == 0 {
                        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
                    }
                }
            }
        }
        Ok(reconciled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fleet_models::{HashrateUnit, Miner, MinerFamily, PoolSlotInfo, RawTelemetry};
    use fleet_store::repositories::{MinerRepository, PoolRepository, PoolStrategyRepository};
    use std::sync::Mutex;

    struct StubAdapter {
        switched_to: Mutex<Vec<PoolTarget>>,
    }

    #[async_trait]
    impl MinerAdapter for StubAdapter {
        fn family(&self) -> MinerFamily {
            MinerFamily::Bitaxe
        }
        async fn get_telemetry(&self) -> Result<RawTelemetry, fleet_models::AdapterError> {
            Ok(RawTelemetry {
                timestamp: Utc::now(),
                hashrate: 100.0,
                hashrate_unit: HashrateUnit::GhPerSec,
                temperature: None,
                power_watts: None,
                shares_accepted: None,
                shares_rejected: None,
                pool_in_use: None,
                detected_mode: None,
                firmware_version: None,
                best_share: None,
                data: Default::default(),
            })
        }
        async fn get_mode(&self) -> Result<Option<String>, fleet_models::AdapterError> {
            Ok(None)
        }
        async fn set_mode(&self, _mode: &str) -> Result<(), fleet_models::AdapterError> {
            Ok(())
        }
        async fn get_available_modes(&self) -> Result<Vec<String>, fleet_models::AdapterError> {
            Ok(vec![])
        }
        async fn switch_pool(&self, target: &PoolTarget) -> Result<(), fleet_models::AdapterError> {
            self.switched_to.lock().unwrap().push(target.clone());
            Ok(())
        }
        async fn restart(&self) -> Result<(), fleet_models::AdapterError> {
            Ok(())
        }
        async fn is_online(&self) -> Result<bool, fleet_models::AdapterError> {
            Ok(true)
        }
        async fn list_pool_slots(&self) -> Result<Vec<PoolSlotInfo>, fleet_models::AdapterError> {
            Ok(vec![])
        }
    }

    fn new_pool(name: &str, enabled: bool) -> Pool {
        Pool {
            id: 0,
            name: name.to_string(),
            host: format!("{name}.example.com"),
            port: 3333,
            user: "user".into(),
            password: "x".into(),
            enabled,
            priority: 0,
            network_difficulty: None,
            network_difficulty_stale: false,
            best_share: None,
        }
    }

    #[tokio::test]
    async fn round_robin_skips_disabled_pools_and_wraps_around() {
        let store = Store::connect(":memory:", None).await.unwrap();
        let pool_repo = PoolRepository::new(store.clone());
        let miner_repo = MinerRepository::new(store.clone());
        let strategy_repo = PoolStrategyRepository::new(store.clone());

        let pool_a = pool_repo.create(&new_pool("a", true)).await.unwrap();
        let pool_b = pool_repo.create(&new_pool("b", false)).await.unwrap();
        let pool_c = pool_repo.create(&new_pool("c", true)).await.unwrap();

        let miner_id = miner_repo
            .create(&Miner {
                id: 0,
                name: "m1".into(),
                family: MinerFamily::Bitaxe,
                host: "10.0.0.1".into(),
                port: Some(80),
                current_mode: None,
                firmware_version: None,
                manual_power_watts: None,
                enabled: true,
                config: Default::default(),
                last_mode_change: None,
            })
            .await
            .unwrap();

        strategy_repo
            .save(&PoolStrategy {
                id: 0,
                name: "rr".into(),
                strategy_type: StrategyType::RoundRobin,
                enabled: true,
                pool_ids: vec![pool_a, pool_b, pool_c],
                miner_ids: vec![miner_id],
                config: serde_json::json!({}),
                current_pool_index: 0,
                last_switch: None,
            })
            .await
            .unwrap();

        let mut adapters: HashMap<i64, Arc<dyn MinerAdapter>> = HashMap::new();
        adapters.insert(miner_id, Arc::new(StubAdapter { switched_to: Mutex::new(Vec::new()) }));

        let engine = PoolStrategyEngine::new(store.clone());

        // index 0 -> next candidate is index 1 (pool_b, disabled) -> skips to
        // index 2 (pool_c, enabled).
        let outcomes = engine.run_tick(&adapters, "H").await.unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].switched_miner_ids, vec![miner_id]);

        let saved = strategy_repo.get(outcomes[0].strategy_id).await.unwrap();
        assert_eq!(saved.current_pool_index, 2);
    }
}
